use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db,
    error::ApiError,
    models::{CustomerBody, CustomerRow},
    state::AppState,
};

#[derive(Deserialize)]
struct ListQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCustomer {
    name: String,
    phone: String,
    email: Option<String>,
    occupation: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCustomer {
    name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    occupation: Option<String>,
    address: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/customers")
            .service(
                web::resource("")
                    .route(web::get().to(list))
                    .route(web::post().to(create)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_one))
                    .route(web::put().to(update))
                    .route(web::delete().to(remove)),
            ),
    );
}

async fn list(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let pattern = format!("%{q}%");
            sqlx::query_as::<_, CustomerRow>(
                r#"SELECT id, name, phone, email, occupation, address, created_at, updated_at
                     FROM customers
                    WHERE name LIKE ? OR occupation LIKE ?
                    ORDER BY name ASC"#,
            )
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, CustomerRow>(
                r#"SELECT id, name, phone, email, occupation, address, created_at, updated_at
                     FROM customers ORDER BY name ASC"#,
            )
            .fetch_all(&state.db)
            .await?
        }
    };

    let data: Vec<CustomerBody> = rows.into_iter().map(CustomerBody::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "count": data.len(), "data": data })))
}

async fn get_one(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = db::fetch_customer(&state.db, &path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("Customer"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": CustomerBody::from(row) })))
}

async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateCustomer>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let name = body.name.trim().to_string();
    let phone = body.phone.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required.".into()));
    }
    if phone.is_empty() {
        return Err(ApiError::Validation("Phone is required.".into()));
    }

    let id = db::new_id();
    let now = db::now_str();
    sqlx::query(
        r#"INSERT INTO customers (id, name, phone, email, occupation, address, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&name)
    .bind(&phone)
    .bind(&body.email)
    .bind(&body.occupation)
    .bind(&body.address)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = db::fetch_customer(&state.db, &id)
        .await?
        .ok_or(ApiError::Internal("customer missing after insert"))?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": CustomerBody::from(row) })))
}

async fn update(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateCustomer>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let existing = db::fetch_customer(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Customer"))?;

    let name = body.name.unwrap_or(existing.name);
    let phone = body.phone.unwrap_or(existing.phone);
    if name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required.".into()));
    }
    if phone.trim().is_empty() {
        return Err(ApiError::Validation("Phone is required.".into()));
    }

    sqlx::query(
        r#"UPDATE customers
              SET name = ?, phone = ?, email = ?, occupation = ?, address = ?, updated_at = ?
            WHERE id = ?"#,
    )
    .bind(name.trim())
    .bind(phone.trim())
    .bind(body.email.or(existing.email))
    .bind(body.occupation.or(existing.occupation))
    .bind(body.address.or(existing.address))
    .bind(db::now_str())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = db::fetch_customer(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Customer"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": CustomerBody::from(row) })))
}

async fn remove(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query("DELETE FROM customers WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Customer"));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {},
        "message": "Customer deleted successfully"
    })))
}
