use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db::{self, DOG_SELECT},
    error::ApiError,
    models::{DogBody, DogRow},
    state::AppState,
};

const SEXES: [&str; 3] = ["male", "female", "unknown"];

#[derive(Deserialize)]
struct ListQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDog {
    owner_id: String,
    name: String,
    sex: Option<String>,
    breed: Option<String>,
    dob: Option<String>,
    color: Option<String>,
    weight: Option<f64>,
    vet: Option<String>,
    medical_info: Option<String>,
    rabies_vaccine_date: Option<String>,
    #[serde(default)]
    are_vaccines_current: bool,
    #[serde(default)]
    is_fixed: bool,
    temperament: Option<String>,
    #[serde(rename = "imageURL")]
    image_url: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDog {
    owner_id: Option<String>,
    name: Option<String>,
    sex: Option<String>,
    breed: Option<String>,
    dob: Option<String>,
    color: Option<String>,
    weight: Option<f64>,
    vet: Option<String>,
    medical_info: Option<String>,
    rabies_vaccine_date: Option<String>,
    are_vaccines_current: Option<bool>,
    is_fixed: Option<bool>,
    temperament: Option<String>,
    #[serde(rename = "imageURL")]
    image_url: Option<String>,
    notes: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/dogs")
            .service(
                web::resource("")
                    .route(web::get().to(list))
                    .route(web::post().to(create)),
            )
            .service(web::resource("/owner/{ownerId}").route(web::get().to(list_by_owner)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_one))
                    .route(web::put().to(update))
                    .route(web::delete().to(remove)),
            ),
    );
}

fn validate_sex(value: &str) -> Result<(), ApiError> {
    if SEXES.contains(&value) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "Invalid sex. Must be: male, female, or unknown".into(),
        ))
    }
}

fn validate_weight(value: Option<f64>) -> Result<(), ApiError> {
    match value {
        Some(weight) if !weight.is_finite() || weight < 0.0 => Err(ApiError::Validation(
            "Weight must be a non-negative number.".into(),
        )),
        _ => Ok(()),
    }
}

async fn list(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let pattern = format!("%{q}%");
            let sql = format!("{DOG_SELECT} WHERE d.name LIKE ? OR d.breed LIKE ? ORDER BY d.name ASC");
            sqlx::query_as::<_, DogRow>(&sql)
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(&state.db)
                .await?
        }
        None => {
            let sql = format!("{DOG_SELECT} ORDER BY d.name ASC");
            sqlx::query_as::<_, DogRow>(&sql).fetch_all(&state.db).await?
        }
    };

    let data: Vec<DogBody> = rows.into_iter().map(DogBody::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "count": data.len(), "data": data })))
}

async fn list_by_owner(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let sql = format!("{DOG_SELECT} WHERE d.owner_id = ? ORDER BY d.name ASC");
    let rows = sqlx::query_as::<_, DogRow>(&sql)
        .bind(path.into_inner())
        .fetch_all(&state.db)
        .await?;

    let data: Vec<DogBody> = rows.into_iter().map(DogBody::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "count": data.len(), "data": data })))
}

async fn get_one(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = db::fetch_dog(&state.db, &path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("Dog"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": DogBody::from(row) })))
}

async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateDog>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required.".into()));
    }
    let sex = body.sex.unwrap_or_else(|| "unknown".to_string());
    validate_sex(&sex)?;
    validate_weight(body.weight)?;

    if db::fetch_customer(&state.db, &body.owner_id).await?.is_none() {
        return Err(ApiError::Validation(
            "Customer not found. Please provide a valid ownerId.".into(),
        ));
    }

    let id = db::new_id();
    let now = db::now_str();
    sqlx::query(
        r#"INSERT INTO dogs
           (id, owner_id, name, sex, breed, dob, color, weight, vet, medical_info,
            rabies_vaccine_date, are_vaccines_current, is_fixed, temperament, image_url,
            notes, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&body.owner_id)
    .bind(&name)
    .bind(&sex)
    .bind(&body.breed)
    .bind(&body.dob)
    .bind(&body.color)
    .bind(body.weight)
    .bind(&body.vet)
    .bind(&body.medical_info)
    .bind(&body.rabies_vaccine_date)
    .bind(body.are_vaccines_current as i64)
    .bind(body.is_fixed as i64)
    .bind(&body.temperament)
    .bind(&body.image_url)
    .bind(&body.notes)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = db::fetch_dog(&state.db, &id)
        .await?
        .ok_or(ApiError::Internal("dog missing after insert"))?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": DogBody::from(row) })))
}

async fn update(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateDog>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let existing = db::fetch_dog(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Dog"))?;

    let owner_id = body.owner_id.unwrap_or_else(|| existing.owner_id.clone());
    if owner_id != existing.owner_id
        && db::fetch_customer(&state.db, &owner_id).await?.is_none()
    {
        return Err(ApiError::Validation(
            "Customer not found. Please provide a valid ownerId.".into(),
        ));
    }

    let name = body.name.unwrap_or(existing.name);
    if name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required.".into()));
    }
    let sex = body.sex.unwrap_or(existing.sex);
    validate_sex(&sex)?;
    let weight = body.weight.or(existing.weight);
    validate_weight(weight)?;

    sqlx::query(
        r#"UPDATE dogs
              SET owner_id = ?, name = ?, sex = ?, breed = ?, dob = ?, color = ?, weight = ?,
                  vet = ?, medical_info = ?, rabies_vaccine_date = ?, are_vaccines_current = ?,
                  is_fixed = ?, temperament = ?, image_url = ?, notes = ?, updated_at = ?
            WHERE id = ?"#,
    )
    .bind(&owner_id)
    .bind(name.trim())
    .bind(&sex)
    .bind(body.breed.or(existing.breed))
    .bind(body.dob.or(existing.dob))
    .bind(body.color.or(existing.color))
    .bind(weight)
    .bind(body.vet.or(existing.vet))
    .bind(body.medical_info.or(existing.medical_info))
    .bind(body.rabies_vaccine_date.or(existing.rabies_vaccine_date))
    .bind(
        body.are_vaccines_current
            .map(|value| value as i64)
            .unwrap_or(existing.are_vaccines_current),
    )
    .bind(body.is_fixed.map(|value| value as i64).unwrap_or(existing.is_fixed))
    .bind(body.temperament.or(existing.temperament))
    .bind(body.image_url.or(existing.image_url))
    .bind(body.notes.or(existing.notes))
    .bind(db::now_str())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = db::fetch_dog(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Dog"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": DogBody::from(row) })))
}

async fn remove(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query("DELETE FROM dogs WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Dog"));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {},
        "message": "Dog deleted successfully"
    })))
}
