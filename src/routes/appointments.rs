use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    db::{self, APPOINTMENT_SELECT},
    error::ApiError,
    models::{
        AppointmentBody, AppointmentRow, AppointmentStatus, PaymentStatus, RecurrenceRule,
        DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
    },
    schedule,
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    customer_id: Option<String>,
    dog_id: Option<String>,
    start: Option<String>,
    end: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct AvailabilityQuery {
    date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppointment {
    customer_id: String,
    dog_id: String,
    date_time: String,
    duration_minutes: Option<i64>,
    cost: Option<f64>,
    notes: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
    transaction_id: Option<String>,
    #[serde(default)]
    is_recurring: bool,
    recurrence_rule: Option<RecurrenceRule>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAppointment {
    date_time: Option<String>,
    duration_minutes: Option<i64>,
    cost: Option<f64>,
    notes: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
    transaction_id: Option<String>,
    is_recurring: Option<bool>,
    recurrence_rule: Option<RecurrenceRule>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/appointments")
            .service(web::resource("/availability").route(web::get().to(availability)))
            .service(
                web::resource("")
                    .route(web::get().to(list))
                    .route(web::post().to(create)),
            )
            .service(web::resource("/{id}/cancel").route(web::patch().to(cancel)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_one))
                    .route(web::put().to(update))
                    .route(web::delete().to(remove)),
            ),
    );
}

fn parse_date_time(value: &str) -> Result<chrono::DateTime<Utc>, ApiError> {
    schedule::parse_timestamp(value).ok_or_else(|| {
        ApiError::Validation("Invalid dateTime. Provide an ISO-8601 timestamp.".into())
    })
}

fn validate_duration(minutes: i64) -> Result<i64, ApiError> {
    if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(ApiError::Validation(format!(
            "durationMinutes must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}."
        )))
    }
}

fn validate_cost(cost: f64) -> Result<f64, ApiError> {
    if cost.is_finite() && cost >= 0.0 {
        Ok(cost)
    } else {
        Err(ApiError::Validation(
            "Cost must be a non-negative number.".into(),
        ))
    }
}

fn parse_status(value: Option<&str>) -> Result<AppointmentStatus, ApiError> {
    match value {
        Some(value) => AppointmentStatus::parse(value).ok_or_else(|| {
            ApiError::Validation(
                "Invalid status. Must be: pending, confirmed, completed, or cancelled".into(),
            )
        }),
        None => Ok(AppointmentStatus::default()),
    }
}

fn parse_payment_status(value: Option<&str>) -> Result<PaymentStatus, ApiError> {
    match value {
        Some(value) => PaymentStatus::parse(value).ok_or_else(|| {
            ApiError::Validation(
                "Invalid paymentStatus. Must be: unpaid, paid, refunded, or partial".into(),
            )
        }),
        None => Ok(PaymentStatus::default()),
    }
}

fn validate_recurrence(rule: &RecurrenceRule) -> Result<(), ApiError> {
    if rule.interval < 1 {
        return Err(ApiError::Validation(
            "recurrenceRule.interval must be at least 1.".into(),
        ));
    }
    Ok(())
}

// Range filters accept a plain date or a full timestamp; dates widen to the
// whole day in UTC.
fn range_bound(value: &str, end_of_day: bool) -> Result<String, ApiError> {
    if let Some(parsed) = schedule::parse_timestamp(value) {
        return Ok(schedule::format_timestamp(parsed));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::Validation(format!("Invalid date '{value}'. Use YYYY-MM-DD."))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(schedule::format_timestamp(
        Utc.from_utc_datetime(&date.and_time(time)),
    ))
}

async fn list(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let mut sql = format!("{APPOINTMENT_SELECT} WHERE 1=1");
    let mut binds: Vec<String> = Vec::new();

    if let Some(customer_id) = query.customer_id {
        sql.push_str(" AND a.customer_id = ?");
        binds.push(customer_id);
    }
    if let Some(dog_id) = query.dog_id {
        sql.push_str(" AND a.dog_id = ?");
        binds.push(dog_id);
    }
    if let Some(status) = query.status.as_deref() {
        let status = parse_status(Some(status))?;
        sql.push_str(" AND a.status = ?");
        binds.push(status.as_str().to_string());
    }
    if let Some(start) = query.start.as_deref() {
        sql.push_str(" AND a.scheduled_for >= ?");
        binds.push(range_bound(start, false)?);
    }
    if let Some(end) = query.end.as_deref() {
        sql.push_str(" AND a.scheduled_for <= ?");
        binds.push(range_bound(end, true)?);
    }
    sql.push_str(" ORDER BY a.scheduled_for ASC");

    let mut fetch = sqlx::query_as::<_, AppointmentRow>(&sql);
    for bind in &binds {
        fetch = fetch.bind(bind);
    }
    let rows = fetch.fetch_all(&state.db).await?;

    let data: Vec<AppointmentBody> = rows.into_iter().map(AppointmentBody::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "count": data.len(), "data": data })))
}

async fn availability(
    state: web::Data<AppState>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, ApiError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation("Invalid date. Use YYYY-MM-DD.".into()))?;

    let offset = state.schedule.offset;
    let (day_start, day_end) = schedule::day_bounds(date, offset);
    let booked = db::fetch_day_intervals(&state.db, &day_start, &day_end).await?;
    let slots = schedule::available_slots(date, &booked, Utc::now(), offset);
    let next_available = slots.first().cloned();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": slots.len(),
        "data": slots,
        "nextAvailable": next_available,
    })))
}

async fn get_one(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let row = db::fetch_appointment(&state.db, &path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": AppointmentBody::from(row) })))
}

async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateAppointment>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let starts_at = parse_date_time(&body.date_time)?;
    let duration_minutes =
        validate_duration(body.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES))?;
    let cost = validate_cost(body.cost.unwrap_or(0.0))?;
    let status = parse_status(body.status.as_deref())?;
    let payment_status = parse_payment_status(body.payment_status.as_deref())?;
    if let Some(rule) = &body.recurrence_rule {
        validate_recurrence(rule)?;
    }

    let customer = db::fetch_customer(&state.db, &body.customer_id)
        .await?
        .ok_or_else(|| {
            ApiError::Validation("Customer not found. Please select a valid customer.".into())
        })?;
    let dog = db::fetch_dog(&state.db, &body.dog_id).await?.ok_or_else(|| {
        ApiError::Validation("Dog not found. Please select a valid dog.".into())
    })?;
    if dog.owner_id != customer.id {
        return Err(ApiError::Validation(
            "Dog does not belong to the specified customer.".into(),
        ));
    }

    let others = db::fetch_active_intervals(&state.db, None).await?;
    let annotation = schedule::annotate(
        starts_at,
        duration_minutes,
        &dog.id,
        &others,
        state.schedule.scope,
    );

    let recurrence_json = body
        .recurrence_rule
        .as_ref()
        .and_then(|rule| serde_json::to_string(rule).ok());

    let id = db::new_id();
    let now = db::now_str();
    sqlx::query(
        r#"INSERT INTO appointments
           (id, customer_id, dog_id, scheduled_for, duration_minutes, cost, notes, status,
            is_recurring, recurrence_rule, conflict_flag, conflict_note, payment_status,
            transaction_id, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&customer.id)
    .bind(&dog.id)
    .bind(schedule::format_timestamp(starts_at))
    .bind(duration_minutes)
    .bind(cost)
    .bind(&body.notes)
    .bind(status.as_str())
    .bind(body.is_recurring as i64)
    .bind(&recurrence_json)
    .bind(annotation.flag as i64)
    .bind(annotation.note)
    .bind(payment_status.as_str())
    .bind(&body.transaction_id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let row = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or(ApiError::Internal("appointment missing after insert"))?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": AppointmentBody::from(row) })))
}

async fn update(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateAppointment>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let existing = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;

    let starts_at = match body.date_time.as_deref() {
        Some(value) => parse_date_time(value)?,
        None => schedule::parse_timestamp(&existing.scheduled_for)
            .ok_or(ApiError::Internal("stored dateTime is unreadable"))?,
    };
    let duration_minutes =
        validate_duration(body.duration_minutes.unwrap_or(existing.duration_minutes))?;
    let cost = validate_cost(body.cost.unwrap_or(existing.cost))?;
    let status = match body.status.as_deref() {
        Some(value) => parse_status(Some(value))?.as_str().to_string(),
        None => existing.status.clone(),
    };
    let payment_status = match body.payment_status.as_deref() {
        Some(value) => parse_payment_status(Some(value))?.as_str().to_string(),
        None => existing.payment_status.clone(),
    };
    let is_recurring = body
        .is_recurring
        .map(|value| value as i64)
        .unwrap_or(existing.is_recurring);
    let recurrence_json = match &body.recurrence_rule {
        Some(rule) => {
            validate_recurrence(rule)?;
            serde_json::to_string(rule).ok()
        }
        None => existing.recurrence_rule.clone(),
    };

    // Client-supplied conflict fields are ignored; the annotation is derived here.
    let others = db::fetch_active_intervals(&state.db, Some(&id)).await?;
    let annotation = schedule::annotate(
        starts_at,
        duration_minutes,
        &existing.dog_id,
        &others,
        state.schedule.scope,
    );

    sqlx::query(
        r#"UPDATE appointments
              SET scheduled_for = ?, duration_minutes = ?, cost = ?, notes = ?, status = ?,
                  is_recurring = ?, recurrence_rule = ?, conflict_flag = ?, conflict_note = ?,
                  payment_status = ?, transaction_id = ?, updated_at = ?
            WHERE id = ?"#,
    )
    .bind(schedule::format_timestamp(starts_at))
    .bind(duration_minutes)
    .bind(cost)
    .bind(body.notes.or(existing.notes))
    .bind(&status)
    .bind(is_recurring)
    .bind(&recurrence_json)
    .bind(annotation.flag as i64)
    .bind(annotation.note)
    .bind(&payment_status)
    .bind(body.transaction_id.or(existing.transaction_id))
    .bind(db::now_str())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let row = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": AppointmentBody::from(row) })))
}

// Unconditional soft delete: any prior status, repeated calls included.
async fn cancel(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let result = sqlx::query("UPDATE appointments SET status = ?, updated_at = ? WHERE id = ?")
        .bind(AppointmentStatus::Cancelled.as_str())
        .bind(db::now_str())
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Appointment"));
    }

    let row = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": AppointmentBody::from(row),
        "message": "Appointment cancelled successfully"
    })))
}

async fn remove(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Appointment"));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {},
        "message": "Appointment deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use chrono::{Offset, Utc};
    use serde_json::{json, Value};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use crate::{
        db,
        routes,
        schedule::{ConflictScope, SchedulePolicy},
        state::AppState,
    };

    macro_rules! spawn_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(routes::customers::configure)
                    .configure(routes::dogs::configure)
                    .configure(routes::appointments::configure),
            )
            .await
        };
    }

    async fn test_state(scope: ConflictScope) -> AppState {
        // A pool with more than one connection would open separate in-memory
        // databases.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("pool");
        db::run_migrations(&pool).await.expect("migrations");
        AppState {
            db: pool,
            schedule: SchedulePolicy {
                scope,
                offset: Utc.fix(),
            },
        }
    }

    async fn seed_customer(pool: &SqlitePool, name: &str) -> String {
        let id = db::new_id();
        let now = db::now_str();
        sqlx::query(
            "INSERT INTO customers (id, name, phone, created_at, updated_at) VALUES (?, ?, '555-0100', ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed customer");
        id
    }

    async fn seed_dog(pool: &SqlitePool, owner_id: &str, name: &str) -> String {
        let id = db::new_id();
        let now = db::now_str();
        sqlx::query(
            "INSERT INTO dogs (id, owner_id, name, sex, created_at, updated_at) VALUES (?, ?, ?, 'unknown', ?, ?)",
        )
        .bind(&id)
        .bind(owner_id)
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed dog");
        id
    }

    async fn seed_appointment(
        pool: &SqlitePool,
        customer_id: &str,
        dog_id: &str,
        scheduled_for: &str,
        duration_minutes: i64,
        status: &str,
    ) -> String {
        let id = db::new_id();
        let now = db::now_str();
        sqlx::query(
            r#"INSERT INTO appointments
               (id, customer_id, dog_id, scheduled_for, duration_minutes, cost, status,
                is_recurring, conflict_flag, payment_status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, 0, ?, 0, 0, 'unpaid', ?, ?)"#,
        )
        .bind(&id)
        .bind(customer_id)
        .bind(dog_id)
        .bind(scheduled_for)
        .bind(duration_minutes)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed appointment");
        id
    }

    fn booking(customer_id: &str, dog_id: &str, date_time: &str, duration_minutes: i64) -> Value {
        json!({
            "customerId": customer_id,
            "dogId": dog_id,
            "dateTime": date_time,
            "durationMinutes": duration_minutes,
        })
    }

    #[actix_web::test]
    async fn booking_flags_overlap_with_active_appointment() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer, &dog, "2025-06-01T10:30:00Z", 30))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(false));
        assert!(body["data"]["conflictNote"].is_null());

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer, &dog, "2025-06-01T10:00:00Z", 60))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["conflictFlag"], json!(true));
        assert_eq!(
            body["data"]["conflictNote"],
            json!("Time slot overlaps with another appointment")
        );
    }

    #[actix_web::test]
    async fn cancelled_appointments_do_not_conflict() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;
        seed_appointment(&pool, &customer, &dog, "2025-06-01T10:30:00Z", 30, "cancelled").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer, &dog, "2025-06-01T10:00:00Z", 60))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(false));
    }

    #[actix_web::test]
    async fn touching_bookings_do_not_conflict() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;
        seed_appointment(&pool, &customer, &dog, "2025-06-01T10:00:00Z", 60, "confirmed").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer, &dog, "2025-06-01T11:00:00Z", 30))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(false));
    }

    #[actix_web::test]
    async fn conflicts_span_dogs_under_global_scope() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer_a = seed_customer(&pool, "Dana").await;
        let dog_a = seed_dog(&pool, &customer_a, "Rex").await;
        let customer_b = seed_customer(&pool, "Morgan").await;
        let dog_b = seed_dog(&pool, &customer_b, "Biscuit").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer_a, &dog_a, "2025-06-01T10:00:00Z", 60))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer_b, &dog_b, "2025-06-01T10:30:00Z", 30))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(true));
    }

    #[actix_web::test]
    async fn per_dog_scope_allows_unrelated_dogs_to_share_a_slot() {
        let state = test_state(ConflictScope::PerDog).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer_a = seed_customer(&pool, "Dana").await;
        let dog_a = seed_dog(&pool, &customer_a, "Rex").await;
        let customer_b = seed_customer(&pool, "Morgan").await;
        let dog_b = seed_dog(&pool, &customer_b, "Biscuit").await;
        seed_appointment(&pool, &customer_a, &dog_a, "2025-06-01T10:00:00Z", 60, "confirmed").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer_b, &dog_b, "2025-06-01T10:30:00Z", 30))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(false));

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer_a, &dog_a, "2025-06-01T10:30:00Z", 30))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(true));
        assert_eq!(
            body["data"]["conflictNote"],
            json!("Time slot overlaps with another appointment for this dog")
        );
    }

    #[actix_web::test]
    async fn moving_an_appointment_clears_its_flag() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;
        seed_appointment(&pool, &customer, &dog, "2025-06-01T10:00:00Z", 60, "confirmed").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer, &dog, "2025-06-01T10:30:00Z", 30))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(true));
        let id = body["data"]["id"].as_str().expect("id").to_string();

        let req = test::TestRequest::put()
            .uri(&format!("/api/appointments/{id}"))
            .set_json(json!({ "dateTime": "2025-06-01T13:00:00Z" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["conflictFlag"], json!(false));
        assert!(body["data"]["conflictNote"].is_null());
        assert_eq!(body["data"]["dateTime"], json!("2025-06-01T13:00:00Z"));
    }

    #[actix_web::test]
    async fn cancel_is_idempotent() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;
        let id =
            seed_appointment(&pool, &customer, &dog, "2025-06-01T10:00:00Z", 60, "confirmed").await;

        for _ in 0..2 {
            let req = test::TestRequest::patch()
                .uri(&format!("/api/appointments/{id}/cancel"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["data"]["status"], json!("cancelled"));
            assert_eq!(body["message"], json!("Appointment cancelled successfully"));
        }
    }

    #[actix_web::test]
    async fn rejects_dog_owned_by_another_customer() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer_a = seed_customer(&pool, "Dana").await;
        let customer_b = seed_customer(&pool, "Morgan").await;
        let dog_b = seed_dog(&pool, &customer_b, "Biscuit").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer_a, &dog_b, "2025-06-01T10:00:00Z", 60))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["error"],
            json!("Dog does not belong to the specified customer.")
        );
    }

    #[actix_web::test]
    async fn rejects_invalid_bookings() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;

        let cases = [
            booking(&customer, &dog, "2025-06-01T10:00:00Z", 10),
            booking(&customer, &dog, "2025-06-01T10:00:00Z", 300),
            booking(&customer, &dog, "next tuesday", 60),
            booking("missing-customer", &dog, "2025-06-01T10:00:00Z", 60),
            json!({
                "customerId": customer,
                "dogId": dog,
                "dateTime": "2025-06-01T10:00:00Z",
                "cost": -5.0,
            }),
            json!({
                "customerId": customer,
                "dogId": dog,
                "dateTime": "2025-06-01T10:00:00Z",
                "status": "accepted",
            }),
        ];
        for case in cases {
            let req = test::TestRequest::post()
                .uri("/api/appointments")
                .set_json(case)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn availability_excludes_booked_slots() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;
        seed_appointment(&pool, &customer, &dog, "2030-05-20T10:00:00Z", 60, "confirmed").await;

        let req = test::TestRequest::get()
            .uri("/api/appointments/availability?date=2030-05-20")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["count"], json!(17));
        assert_eq!(body["nextAvailable"]["time"], json!("08:00"));

        let times: Vec<&str> = body["data"]
            .as_array()
            .expect("slots")
            .iter()
            .filter_map(|slot| slot["time"].as_str())
            .collect();
        assert!(times.contains(&"09:00"));
        assert!(times.contains(&"11:00"));
        assert!(!times.contains(&"09:30"));
        assert!(!times.contains(&"10:00"));
        assert!(!times.contains(&"10:30"));
    }

    #[actix_web::test]
    async fn availability_ignores_cancelled_bookings() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;
        seed_appointment(&pool, &customer, &dog, "2030-05-20T10:00:00Z", 60, "cancelled").await;

        let req = test::TestRequest::get()
            .uri("/api/appointments/availability?date=2030-05-20")
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], json!(20));
    }

    #[actix_web::test]
    async fn availability_for_a_past_day_is_empty_not_an_error() {
        let state = test_state(ConflictScope::Global).await;
        let app = spawn_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/appointments/availability?date=2020-01-01")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["count"], json!(0));
        assert_eq!(body["data"], json!([]));
        assert!(body["nextAvailable"].is_null());
    }

    #[actix_web::test]
    async fn availability_rejects_malformed_dates() {
        let state = test_state(ConflictScope::Global).await;
        let app = spawn_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/appointments/availability?date=May%2020")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn list_sorts_and_filters() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog_a = seed_dog(&pool, &customer, "Rex").await;
        let dog_b = seed_dog(&pool, &customer, "Biscuit").await;
        seed_appointment(&pool, &customer, &dog_a, "2025-06-02T14:00:00Z", 60, "confirmed").await;
        seed_appointment(&pool, &customer, &dog_a, "2025-06-01T10:00:00Z", 60, "completed").await;
        seed_appointment(&pool, &customer, &dog_b, "2025-06-03T09:00:00Z", 30, "confirmed").await;

        let req = test::TestRequest::get().uri("/api/appointments").to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], json!(3));
        let times: Vec<&str> = body["data"]
            .as_array()
            .expect("data")
            .iter()
            .filter_map(|appt| appt["dateTime"].as_str())
            .collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);

        let req = test::TestRequest::get()
            .uri(&format!("/api/appointments?dogId={dog_b}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["data"][0]["dogId"], json!(dog_b));

        let req = test::TestRequest::get()
            .uri("/api/appointments?status=completed")
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], json!(1));

        let req = test::TestRequest::get()
            .uri("/api/appointments?start=2025-06-01&end=2025-06-02")
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["count"], json!(2));

        let req = test::TestRequest::get()
            .uri("/api/appointments?status=accepted")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn hard_delete_removes_the_record() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;
        let id =
            seed_appointment(&pool, &customer, &dog, "2025-06-01T10:00:00Z", 60, "confirmed").await;

        let req = test::TestRequest::delete()
            .uri(&format!("/api/appointments/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/appointments/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("Appointment not found"));

        let req = test::TestRequest::delete()
            .uri(&format!("/api/appointments/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn responses_embed_customer_and_dog_summaries() {
        let state = test_state(ConflictScope::Global).await;
        let pool = state.db.clone();
        let app = spawn_app!(state);
        let customer = seed_customer(&pool, "Dana").await;
        let dog = seed_dog(&pool, &customer, "Rex").await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(booking(&customer, &dog, "2025-06-01T10:00:00Z", 60))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["customer"]["name"], json!("Dana"));
        assert_eq!(body["data"]["dog"]["name"], json!("Rex"));
        assert_eq!(body["data"]["status"], json!("confirmed"));
        assert_eq!(body["data"]["paymentStatus"], json!("unpaid"));
        assert_eq!(body["data"]["cost"], json!(0.0));
    }
}
