use std::{fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    models::{AppointmentRow, CustomerRow, DogRow},
    schedule::{self, BookedInterval},
};

pub const APPOINTMENT_SELECT: &str = r#"SELECT a.id, a.customer_id, a.dog_id, a.scheduled_for,
       a.duration_minutes, a.cost, a.notes, a.status, a.is_recurring, a.recurrence_rule,
       a.conflict_flag, a.conflict_note, a.payment_status, a.transaction_id,
       a.created_at, a.updated_at,
       c.name AS customer_name, c.phone AS customer_phone, c.email AS customer_email,
       d.name AS dog_name, d.breed AS dog_breed
  FROM appointments a
  LEFT JOIN customers c ON a.customer_id = c.id
  LEFT JOIN dogs d ON a.dog_id = d.id"#;

pub const DOG_SELECT: &str = r#"SELECT d.id, d.owner_id, d.name, d.sex, d.breed, d.dob, d.color,
       d.weight, d.vet, d.medical_info, d.rabies_vaccine_date, d.are_vaccines_current,
       d.is_fixed, d.temperament, d.image_url, d.notes, d.created_at, d.updated_at,
       c.name AS owner_name, c.phone AS owner_phone, c.email AS owner_email
  FROM dogs d
  LEFT JOIN customers c ON d.owner_id = c.id"#;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn now_str() -> String {
    schedule::format_timestamp(Utc::now())
}

pub async fn fetch_appointment(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<AppointmentRow>, sqlx::Error> {
    let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = ? LIMIT 1");
    sqlx::query_as::<_, AppointmentRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_customer(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<CustomerRow>, sqlx::Error> {
    sqlx::query_as::<_, CustomerRow>(
        "SELECT id, name, phone, email, occupation, address, created_at, updated_at
           FROM customers WHERE id = ? LIMIT 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_dog(pool: &SqlitePool, id: &str) -> Result<Option<DogRow>, sqlx::Error> {
    let sql = format!("{DOG_SELECT} WHERE d.id = ? LIMIT 1");
    sqlx::query_as::<_, DogRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

// Candidate set for conflict annotation: every active appointment except the
// record being written.
pub async fn fetch_active_intervals(
    pool: &SqlitePool,
    exclude_id: Option<&str>,
) -> Result<Vec<BookedInterval>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, String, i64)>(
        r#"SELECT id, dog_id, scheduled_for, duration_minutes
             FROM appointments
            WHERE status NOT IN ('cancelled', 'completed') AND id <> ?"#,
    )
    .bind(exclude_id.unwrap_or_default())
    .fetch_all(pool)
    .await?;

    Ok(rows_to_intervals(rows))
}

pub async fn fetch_day_intervals(
    pool: &SqlitePool,
    day_start: &str,
    day_end: &str,
) -> Result<Vec<BookedInterval>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, String, i64)>(
        r#"SELECT id, dog_id, scheduled_for, duration_minutes
             FROM appointments
            WHERE status NOT IN ('cancelled', 'completed')
              AND scheduled_for >= ? AND scheduled_for < ?"#,
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await?;

    Ok(rows_to_intervals(rows))
}

fn rows_to_intervals(rows: Vec<(String, String, String, i64)>) -> Vec<BookedInterval> {
    rows.into_iter()
        .filter_map(|(id, dog_id, scheduled_for, duration_minutes)| {
            match schedule::parse_timestamp(&scheduled_for) {
                Some(starts_at) => Some(BookedInterval {
                    id,
                    dog_id,
                    starts_at,
                    duration_minutes,
                }),
                None => {
                    log::warn!("Skipping appointment {id}: unreadable time '{scheduled_for}'");
                    None
                }
            }
        })
        .collect()
}
