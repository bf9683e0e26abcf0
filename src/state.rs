use sqlx::SqlitePool;

use crate::schedule::SchedulePolicy;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub schedule: SchedulePolicy,
}
