use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PracticumReport {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub body: String,
    pub hours: f64,
    pub created_at: DateTime<Utc>,
}
