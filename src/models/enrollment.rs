use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Links a student to the instructor supervising their practicum. The set of
/// enrollments under one instructor is that instructor's roster.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub instructor_id: Uuid,
    pub site: String,
    pub created_at: DateTime<Utc>,
}
