use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AttendanceRecord;

/// The record a student is currently clocked into, if any.
pub async fn find_open(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance_records WHERE student_id = $1 AND clock_out IS NULL",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub async fn clock_in(
    pool: &PgPool,
    student_id: Uuid,
    location: &str,
    notes: &str,
) -> Result<AttendanceRecord, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "INSERT INTO attendance_records (student_id, location, notes)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(student_id)
    .bind(location)
    .bind(notes)
    .fetch_one(pool)
    .await
}

pub async fn clock_out(pool: &PgPool, id: Uuid) -> Result<AttendanceRecord, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "UPDATE attendance_records SET clock_out = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance_records WHERE student_id = $1 ORDER BY clock_in DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}
