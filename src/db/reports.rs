use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PracticumReport;

pub async fn create(
    pool: &PgPool,
    student_id: Uuid,
    title: &str,
    body: &str,
    hours: f64,
) -> Result<PracticumReport, sqlx::Error> {
    sqlx::query_as::<_, PracticumReport>(
        "INSERT INTO practicum_reports (student_id, title, body, hours)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(student_id)
    .bind(title)
    .bind(body)
    .bind(hours)
    .fetch_one(pool)
    .await
}

pub async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<PracticumReport>, sqlx::Error> {
    sqlx::query_as::<_, PracticumReport>(
        "SELECT * FROM practicum_reports WHERE student_id = $1 ORDER BY created_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}
