use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Enrollment;

pub async fn create(
    pool: &PgPool,
    student_id: Uuid,
    instructor_id: Uuid,
    site: &str,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "INSERT INTO enrollments (student_id, instructor_id, site)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(student_id)
    .bind(instructor_id)
    .bind(site)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn list_for_instructor(
    pool: &PgPool,
    instructor_id: Uuid,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE instructor_id = $1 ORDER BY created_at DESC",
    )
    .bind(instructor_id)
    .fetch_all(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM enrollments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
