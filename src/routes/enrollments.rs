use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::{self, AppError};
use crate::models::{Enrollment, Role};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateEnrollmentRequest {
    pub student_id: Uuid,
    pub instructor_id: Uuid,
    pub site: String,
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateEnrollmentRequest>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    auth.require_admin()?;

    if req.site.trim().is_empty() {
        return Err(AppError::BadRequest("Site is required".to_string()));
    }

    let student = db::users::find_by_id(&state.pool, req.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
    if student.role != Role::Student {
        return Err(AppError::BadRequest("User is not a student".to_string()));
    }

    let instructor = db::users::find_by_id(&state.pool, req.instructor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Instructor not found".to_string()))?;
    if instructor.role != Role::Instructor {
        return Err(AppError::BadRequest("User is not an instructor".to_string()));
    }

    let enrollment = match db::enrollments::create(
        &state.pool,
        req.student_id,
        req.instructor_id,
        req.site.trim(),
    )
    .await
    {
        Ok(enrollment) => enrollment,
        Err(e) if error::is_unique_violation(&e) => {
            return Err(AppError::Conflict(
                "Student is already enrolled under that instructor".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Admins see every enrollment; instructors see their own roster.
pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let enrollments = match auth.role {
        Role::Admin => db::enrollments::list_all(&state.pool).await?,
        Role::Instructor => {
            db::enrollments::list_for_instructor(&state.pool, auth.user_id).await?
        }
        Role::Student => {
            return Err(AppError::Forbidden("Staff access required".to_string()));
        }
    };
    Ok(Json(enrollments))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    db::enrollments::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))?;

    db::enrollments::delete(&state.pool, id).await?;

    Ok(Json(json!({ "message": "Deleted" })))
}
