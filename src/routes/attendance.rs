use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{AttendanceRecord, Role};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ClockInRequest {
    pub location: String,
    pub notes: Option<String>,
}

fn require_student(auth: &AuthUser) -> Result<(), AppError> {
    if auth.role != Role::Student {
        return Err(AppError::Forbidden(
            "Only students track attendance".to_string(),
        ));
    }
    Ok(())
}

pub async fn clock_in(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ClockInRequest>,
) -> Result<(StatusCode, Json<AttendanceRecord>), AppError> {
    require_student(&auth)?;

    if req.location.trim().is_empty() {
        return Err(AppError::BadRequest("Location is required".to_string()));
    }

    if db::attendance::find_open(&state.pool, auth.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Already clocked in".to_string()));
    }

    let record = db::attendance::clock_in(
        &state.pool,
        auth.user_id,
        req.location.trim(),
        req.notes.as_deref().unwrap_or(""),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn clock_out(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<AttendanceRecord>, AppError> {
    require_student(&auth)?;

    let open = db::attendance::find_open(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No open attendance record".to_string()))?;

    let record = db::attendance::clock_out(&state.pool, open.id).await?;
    Ok(Json(record))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    require_student(&auth)?;
    let records = db::attendance::list_for_student(&state.pool, auth.user_id).await?;
    Ok(Json(records))
}
