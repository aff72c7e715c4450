use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{PracticumReport, Role};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateReportRequest {
    pub title: String,
    pub body: String,
    pub hours: f64,
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<PracticumReport>), AppError> {
    if auth.role != Role::Student {
        return Err(AppError::Forbidden(
            "Only students submit practicum reports".to_string(),
        ));
    }

    if req.title.trim().is_empty() || req.body.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and body are required".to_string(),
        ));
    }
    if !(req.hours > 0.0 && req.hours <= 24.0) {
        return Err(AppError::BadRequest(
            "Hours must be between 0 and 24".to_string(),
        ));
    }

    let report = db::reports::create(
        &state.pool,
        auth.user_id,
        req.title.trim(),
        &req.body,
        req.hours,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<PracticumReport>>, AppError> {
    if auth.role != Role::Student {
        return Err(AppError::Forbidden(
            "Only students submit practicum reports".to_string(),
        ));
    }
    let reports = db::reports::list_for_student(&state.pool, auth.user_id).await?;
    Ok(Json(reports))
}
