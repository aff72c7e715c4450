use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::db;
use crate::error::{self, AppError};
use crate::models::{Role, User};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    auth.require_admin()?;

    if req.email.is_empty() || req.password.is_empty() || req.name.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let role: Role = req.role.parse().map_err(AppError::BadRequest)?;
    let email = req.email.trim().to_lowercase();
    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = match db::users::create(&state.pool, &email, &pw_hash, &req.name, role).await {
        Ok(user) => user,
        Err(e) if error::is_unique_violation(&e) => {
            return Err(AppError::Conflict(
                "A user with that email already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_admin()?;
    let users = db::users::list_all(&state.pool).await?;
    Ok(Json(users))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if id == auth.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    db::users::delete(&state.pool, id).await?;

    Ok(Json(json!({ "message": "Deleted" })))
}
