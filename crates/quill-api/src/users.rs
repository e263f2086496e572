use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use validator::Validate;

use quill_db::DbError;
use quill_types::api::{CreateUserRequest, UserOut};

use crate::auth::{AppState, with_db};
use crate::convert::user_out;
use crate::error::ApiError;
use crate::password::hash_password;

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let user = with_db(&state, move |db| {
        // Hash password with Argon2id
        let password_hash = hash_password(req.password())
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?;

        db.create_user(req.email(), &password_hash).map_err(|e| match e {
            DbError::Conflict => {
                ApiError::Conflict(format!("User with email: {} already exists", req.email()))
            }
            other => other.into(),
        })
    })
    .await?;

    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user_out(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserOut>, ApiError> {
    let Path(id) = id?;

    let user = with_db(&state, move |db| Ok(db.get_user_by_id(id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id: {} does not exist", id)))?;

    Ok(Json(user_out(user)))
}
