use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use validator::Validate;

use quill_db::DbError;
use quill_db::models::VoteDirection;
use quill_types::api::{MessageResponse, VoteRequest};

use crate::auth::{AppState, with_db};
use crate::error::{ApiError, FieldError};
use crate::middleware::CurrentUser;

/// `dir = 1` adds the caller's vote, `dir = 0` withdraws it.
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let (Some(post_id), Some(dir)) = (req.post_id, req.dir) else {
        return Err(ApiError::Validation(vec![FieldError::new(
            "body",
            "post_id and dir are required",
        )]));
    };
    let direction = VoteDirection::try_from(dir).map_err(|_| {
        ApiError::Validation(vec![FieldError::new("dir", "dir must be 0 or 1")])
    })?;
    let user_id = user.id;

    with_db(&state, move |db| {
        if db.find_post(post_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Post with id: {} does not exist",
                post_id
            )));
        }

        db.cast_vote(user_id, post_id, direction).map_err(|e| match (e, direction) {
            (DbError::Conflict, _) => ApiError::Conflict(format!(
                "user {} has already voted on post {}",
                user_id, post_id
            )),
            (DbError::NotFound, VoteDirection::Remove) => {
                ApiError::NotFound("Vote does not exist".into())
            }
            (DbError::NotFound, VoteDirection::Add) => ApiError::NotFound(format!(
                "Post with id: {} does not exist",
                post_id
            )),
            (other, _) => other.into(),
        })
    })
    .await?;

    let message = match direction {
        VoteDirection::Add => "successfully added vote",
        VoteDirection::Remove => "successfully deleted vote",
    };
    info!(
        "User {} ({}) vote on post {}: {:?}",
        user_id, user.email, post_id, direction
    );
    Ok((StatusCode::CREATED, Json(MessageResponse::new(message))))
}
