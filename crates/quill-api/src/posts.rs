use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use validator::Validate;

use quill_db::DbError;
use quill_db::models::PostFields;
use quill_types::api::{PostOut, PostQuery, PostRequest, PostResponse};

use crate::auth::{AppState, with_db};
use crate::convert::{post_out, post_response};
use crate::error::ApiError;
use crate::middleware::CurrentUser;

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("post with id: {} was not found", id))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    query: Result<Query<PostQuery>, QueryRejection>,
) -> Result<Json<Vec<PostOut>>, ApiError> {
    let Query(query) = query?;

    let rows = with_db(&state, move |db| {
        Ok(db.list_posts(&query.search, query.limit, query.skip)?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(post_out).collect()))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let owner_id = user.id;
    let row = with_db(&state, move |db| {
        let fields = PostFields {
            title: req.title(),
            content: req.content(),
            published: req.published,
        };
        Ok(db.create_post(owner_id, &fields)?)
    })
    .await?;

    info!("User {} ({}) created post {}", owner_id, user.email, row.id);
    Ok((StatusCode::CREATED, Json(post_response(row))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PostOut>, ApiError> {
    let Path(id) = id?;

    let row = with_db(&state, move |db| {
        db.get_post(id).map_err(|e| match e {
            DbError::NotFound => not_found(id),
            other => other.into(),
        })
    })
    .await?;

    Ok(Json(post_out(row)))
}

/// Replaces title, content and published. Only the owner may do this.
pub async fn update_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<Json<PostResponse>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    req.validate()?;

    let caller = user.id;
    let row = with_db(&state, move |db| {
        let existing = db.find_post(id)?.ok_or_else(|| not_found(id))?;
        if existing.owner_id != caller {
            return Err(ApiError::Forbidden);
        }

        let fields = PostFields {
            title: req.title(),
            content: req.content(),
            published: req.published,
        };
        db.update_post(id, &fields).map_err(|e| match e {
            DbError::NotFound => not_found(id),
            other => other.into(),
        })
    })
    .await?;

    info!("User {} ({}) updated post {}", caller, user.email, id);
    Ok(Json(post_response(row)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;

    let caller = user.id;
    with_db(&state, move |db| {
        let existing = db.find_post(id)?.ok_or_else(|| not_found(id))?;
        if existing.owner_id != caller {
            return Err(ApiError::Forbidden);
        }

        db.delete_post(id).map_err(|e| match e {
            DbError::NotFound => not_found(id),
            other => other.into(),
        })
    })
    .await?;

    info!("User {} ({}) deleted post {}", caller, user.email, id);
    Ok(StatusCode::NO_CONTENT)
}
