use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;

/// The authenticated caller, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
}

/// Resolve the bearer token to a stored user, or reject with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or(ApiError::Unauthenticated)?
        .to_owned();
    let user = authenticate(&state, &token).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Bad signatures, expired tokens and deleted accounts all collapse into
/// [`ApiError::Unauthenticated`] so callers cannot probe for accounts.
pub async fn authenticate(state: &AppState, token: &str) -> Result<CurrentUser, ApiError> {
    let identity = state.tokens.verify(token).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthenticated
    })?;
    let user_id: i64 = identity.parse().map_err(|_| ApiError::Unauthenticated)?;

    let user = with_db(state, move |db| Ok(db.get_user_by_id(user_id)?))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}
