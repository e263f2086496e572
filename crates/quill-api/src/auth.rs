use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
};
use tracing::{error, info};

use quill_db::Database;
use quill_types::api::{LoginForm, Token};

use crate::error::ApiError;
use crate::password::verify_password;
use crate::token::TokenCodec;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenCodec,
}

/// Run blocking store work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("blocking task failed".into())
        })?
}

/// OAuth2 password grant: `username` is the account email.
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<Token>, ApiError> {
    let Form(form) = form?;

    // Unknown email and wrong password are indistinguishable to the caller.
    let user_id = with_db(&state, move |db| {
        let user = db
            .get_user_by_email(&form.username)?
            .ok_or(ApiError::InvalidCredentials)?;

        let matches = verify_password(&form.password, &user.password).map_err(|e| {
            ApiError::Internal(format!("unreadable password hash for user {}: {}", user.id, e))
        })?;
        if !matches {
            return Err(ApiError::InvalidCredentials);
        }
        Ok(user.id)
    })
    .await?;

    let access_token = state
        .tokens
        .issue(user_id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("User {} logged in", user_id);
    Ok(Json(Token {
        access_token,
        token_type: "bearer".into(),
    }))
}
