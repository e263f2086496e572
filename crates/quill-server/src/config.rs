use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

use quill_api::token::TokenConfig;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Process configuration, read once at startup from the environment
/// (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub secret_key: String,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            secret_key: std::env::var("QUILL_SECRET_KEY").unwrap_or_default(),
            algorithm: std::env::var("QUILL_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            access_token_expire_minutes: std::env::var("QUILL_ACCESS_TOKEN_EXPIRE_MINUTES")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .context("QUILL_ACCESS_TOKEN_EXPIRE_MINUTES must be an integer")?,
            db_path: std::env::var("QUILL_DB_PATH")
                .unwrap_or_else(|_| "quill.db".into())
                .into(),
            host: std::env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("QUILL_PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()
                .context("QUILL_PORT must be a port number")?,
        })
    }

    /// Token settings. Refuses an unset or placeholder secret.
    pub fn token_config(&self) -> anyhow::Result<TokenConfig> {
        if self.secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&self.secret_key.as_str()) {
            bail!("QUILL_SECRET_KEY is unset or still a placeholder");
        }
        if self.access_token_expire_minutes <= 0 {
            bail!("QUILL_ACCESS_TOKEN_EXPIRE_MINUTES must be positive");
        }

        Ok(TokenConfig {
            secret: self.secret_key.clone(),
            algorithm: self.algorithm.clone(),
            expires_in: Duration::minutes(self.access_token_expire_minutes),
        })
    }
}
