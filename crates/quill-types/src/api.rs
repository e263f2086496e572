use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// -- Token --

/// Bearer token claims. `user_id` is kept as a raw JSON value so tokens that
/// carry the identity as a string decode as well as ones that carry a number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: serde_json::Value,
    pub exp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

// -- Users --

// Required body fields are `Option` and checked by `validate`, so a missing key
// is reported against its own field name. Unknown keys are ignored.

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        required(message = "field required"),
        email(message = "value is not a valid email address")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "field required"),
        length(min = 1, message = "password must not be empty")
    )]
    pub password: Option<String>,
}

impl CreateUserRequest {
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

/// OAuth2 password-grant form. `username` carries the email address.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// -- Posts --

#[derive(Debug, Deserialize, Validate)]
pub struct PostRequest {
    #[validate(
        required(message = "field required"),
        length(min = 1, message = "title must not be empty")
    )]
    pub title: Option<String>,
    #[validate(required(message = "field required"))]
    pub content: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
}

impl PostRequest {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub owner_id: i64,
    pub owner: UserOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostOut {
    #[serde(rename = "Post")]
    pub post: PostResponse,
    pub votes: i64,
}

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub search: String,
}

fn default_limit() -> u32 {
    10
}

// -- Votes --

#[derive(Debug, Deserialize, Validate)]
pub struct VoteRequest {
    #[validate(required(message = "field required"))]
    pub post_id: Option<i64>,
    #[validate(
        required(message = "field required"),
        range(min = 0, max = 1, message = "dir must be 0 or 1")
    )]
    pub dir: Option<i64>,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
