use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use quill_db::DbError;

/// Every way a request can fail, mapped onto a status code in
/// [`ApiError::status_code`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, expired or orphaned bearer token.
    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error("Not authorized to perform requested action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredentials | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::Unauthenticated => {
                let mut response =
                    (status, Json(json!({ "detail": self.to_string() }))).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Validation(fields) => (status, Json(json!({ "detail": fields }))).into_response(),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (status, Json(json!({ "detail": "Internal server error" }))).into_response()
            }
            other => (status, Json(json!({ "detail": other.to_string() }))).into_response(),
        }
    }
}

/// Store errors without a more specific mapping at the call site.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => ApiError::NotFound("Resource not found".into()),
            DbError::Conflict => ApiError::Conflict("Resource already exists".into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    FieldError::new(field.to_string(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Validation(fields)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("query", rejection.body_text())])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(vec![FieldError::new("path", rejection.body_text())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    use quill_types::api::{CreateUserRequest, VoteRequest};

    #[test]
    fn unauthenticated_carries_bearer_challenge() {
        let response = ApiError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(DbError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::Conflict).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DbError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_lists_each_offending_field() {
        let req = CreateUserRequest {
            email: Some("not-an-email".into()),
            password: Some(String::new()),
        };
        let ApiError::Validation(fields) = ApiError::from(req.validate().unwrap_err()) else {
            panic!("expected validation error");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["email", "password"]);
    }

    #[test]
    fn vote_direction_outside_binary_is_invalid() {
        let req = VoteRequest {
            post_id: Some(1),
            dir: Some(2),
        };
        let ApiError::Validation(fields) = ApiError::from(req.validate().unwrap_err()) else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].field, "dir");
        assert_eq!(fields[0].message, "dir must be 0 or 1");
    }

    #[test]
    fn missing_required_fields_are_named() {
        let req = VoteRequest {
            post_id: None,
            dir: None,
        };
        let ApiError::Validation(fields) = ApiError::from(req.validate().unwrap_err()) else {
            panic!("expected validation error");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["dir", "post_id"]);
        assert!(fields.iter().all(|f| f.message == "field required"));
    }
}
