//! API error handling for the usergate HTTP surface.

use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::UsergateError;

/// Message for any credential, token or account lookup failure.
pub const INVALID_CREDENTIALS: &str = "invalid authentication credentials";

/// Message for a missing, malformed or unknown bearer token.
pub const INVALID_TOKEN: &str = "invalid or missing authentication token";

const INTERNAL: &str = "the server encountered a problem and could not process your request";

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Validation error (422) - for field-level validation errors.
    ValidationError,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation messages (only present for validation errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<BTreeMap<String, String>>,
    bearer_challenge: bool,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            bearer_challenge: false,
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Unauthorized with a `WWW-Authenticate: Bearer` challenge.
    pub fn invalid_token() -> Self {
        Self {
            bearer_challenge: true,
            ..Self::unauthorized(INVALID_TOKEN)
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an internal server error.
    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, INTERNAL)
    }

    /// Create a validation error with field-level details.
    pub fn validation(details: BTreeMap<String, String>) -> Self {
        Self {
            details: Some(details),
            ..Self::new(ErrorCode::ValidationError, "validation failed")
        }
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        let mut response = (status, Json(body)).into_response();
        if self.bearer_challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<UsergateError> for ApiError {
    fn from(err: UsergateError) -> Self {
        match err {
            UsergateError::Validation(v) => ApiError::validation(v.errors().clone()),
            UsergateError::Conflict { field, message } => {
                ApiError::validation(BTreeMap::from([(field.to_string(), message)]))
            }
            UsergateError::NotFound => ApiError::unauthorized(INVALID_CREDENTIALS),
            UsergateError::Unauthenticated => ApiError::invalid_token(),
            UsergateError::Permission(msg) => ApiError::forbidden(msg),
            other => {
                tracing::error!(error = %other, "Internal error");
                ApiError::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::ValidationError.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_validation() {
        let mut v = Validator::new();
        v.add_error("email", "must be provided");
        let err: ApiError = UsergateError::Validation(v).into();

        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(
            err.details.as_ref().unwrap().get("email").map(String::as_str),
            Some("must be provided")
        );
    }

    #[test]
    fn test_from_conflict() {
        let err: ApiError = UsergateError::Conflict {
            field: "username",
            message: "a user with this username already exists".to_string(),
        }
        .into();

        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.details.as_ref().unwrap().contains_key("username"));
    }

    #[test]
    fn test_from_not_found_is_generic() {
        let err: ApiError = UsergateError::NotFound.into();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), INVALID_CREDENTIALS);
    }

    #[test]
    fn test_internal_errors_are_hidden() {
        let err: ApiError = UsergateError::Database("disk I/O error at /var/db".to_string()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.message().contains("/var/db"));
    }

    #[test]
    fn test_invalid_token_sets_challenge() {
        let response = ApiError::invalid_token().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_forbidden_has_no_challenge() {
        let response = ApiError::forbidden("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
