//! Error types for usergate.

use thiserror::Error;

use crate::auth::PasswordError;
use crate::validator::Validator;

/// Common error type for usergate.
#[derive(Error, Debug)]
pub enum UsergateError {
    /// One or more input fields failed validation.
    #[error("validation failed: {0}")]
    Validation(Validator),

    /// A unique value (username, email, token) is already taken.
    #[error("{field}: {message}")]
    Conflict {
        /// Field the conflicting value belongs to.
        field: &'static str,
        /// Human-readable message for that field.
        message: String,
    },

    /// A credential, token or account could not be resolved.
    ///
    /// Also returned when an optimistic version check rejects a stale write.
    /// Callers must not learn which of those cases happened.
    #[error("invalid authentication credentials")]
    NotFound,

    /// The operation requires an authenticated account.
    #[error("authentication required")]
    Unauthenticated,

    /// The authenticated account may not perform the operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Database error, including timeouts.
    ///
    /// Errors from sqlx are converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// The secure random source failed.
    #[error("entropy source failure: {0}")]
    Entropy(String),

    /// Password hashing or hash parsing failed.
    #[error("password hashing failure: {0}")]
    Hashing(String),

    /// Outbound mail error.
    #[error("mail error: {0}")]
    Mail(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl UsergateError {
    /// Build a validation error holding a single field message.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut v = Validator::new();
        v.add_error(field, message);
        UsergateError::Validation(v)
    }
}

impl From<sqlx::Error> for UsergateError {
    fn from(e: sqlx::Error) -> Self {
        UsergateError::Database(e.to_string())
    }
}

impl From<PasswordError> for UsergateError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Policy => UsergateError::field("password", e.to_string()),
            other => UsergateError::Hashing(other.to_string()),
        }
    }
}

/// Result type alias for usergate operations.
pub type Result<T> = std::result::Result<T, UsergateError>;
