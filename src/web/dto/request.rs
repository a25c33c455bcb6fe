//! Request DTOs for Web API.
//!
//! Missing fields decode as empty so that validation, not the parser,
//! reports them.

use serde::Deserialize;

use crate::auth::{AccountUpdateRequest, LoginRequest, RegistrationRequest};

/// User registration request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
    /// Password.
    pub password: String,
}

impl From<RegisterRequest> for RegistrationRequest {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
        }
    }
}

/// Body carrying a single token (activation, refresh).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenRequest {
    /// Token plaintext.
    pub token: String,
}

/// Credentials for creating a session.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl From<CredentialsRequest> for LoginRequest {
    fn from(req: CredentialsRequest) -> Self {
        Self {
            username: req.username,
            password: req.password,
        }
    }
}

/// Password reset request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordResetRequest {
    /// Address of the account to reset.
    pub email: String,
}

/// New password, authorized by a reset token.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordUpdateRequest {
    /// Reset token plaintext.
    pub token: String,
    /// New password.
    pub password: String,
}

/// Account self-update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateAccountRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl From<UpdateAccountRequest> for AccountUpdateRequest {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
        }
    }
}
