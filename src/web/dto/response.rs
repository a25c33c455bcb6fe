//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::{IssuedToken, SessionTokens};
use crate::db::Account;

/// Plain message response.
#[derive(Debug, Serialize)]
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

/// Registration response carrying the activation token.
#[derive(Debug, Serialize)]
pub struct ActivationTokenResponse {
    pub token: String,
}

/// A token plaintext with its expiry.
#[derive(Debug, Serialize)]
pub struct TokenInfo {
    /// Token plaintext.
    pub token: String,
    /// Expiry (RFC 3339).
    pub expiry: DateTime<Utc>,
}

impl From<&IssuedToken> for TokenInfo {
    fn from(issued: &IssuedToken) -> Self {
        Self {
            token: issued.plaintext.clone(),
            expiry: issued.expiry(),
        }
    }
}

/// Login and refresh response.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Short-lived bearer token.
    pub access_token: TokenInfo,
    /// Token exchanged for a new pair.
    pub refresh_token: TokenInfo,
}

impl From<&SessionTokens> for SessionResponse {
    fn from(tokens: &SessionTokens) -> Self {
        Self {
            access_token: TokenInfo::from(&tokens.access),
            refresh_token: TokenInfo::from(&tokens.refresh),
        }
    }
}

/// Public view of an account. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct AccountInfo {
    /// Account ID.
    pub id: i64,
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
    /// Whether the email has been confirmed.
    pub activated: bool,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            activated: account.activated,
        }
    }
}

/// Account read/update response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user: AccountInfo,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            user: AccountInfo::from(account),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
