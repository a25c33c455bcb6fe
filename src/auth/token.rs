//! Opaque token generation and hashing.
//!
//! A token is 16 bytes from the OS random source, encoded as unpadded
//! RFC 4648 base32 (26 characters). Only its SHA-256 digest is stored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::validator::Validator;
use crate::{Result, UsergateError};

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 16;

/// Length of the encoded plaintext.
pub const TOKEN_LENGTH: usize = 26;

/// SHA-256 digest of a token plaintext.
pub type TokenHash = [u8; 32];

/// What a token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenScope {
    /// Short-lived API access.
    #[serde(rename = "token:access")]
    Access,
    /// Exchanged for a new access/refresh pair.
    #[serde(rename = "token:refresh")]
    Refresh,
    /// Mailed at registration or email change.
    #[serde(rename = "token:activate")]
    Activation,
    /// Mailed on a password reset request.
    #[serde(rename = "token:resetpwd")]
    PasswordReset,
}

impl TokenScope {
    /// Stored scope tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Access => "token:access",
            TokenScope::Refresh => "token:refresh",
            TokenScope::Activation => "token:activate",
            TokenScope::PasswordReset => "token:resetpwd",
        }
    }

    /// Lifetime of a freshly minted token in this scope.
    pub fn ttl(&self) -> Duration {
        match self {
            TokenScope::Access => Duration::hours(24),
            TokenScope::Refresh => Duration::days(7),
            TokenScope::Activation => Duration::days(3),
            TokenScope::PasswordReset => Duration::hours(1),
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenScope {
    type Err = UsergateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "token:access" => Ok(TokenScope::Access),
            "token:refresh" => Ok(TokenScope::Refresh),
            "token:activate" => Ok(TokenScope::Activation),
            "token:resetpwd" => Ok(TokenScope::PasswordReset),
            other => Err(UsergateError::Database(format!(
                "unknown token scope: {other}"
            ))),
        }
    }
}

/// Stored form of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub hash: TokenHash,
    pub account_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: TokenScope,
}

impl Token {
    /// True once `expiry` has passed.
    pub fn is_expired(&self) -> bool {
        self.expiry <= Utc::now()
    }
}

/// A freshly minted token. The plaintext exists only here.
#[derive(Clone)]
pub struct IssuedToken {
    pub plaintext: String,
    pub token: Token,
}

impl IssuedToken {
    pub fn expiry(&self) -> DateTime<Utc> {
        self.token.expiry
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("plaintext", &"[redacted]")
            .field("token", &self.token)
            .finish()
    }
}

/// Mint a token for `account_id` that expires `ttl` from now.
///
/// Fails with [`UsergateError::Entropy`] when the OS random source does.
pub fn generate(account_id: i64, ttl: Duration, scope: TokenScope) -> Result<IssuedToken> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| UsergateError::Entropy(e.to_string()))?;

    let plaintext = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes);
    let hash = hash_token(&plaintext);

    Ok(IssuedToken {
        plaintext,
        token: Token {
            hash,
            account_id,
            expiry: Utc::now() + ttl,
            scope,
        },
    })
}

/// SHA-256 of the plaintext.
pub fn hash_token(plaintext: &str) -> TokenHash {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// Reject plaintexts that cannot possibly be a token.
pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        plaintext.len() == TOKEN_LENGTH,
        "token",
        "must be 26 bytes long",
    );
}
