//! Authentication module for usergate.
//!
//! This module provides password hashing, opaque token handling, input
//! validation, and the account lifecycle workflows built on them.

mod identity;
mod password;
mod service;
mod token;
pub mod validation;

pub use identity::Identity;
pub use password::{
    hash_password, hash_password_blocking, verify_password, verify_password_blocking,
    PasswordError,
};
pub use service::{
    AccountService, AccountUpdate, AccountUpdateRequest, LoginRequest, Registration,
    RegistrationRequest, SessionTokens,
};
pub use token::{
    generate, hash_token, validate_token_plaintext, IssuedToken, Token, TokenHash, TokenScope,
    TOKEN_BYTES, TOKEN_LENGTH,
};
