//! usergate - account registration and token authentication service
//!
//! Accounts register with a username, email and password, confirm their
//! email with an activation token, and authenticate with opaque bearer
//! tokens. Token plaintexts are never stored; only their SHA-256 digests.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod tasks;
pub mod validator;
pub mod web;

pub use auth::{
    hash_password, verify_password, AccountService, AccountUpdate, AccountUpdateRequest,
    Identity, IssuedToken, LoginRequest, PasswordError, Registration, RegistrationRequest,
    SessionTokens, Token, TokenScope,
};
pub use config::Config;
pub use db::{Account, Database, Permission, Permissions};
pub use error::{Result, UsergateError};
pub use mail::{LogMailer, Mailer, SmtpMailer};
pub use tasks::BackgroundTasks;
pub use validator::Validator;
pub use web::WebServer;
