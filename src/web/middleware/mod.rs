//! Middleware for Web API.

pub mod auth;

pub use auth::{authenticate, CurrentIdentity};
