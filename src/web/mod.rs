//! Web API module for usergate.
//!
//! This module exposes the account workflows as a JSON REST API over axum.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::{shutdown_signal, WebServer};
