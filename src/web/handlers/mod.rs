//! API handlers.

pub mod health;
pub mod tokens;
pub mod users;

pub use health::health_check;
pub use tokens::{create_session, delete_session, refresh_session};
pub use users::{
    activate_user, get_account, register_user, request_password_reset, update_account,
    update_password,
};

use crate::auth::AccountService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account workflows.
    pub service: AccountService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: AccountService) -> Self {
        Self { service }
    }
}
