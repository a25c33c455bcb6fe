//! Session token handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::web::dto::{CredentialsRequest, JsonBody, MessageResponse, SessionResponse, TokenRequest};
use crate::web::error::ApiError;
use crate::web::middleware::CurrentIdentity;
use crate::UsergateError;

use super::AppState;

/// POST /v1/users/authenticate - Exchange credentials for a session.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let tokens = state.service.login(req.into()).await?;
    Ok(Json(SessionResponse::from(&tokens)))
}

/// POST /v1/tokens/refresh - Rotate a session using its refresh token.
pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<TokenRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let tokens = state
        .service
        .refresh(&req.token)
        .await
        .map_err(|e| match e {
            UsergateError::NotFound => ApiError::unauthorized("unknown or invalid refresh token"),
            other => other.into(),
        })?;
    Ok(Json(SessionResponse::from(&tokens)))
}

/// DELETE /v1/tokens - Log out.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.logout(&identity).await?;
    Ok(Json(MessageResponse::new("user successfully logged out")))
}
