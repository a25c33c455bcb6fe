//! Account handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::db::Permission;
use crate::web::dto::{
    AccountResponse, ActivationTokenResponse, JsonBody, MessageResponse, PasswordResetRequest,
    PasswordUpdateRequest, RegisterRequest, TokenRequest, UpdateAccountRequest,
};
use crate::web::error::ApiError;
use crate::web::middleware::CurrentIdentity;
use crate::UsergateError;

use super::AppState;

/// POST /v1/users/new - Register an account.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ActivationTokenResponse>), ApiError> {
    let registration = state.service.register(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ActivationTokenResponse {
            token: registration.activation_token.plaintext,
        }),
    ))
}

/// PUT /v1/users/activate - Confirm an email address.
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<TokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .activate(&req.token)
        .await
        .map_err(|e| match e {
            UsergateError::NotFound => ApiError::validation(BTreeMap::from([(
                "token".to_string(),
                "invalid or expired activation token".to_string(),
            )])),
            other => other.into(),
        })?;
    Ok(Json(MessageResponse::new(
        "user account successfully activated",
    )))
}

/// POST /v1/users/password/reset - Mail a password reset token.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.request_password_reset(&req.email).await?;
    Ok(Json(MessageResponse::new(
        "a password reset token has been sent to your email address",
    )))
}

/// PUT /v1/users/password/update - Set a new password with a reset token.
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<PasswordUpdateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .service
        .update_password(&req.token, &req.password)
        .await?;
    Ok(Json(MessageResponse::new("password successfully updated")))
}

/// GET /v1/users/account/:username - Read the caller's own account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(username): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    state
        .service
        .require_permissions(&identity, &[Permission::ReadUser])
        .await?;

    let account = state.service.get_account(&identity, &username).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// PUT /v1/users/account/:username/update - Change the caller's email or password.
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(username): Path<String>,
    JsonBody(req): JsonBody<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    state
        .service
        .require_permissions(&identity, &[Permission::WriteUser, Permission::ReadUser])
        .await?;

    let update = state
        .service
        .update_account(&identity, &username, req.into())
        .await?;
    Ok(Json(AccountResponse::from(&update.account)))
}
