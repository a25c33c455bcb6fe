//! Bearer-token authentication middleware.

use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{
        header::{AUTHORIZATION, VARY},
        request::Parts,
        HeaderValue, Request,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Identity;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::UsergateError;

/// Extractor for the identity resolved by [`authenticate`].
///
/// Requests that never passed through the middleware are anonymous.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().cloned().unwrap_or_default();
        Ok(CurrentIdentity(identity))
    }
}

/// Resolve the `Authorization` header into an [`Identity`] extension.
///
/// No header means anonymous. A header that is not exactly
/// `Bearer <token>`, or a token that does not resolve to a live access
/// token, is rejected with 401.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = match request.headers().get(AUTHORIZATION) {
        None => Ok(Identity::Anonymous),
        Some(value) => match value.to_str().ok().and_then(bearer_token) {
            None => Err(ApiError::invalid_token()),
            Some(token) => match state.service.authenticate(token).await {
                Ok(account) => Ok(Identity::Account(account)),
                Err(UsergateError::Unauthenticated) => Err(ApiError::invalid_token()),
                Err(e) => Err(ApiError::from(e)),
            },
        },
    };

    let mut response = match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    };

    response
        .headers_mut()
        .insert(VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Token from a `Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}
