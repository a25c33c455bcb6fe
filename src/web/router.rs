//! Router configuration for Web API.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::dto::MAX_BODY_BYTES;
use super::handlers::{
    activate_user, create_session, delete_session, get_account, health_check, refresh_session,
    register_user, request_password_reset, update_account, update_password, AppState,
};
use super::middleware::authenticate;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Routes that resolve the bearer token first
    let authenticated = Router::new()
        .route("/users/new", post(register_user))
        .route("/users/activate", put(activate_user))
        .route("/users/authenticate", post(create_session))
        .route("/tokens", delete(delete_session))
        .route("/users/password/reset", post(request_password_reset))
        .route("/users/password/update", put(update_password))
        .route("/users/account/:username", get(get_account))
        .route("/users/account/:username/update", put(update_account))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            authenticate,
        ));

    // The refresh token is the credential here
    let public = Router::new().route("/tokens/refresh", post(refresh_session));

    let api_routes = Router::new().merge(authenticated).merge(public);

    Router::new()
        .nest("/v1", api_routes)
        .merge(create_health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_router_responds() {
        let router: Router = create_health_router();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"status":"available"}"#);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let router: Router = create_health_router();

        let response = router
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
