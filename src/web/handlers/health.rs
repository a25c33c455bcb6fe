//! Health check handler.

use axum::Json;

use crate::web::dto::HealthResponse;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available",
    })
}
