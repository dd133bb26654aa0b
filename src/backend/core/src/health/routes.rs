//! Health check HTTP routes

use super::{HealthChecker, HealthResponse, Status};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

/// Default path of the health endpoint.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// GET <path> - Aggregated health, 200 when UP and 503 when DOWN
pub async fn health_check(State(checker): State<HealthChecker>) -> impl IntoResponse {
    let state = checker.check().await;
    let status = match state.status {
        Status::Healthy => StatusCode::OK,
        Status::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(HealthResponse::from(state.as_ref())))
}

/// Router serving the health endpoint at `path`.
pub fn health_router(checker: HealthChecker, path: &str) -> Router {
    Router::new()
        .route(path, get(health_check))
        .with_state(checker)
}
