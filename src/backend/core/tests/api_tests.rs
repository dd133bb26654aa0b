//! Tests for the HTTP surface.
//!
//! Tests cover:
//! - 200 with an UP body when every probe passes
//! - 503 with a DOWN body and per-probe errors when any probe fails
//! - Configurable health path
//! - Prometheus metrics endpoint

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use vitals_core::health::{
    health_router, HealthChecker, HealthResponse, ProbeDefinition, ProbeError, Status,
};
use vitals_core::telemetry::metrics_router;

fn checker(probes: Vec<ProbeDefinition>) -> HealthChecker {
    HealthChecker::builder()
        .with_cache_ttl(Duration::ZERO)
        .with_probes(probes)
        .build()
        .unwrap()
}

fn passing(name: &str) -> ProbeDefinition {
    ProbeDefinition::from_fn(name, |_ctx| async { Ok(()) })
}

fn failing(name: &str, reason: &'static str) -> ProbeDefinition {
    ProbeDefinition::from_fn(name, move |_ctx| async move { Err(ProbeError::new(reason)) })
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// ============================================================================
// Health Endpoint
// ============================================================================

#[tokio::test]
async fn test_healthy_returns_200() {
    let app = health_router(checker(vec![passing("db"), passing("cache")]), "/health");

    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "UP",
            "checks": [
                { "name": "cache", "status": "UP" },
                { "name": "db", "status": "UP" }
            ]
        })
    );
}

#[tokio::test]
async fn test_unhealthy_returns_503_with_errors() {
    let app = health_router(
        checker(vec![passing("a"), failing("b", "connection refused")]),
        "/health",
    );

    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let response: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.status, Status::Unhealthy);
    assert_eq!(response.checks.len(), 2);
    assert_eq!(response.checks[0].error, None);
    assert_eq!(response.checks[1].name, "b");
    assert_eq!(response.checks[1].status, Status::Unhealthy);
    assert_eq!(response.checks[1].error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn test_custom_path() {
    let app = health_router(checker(vec![passing("a")]), "/internal/healthz");

    let (status, _) = get(app.clone(), "/internal/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Metrics Endpoint
// ============================================================================

#[tokio::test]
async fn test_metrics_endpoint_renders_text() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = metrics_router(handle);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(std::str::from_utf8(&body).is_ok());
}
