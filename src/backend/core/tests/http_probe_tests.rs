//! Tests for the HTTP GET probe against a mock server.
//!
//! Tests cover:
//! - 200 passes
//! - Any other status fails with the status code
//! - Redirects are not followed
//! - Slow servers hit the probe timeout

use std::time::Duration;

use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitals_core::health::{
    Aggregator, HttpGetProbe, Outcome, Probe, ProbeContext, ProbeDefinition,
};

fn ctx() -> ProbeContext {
    ProbeContext::new(
        tokio::time::Instant::now() + Duration::from_secs(5),
        Default::default(),
    )
}

async fn server_answering(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_ok_passes() {
    let server = server_answering(200).await;
    let probe = HttpGetProbe::new(format!("{}/ping", server.uri())).unwrap();

    assert_ok!(probe.check(&ctx()).await);
}

#[tokio::test]
async fn test_server_error_fails() {
    let server = server_answering(500).await;
    let probe = HttpGetProbe::new(format!("{}/ping", server.uri())).unwrap();

    let err = assert_err!(probe.check(&ctx()).await);
    assert_eq!(err.reason(), "returned status 500");
}

#[tokio::test]
async fn test_no_content_fails() {
    let server = server_answering(204).await;
    let probe = HttpGetProbe::new(format!("{}/ping", server.uri())).unwrap();

    assert_err!(probe.check(&ctx()).await);
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let server = MockServer::start().await;
    let target = format!("{}/ping", server.uri());
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let probe = HttpGetProbe::new(format!("{}/old", server.uri())).unwrap();
    let err = assert_err!(probe.check(&ctx()).await);
    assert_eq!(err.reason(), "returned status 302");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let aggregator = Aggregator::new(
        vec![ProbeDefinition::new("slow", HttpGetProbe::new(server.uri()).unwrap())
            .with_timeout(Duration::from_millis(100))],
        Duration::from_secs(1),
    )
    .unwrap();

    let started = tokio::time::Instant::now();
    let state = aggregator.evaluate().await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_ne!(state.result("slow").unwrap().outcome, Outcome::Success);
}
