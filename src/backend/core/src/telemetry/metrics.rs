//! Prometheus metrics for health evaluations.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `vitals_evaluations_total` | counter | |
//! | `vitals_probe_failures_total` | counter | `probe` |
//! | `vitals_probe_duration_seconds` | histogram | `probe` |
//! | `vitals_status` | gauge (1 = UP, 0 = DOWN) | |

use axum::{extract::State, routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Path the Prometheus text format is served on.
pub const METRICS_PATH: &str = "/metrics";

pub const EVALUATIONS_TOTAL: &str = "vitals_evaluations_total";
pub const PROBE_FAILURES_TOTAL: &str = "vitals_probe_failures_total";
pub const PROBE_DURATION_SECONDS: &str = "vitals_probe_duration_seconds";
pub const STATUS: &str = "vitals_status";

const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the global Prometheus recorder and describe the metrics.
///
/// # Errors
///
/// Fails when a recorder is already installed.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(PROBE_DURATION_SECONDS.to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(EVALUATIONS_TOTAL, "Number of health evaluations run");
    describe_counter!(PROBE_FAILURES_TOTAL, "Number of failed probe runs");
    describe_histogram!(
        PROBE_DURATION_SECONDS,
        Unit::Seconds,
        "Wall-clock time of a probe run"
    );
    describe_gauge!(STATUS, "Aggregate status of the last evaluation (1 = UP)");
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Router serving the Prometheus text format at [`METRICS_PATH`].
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route(METRICS_PATH, get(render))
        .with_state(handle)
}
