//! Health check results and status types.
//!
//! This module provides:
//! - `Status` enum representing the aggregate verdict
//! - `Outcome` and `CheckResult` for individual probe runs
//! - `AggregateState` combining all probe results of one evaluation
//! - `HealthResponse` the JSON body served by the health endpoint
//!
//! # Status Semantics
//!
//! Status is strictly binary. An aggregate is **Unhealthy** as soon as one
//! probe fails, otherwise it is **Healthy**.
//!
//! # Example
//!
//! ```rust,ignore
//! use vitals_core::health::{AggregateState, CheckResult, Outcome, Status};
//!
//! let state = AggregateState::from_results(vec![
//!     CheckResult::new("database", Outcome::Success, Duration::from_millis(3)),
//!     CheckResult::new("cache", Outcome::failure("connection refused"), Duration::ZERO),
//! ]);
//! assert_eq!(state.status, Status::Unhealthy);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Failure reason recorded when a probe runs out of time.
pub const TIMEOUT_REASON: &str = "timeout";

// ═══════════════════════════════════════════════════════════════════════════════
// Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Health status of a probe or of the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Every probe succeeded
    #[serde(rename = "UP")]
    Healthy,
    /// At least one probe failed
    #[serde(rename = "DOWN")]
    Unhealthy,
}

impl Status {
    /// Check if the status is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Combine two statuses, returning the worse one.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Healthy, Self::Healthy) => Self::Healthy,
            _ => Self::Unhealthy,
        }
    }

    /// Convert to HTTP status code.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Healthy => 200,
            Self::Unhealthy => 503,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "UP"),
            Self::Unhealthy => write!(f, "DOWN"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Outcome
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    /// Create a failure with a human-readable reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    /// Failure used when a probe exceeded its time budget.
    pub fn timeout() -> Self {
        Self::Failure(TIMEOUT_REASON.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure(reason) => Some(reason),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Success => Status::Healthy,
            Self::Failure(_) => Status::Unhealthy,
        }
    }
}

impl<E: fmt::Display> From<std::result::Result<(), E>> for Outcome {
    fn from(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Check Result
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of one probe within one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Probe name
    pub name: String,
    /// Pass or fail
    pub outcome: Outcome,
    /// Wall-clock time the probe took
    pub duration: Duration,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, outcome: Outcome, duration: Duration) -> Self {
        Self {
            name: name.into(),
            outcome,
            duration,
        }
    }

    pub fn status(&self) -> Status {
        self.outcome.status()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Aggregate State
// ═══════════════════════════════════════════════════════════════════════════════

/// Combined result of one evaluation of every configured probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateState {
    /// Overall status
    pub status: Status,
    /// Per-probe results keyed by probe name
    pub results: BTreeMap<String, CheckResult>,
    /// When the evaluation finished
    pub computed_at: DateTime<Utc>,
}

impl AggregateState {
    /// Build a state from probe results, computing the overall status.
    pub fn from_results(results: impl IntoIterator<Item = CheckResult>) -> Self {
        let results: BTreeMap<String, CheckResult> = results
            .into_iter()
            .map(|result| (result.name.clone(), result))
            .collect();

        let status = results
            .values()
            .fold(Status::Healthy, |acc, r| acc.combine(r.status()));

        Self {
            status,
            results,
            computed_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// Get the result of a specific probe.
    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results.get(name)
    }

    /// Names of the probes that failed.
    pub fn failing(&self) -> impl Iterator<Item = &str> {
        self.results
            .values()
            .filter(|r| !r.outcome.is_success())
            .map(|r| r.name.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP Response Body
// ═══════════════════════════════════════════════════════════════════════════════

/// Body returned by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: Status,
    /// One entry per probe, ordered by name
    pub checks: Vec<CheckResponse>,
}

/// Per-probe entry of a [`HealthResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&AggregateState> for HealthResponse {
    fn from(state: &AggregateState) -> Self {
        Self {
            status: state.status,
            checks: state
                .results
                .values()
                .map(|r| CheckResponse {
                    name: r.name.clone(),
                    status: r.status(),
                    error: r.outcome.reason().map(str::to_string),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(name: &str) -> CheckResult {
        CheckResult::new(name, Outcome::Success, Duration::from_millis(1))
    }

    fn failed(name: &str, reason: &str) -> CheckResult {
        CheckResult::new(name, Outcome::failure(reason), Duration::from_millis(1))
    }

    #[test]
    fn test_status_combine() {
        assert_eq!(Status::Healthy.combine(Status::Healthy), Status::Healthy);
        assert_eq!(Status::Healthy.combine(Status::Unhealthy), Status::Unhealthy);
        assert_eq!(Status::Unhealthy.combine(Status::Healthy), Status::Unhealthy);
    }

    #[test]
    fn test_status_http_codes() {
        assert_eq!(Status::Healthy.http_status_code(), 200);
        assert_eq!(Status::Unhealthy.http_status_code(), 503);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Healthy).unwrap(), "\"UP\"");
        assert_eq!(serde_json::to_string(&Status::Unhealthy).unwrap(), "\"DOWN\"");
        let status: Status = serde_json::from_str("\"DOWN\"").unwrap();
        assert_eq!(status, Status::Unhealthy);
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: std::result::Result<(), String> = Ok(());
        assert_eq!(Outcome::from(ok), Outcome::Success);

        let err: std::result::Result<(), String> = Err("connection refused".into());
        let outcome = Outcome::from(err);
        assert_eq!(outcome.reason(), Some("connection refused"));
        assert_eq!(outcome.status(), Status::Unhealthy);
    }

    #[test]
    fn test_outcome_timeout() {
        assert_eq!(Outcome::timeout().reason(), Some(TIMEOUT_REASON));
    }

    #[test]
    fn test_all_success_is_healthy() {
        let state = AggregateState::from_results(vec![ok("a"), ok("b"), ok("c")]);
        assert_eq!(state.status, Status::Healthy);
        assert_eq!(state.failing().count(), 0);
    }

    #[test]
    fn test_any_failure_is_unhealthy() {
        let state =
            AggregateState::from_results(vec![ok("a"), failed("b", "boom"), ok("c")]);
        assert_eq!(state.status, Status::Unhealthy);
        assert_eq!(state.failing().collect::<Vec<_>>(), vec!["b"]);
        assert!(state.result("a").unwrap().outcome.is_success());
    }

    #[test]
    fn test_response_shape() {
        let state = AggregateState::from_results(vec![
            ok("database"),
            failed("cache", "connection refused"),
        ]);
        let body = serde_json::to_value(HealthResponse::from(&state)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "status": "DOWN",
                "checks": [
                    { "name": "cache", "status": "DOWN", "error": "connection refused" },
                    { "name": "database", "status": "UP" }
                ]
            })
        );
    }
}
