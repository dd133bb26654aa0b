//! Concurrent evaluation of a fixed probe set.
//!
//! Every probe runs in its own task with the budget
//! `min(probe timeout, time left before the global deadline)`. A probe that
//! errors, overruns its budget, or panics only fails itself; `evaluate` always
//! returns a complete [`AggregateState`].

use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::check::{AggregateState, CheckResult, Outcome};
use super::{deadline_after, panic_message};
use super::probe::{ProbeContext, ProbeDefinition};
use crate::error::{ConfigError, Result};
use crate::telemetry::metrics::{
    EVALUATIONS_TOTAL, PROBE_DURATION_SECONDS, PROBE_FAILURES_TOTAL, STATUS,
};

/// Upper bound on the wall-clock time of one evaluation when none is given.
pub const DEFAULT_GLOBAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the configured probes and combines their outcomes.
///
/// The probe set is validated once in [`Aggregator::new`] and frozen
/// afterwards. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Aggregator {
    probes: Arc<[ProbeDefinition]>,
    global_timeout: Duration,
}

impl Aggregator {
    /// Create an aggregator.
    ///
    /// # Errors
    ///
    /// Returns every problem found: an empty probe set, empty or duplicate
    /// names, zero timeouts.
    pub fn new(probes: Vec<ProbeDefinition>, global_timeout: Duration) -> Result<Self> {
        let mut errors = Vec::new();

        if probes.is_empty() {
            errors.push(ConfigError::NoProbes);
        }
        if global_timeout.is_zero() {
            errors.push(ConfigError::ZeroGlobalTimeout);
        }

        let mut seen = HashSet::new();
        for def in &probes {
            if def.name().is_empty() {
                errors.push(ConfigError::EmptyProbeName);
                continue;
            }
            if !seen.insert(def.name()) {
                errors.push(ConfigError::DuplicateProbe(def.name().to_string()));
            }
            if def.timeout().is_zero() {
                errors.push(ConfigError::ZeroProbeTimeout(def.name().to_string()));
            }
        }

        if let Some(err) = ConfigError::from_all(errors) {
            return Err(err);
        }

        Ok(Self {
            probes: probes.into(),
            global_timeout,
        })
    }

    pub fn probes(&self) -> &[ProbeDefinition] {
        &self.probes
    }

    pub fn global_timeout(&self) -> Duration {
        self.global_timeout
    }

    /// Run every probe once and compute the aggregate status.
    pub async fn evaluate(&self) -> AggregateState {
        let started = Instant::now();
        let deadline = deadline_after(started, self.global_timeout);
        let cancel = CancellationToken::new();
        // Cancels every probe token once the evaluation is over.
        let _cancel_on_exit = cancel.clone().drop_guard();

        let runs = self
            .probes
            .iter()
            .map(|def| run_probe(def.clone(), deadline, cancel.child_token()));
        let results = join_all(runs).await;

        let state = AggregateState::from_results(results);

        counter!(EVALUATIONS_TOTAL).increment(1);
        gauge!(STATUS).set(if state.is_healthy() { 1.0 } else { 0.0 });
        debug!(
            status = %state.status,
            probes = state.results.len(),
            failing = state.failing().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Health evaluation complete"
        );

        state
    }
}

/// Run one probe in a supervised task.
async fn run_probe(
    def: ProbeDefinition,
    deadline: Instant,
    cancel: CancellationToken,
) -> CheckResult {
    let started = Instant::now();
    let budget = deadline.min(deadline_after(started, def.timeout()));
    let ctx = ProbeContext::new(budget, cancel.clone());
    let probe = def.probe().clone();

    let handle = tokio::spawn(async move {
        match timeout_at(budget, probe.check(&ctx)).await {
            Ok(result) => Outcome::from(result),
            Err(_) => Outcome::timeout(),
        }
    });
    let abort = handle.abort_handle();

    let outcome = match timeout_at(deadline, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) if err.is_panic() => {
            Outcome::failure(format!("probe panicked: {}", panic_message(&*err.into_panic())))
        }
        Ok(Err(_)) => Outcome::failure("probe task was cancelled"),
        Err(_) => {
            abort.abort();
            Outcome::timeout()
        }
    };
    cancel.cancel();

    let duration = started.elapsed();
    histogram!(PROBE_DURATION_SECONDS, "probe" => def.name().to_string())
        .record(duration.as_secs_f64());

    if let Some(reason) = outcome.reason() {
        counter!(PROBE_FAILURES_TOTAL, "probe" => def.name().to_string()).increment(1);
        warn!(
            probe = %def.name(),
            reason = %reason,
            duration_ms = duration.as_millis() as u64,
            "Health probe failed"
        );
    }

    CheckResult::new(def.name(), outcome, duration)
}
