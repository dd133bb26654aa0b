//! The probe contract.
//!
//! A probe is a named, timeout-bounded unit of work that either succeeds or
//! fails with a reason. Implementations know nothing about aggregation,
//! caching, or timeouts; the [`Aggregator`](super::Aggregator) enforces those.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Timeout applied to a probe when none is given.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

// ═══════════════════════════════════════════════════════════════════════════════
// Probe Error
// ═══════════════════════════════════════════════════════════════════════════════

/// Reason a probe failed. The message is shown verbatim in health responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProbeError(String);

impl ProbeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(error: std::io::Error) -> Self {
        Self(error.to_string())
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(error: reqwest::Error) -> Self {
        Self(error.to_string())
    }
}

impl From<sqlx::Error> for ProbeError {
    fn from(error: sqlx::Error) -> Self {
        Self(error.to_string())
    }
}

impl From<String> for ProbeError {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

impl From<&str> for ProbeError {
    fn from(reason: &str) -> Self {
        Self(reason.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Probe Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-run context handed to a probe.
///
/// The token is cancelled once the probe's budget is used up or the whole
/// evaluation ends. Probes doing blocking or long-running work should watch it.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl ProbeContext {
    pub fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self { deadline, cancel }
    }

    /// The instant by which the probe must finish.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Probe Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// A single health check.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run the check once.
    async fn check(&self, ctx: &ProbeContext) -> Result<(), ProbeError>;
}

/// Adapter turning an async closure into a [`Probe`].
pub struct FnProbe<F>(F);

impl<F> FnProbe<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn(ProbeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProbeError>> + Send + 'static,
{
    async fn check(&self, ctx: &ProbeContext) -> Result<(), ProbeError> {
        (self.0)(ctx.clone()).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Probe Definition
// ═══════════════════════════════════════════════════════════════════════════════

/// A probe registered under a unique name with its own timeout.
#[derive(Clone)]
pub struct ProbeDefinition {
    name: String,
    timeout: Duration,
    probe: Arc<dyn Probe>,
}

impl ProbeDefinition {
    /// Register a probe with the default timeout.
    pub fn new(name: impl Into<String>, probe: impl Probe + 'static) -> Self {
        Self::from_arc(name, Arc::new(probe))
    }

    pub fn from_arc(name: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            probe,
        }
    }

    /// Register an async closure as a probe.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ProbeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ProbeError>> + Send + 'static,
    {
        Self::new(name, FnProbe::new(f))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn probe(&self) -> &Arc<dyn Probe> {
        &self.probe
    }
}

impl fmt::Debug for ProbeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeDefinition")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_probe_runs_closure() {
        let def = ProbeDefinition::from_fn("always-fails", |_ctx| async {
            Err(ProbeError::new("connection refused"))
        });

        let ctx = ProbeContext::new(
            Instant::now() + Duration::from_secs(1),
            CancellationToken::new(),
        );
        let err = def.probe().check(&ctx).await.unwrap_err();
        assert_eq!(err.reason(), "connection refused");
    }

    #[test]
    fn test_definition_defaults() {
        let def = ProbeDefinition::from_fn("noop", |_ctx| async { Ok(()) });
        assert_eq!(def.name(), "noop");
        assert_eq!(def.timeout(), DEFAULT_PROBE_TIMEOUT);

        let def = def.with_timeout(Duration::from_millis(250));
        assert_eq!(def.timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_context_remaining_and_cancel() {
        let token = CancellationToken::new();
        let ctx = ProbeContext::new(Instant::now() + Duration::from_secs(5), token.clone());

        assert!(ctx.remaining() <= Duration::from_secs(5));
        assert!(!ctx.is_cancelled());

        token.cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_probe_error_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        assert_eq!(ProbeError::from(io).reason(), "connection refused");
        assert_eq!(ProbeError::from("boom").to_string(), "boom");
    }
}
