//! Health Check System
//!
//! Aggregated, cached health of a running service.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → routes.rs (handler)
//!     → cache.rs (fresh? serve cached state)
//!     → aggregator.rs (one task per probe, per-probe + global timeout)
//!     → check.rs (combine outcomes into Healthy / Unhealthy)
//!     → cache.rs (store, notify listener.rs on status change)
//!     → 200 / 503 + JSON body
//! ```

mod aggregator;
mod cache;
mod check;
mod checker;
mod listener;
mod probe;
mod probes;
mod routes;

pub use aggregator::*;
pub use cache::*;
pub use check::*;
pub use checker::*;
pub use listener::{LoggingListener, StatusListener};
pub use probe::*;
pub use probes::*;
pub use routes::*;

use std::any::Any;
use std::time::Duration;
use tokio::time::Instant;

/// Horizon used in place of an unbounded timeout (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Health check timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// How long an aggregate state is served from cache
    pub cache_ttl: Duration,
    /// Upper bound on the wall-clock time of one evaluation
    pub global_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            global_timeout: DEFAULT_GLOBAL_TIMEOUT,
        }
    }
}

/// `start + after`, clamped to [`FAR_FUTURE`] so huge timeouts such as
/// `Duration::MAX` never overflow the clock.
pub(crate) fn deadline_after(start: Instant, after: Duration) -> Instant {
    start.checked_add(after.min(FAR_FUTURE)).unwrap_or(start)
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
