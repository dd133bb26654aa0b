//! The health checker: aggregator, cache, and listener wired together.
//!
//! # Example
//!
//! ```rust,ignore
//! use vitals_core::health::{HealthChecker, LoggingListener, ProbeDefinition, TcpDialProbe};
//!
//! let checker = HealthChecker::builder()
//!     .with_cache_ttl(Duration::from_secs(1))
//!     .with_global_timeout(Duration::from_secs(10))
//!     .with_probe(ProbeDefinition::new("upstream", TcpDialProbe::new("10.0.0.5:5432")))
//!     .with_listener(LoggingListener)
//!     .build()?;
//!
//! let state = checker.check().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::aggregator::Aggregator;
use super::cache::StateCache;
use super::check::AggregateState;
use super::listener::StatusListener;
use super::probe::ProbeDefinition;
use super::HealthConfig;
use crate::error::Result;

/// Cached, aggregated health of a service.
///
/// Configuration is frozen once built. Cloning shares the same cache.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    aggregator: Aggregator,
    cache: StateCache,
}

impl HealthChecker {
    pub fn builder() -> HealthCheckerBuilder {
        HealthCheckerBuilder::default()
    }

    /// Build directly from an aggregator and a cache.
    pub fn from_parts(aggregator: Aggregator, cache: StateCache) -> Self {
        Self {
            inner: Arc::new(Inner { aggregator, cache }),
        }
    }

    /// Current aggregate state, served from cache while fresh.
    pub async fn check(&self) -> Arc<AggregateState> {
        let aggregator = &self.inner.aggregator;
        self.inner
            .cache
            .get_or_compute(|| aggregator.evaluate())
            .await
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.inner.aggregator
    }

    pub fn cache(&self) -> &StateCache {
        &self.inner.cache
    }
}

/// Collects probes and options before the checker is frozen.
#[derive(Default)]
pub struct HealthCheckerBuilder {
    config: HealthConfig,
    probes: Vec<ProbeDefinition>,
    listener: Option<Arc<dyn StatusListener>>,
}

impl HealthCheckerBuilder {
    /// Replace the timing configuration.
    pub fn with_config(mut self, config: HealthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn with_global_timeout(mut self, timeout: Duration) -> Self {
        self.config.global_timeout = timeout;
        self
    }

    /// Register a probe.
    pub fn with_probe(mut self, probe: ProbeDefinition) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_probes(mut self, probes: impl IntoIterator<Item = ProbeDefinition>) -> Self {
        self.probes.extend(probes);
        self
    }

    /// Set the status listener, replacing any previous one.
    pub fn with_listener(mut self, listener: impl StatusListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Validate the configuration and freeze it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::error::ConfigError) for an empty probe
    /// set, duplicate or empty names, and zero timeouts.
    pub fn build(self) -> Result<HealthChecker> {
        let aggregator = Aggregator::new(self.probes, self.config.global_timeout)?;
        let mut cache = StateCache::new(self.config.cache_ttl);
        if let Some(listener) = self.listener {
            cache = cache.with_listener(listener);
        }

        tracing::info!(
            probes = aggregator.probes().len(),
            cache_ttl_ms = self.config.cache_ttl.as_millis() as u64,
            global_timeout_ms = self.config.global_timeout.as_millis() as u64,
            "Health checker configured"
        );

        Ok(HealthChecker::from_parts(aggregator, cache))
    }
}
