#![allow(clippy::result_large_err)]
//! # Vitals Core
//!
//! Aggregated, cached health checks for long-running services.
//!
//! ## Architecture
//!
//! - **Probes**: Named, individually time-boxed checks (TCP, HTTP, DNS, database, runtime)
//! - **Aggregator**: Runs every probe concurrently under a global deadline
//! - **Cache**: Single-flight TTL cache so concurrent callers share one evaluation
//! - **Listener**: Notified once per UP/DOWN transition
//! - **Routes**: `GET /health` answering 200 or 503 with a JSON body
//! - **Telemetry**: Structured logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod health;
pub mod telemetry;

pub use error::{ConfigError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ConfigError, Result};
    pub use crate::health::{
        AggregateState, HealthChecker, HealthResponse, Outcome, Probe, ProbeContext,
        ProbeDefinition, ProbeError, Status, StatusListener,
    };
}
