//! Configuration management.
//!
//! Values come from an optional TOML file, overridden by `VITALS__`-prefixed
//! environment variables (`VITALS__HEALTH__CACHE_TTL=5s`).

use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::health::{
    DatabasePingProbe, DnsResolveProbe, HealthConfig, HttpGetProbe, ProbeDefinition,
    TaskCountProbe, TcpDialProbe, DEFAULT_HEALTH_PATH, DEFAULT_PROBE_TIMEOUT,
};
use crate::telemetry::metrics::METRICS_PATH;
use crate::telemetry::{LogFormat, LoggingConfig};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Health endpoint and probes
    #[serde(default)]
    pub health: HealthSettings,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthSettings {
    /// Path of the health endpoint
    #[serde(default = "default_health_path")]
    pub path: String,

    /// How long an aggregate state is served from cache (0 disables caching)
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Upper bound on one evaluation
    #[serde(default = "default_global_timeout", with = "humantime_serde")]
    pub global_timeout: Duration,

    /// Alive-task limit for the built-in runtime probe (0 disables it)
    #[serde(default = "default_task_threshold")]
    pub task_threshold: usize,

    /// Additional probes
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            path: default_health_path(),
            cache_ttl: default_cache_ttl(),
            global_timeout: default_global_timeout(),
            task_threshold: default_task_threshold(),
            probes: Vec::new(),
        }
    }
}

impl HealthSettings {
    pub fn timing(&self) -> HealthConfig {
        HealthConfig {
            cache_ttl: self.cache_ttl,
            global_timeout: self.global_timeout,
        }
    }
}

/// A probe declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeSpec {
    /// TCP connect to `addr`
    Tcp {
        name: String,
        addr: String,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
    /// HTTP GET on `url`, expecting 200
    Http {
        name: String,
        url: String,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
    /// Resolve `host`
    Dns {
        name: String,
        host: String,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
    /// Tokio alive task count
    Tasks {
        name: String,
        threshold: usize,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
    /// Peak resident memory
    Memory {
        name: String,
        max_bytes: u64,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
    /// `SELECT 1` against the configured database
    Database {
        name: String,
        #[serde(default, with = "humantime_serde")]
        timeout: Option<Duration>,
    },
}

impl ProbeSpec {
    pub fn name(&self) -> &str {
        match self {
            Self::Tcp { name, .. }
            | Self::Http { name, .. }
            | Self::Dns { name, .. }
            | Self::Tasks { name, .. }
            | Self::Memory { name, .. }
            | Self::Database { name, .. } => name,
        }
    }

    pub fn timeout(&self) -> Duration {
        let timeout = match self {
            Self::Tcp { timeout, .. }
            | Self::Http { timeout, .. }
            | Self::Dns { timeout, .. }
            | Self::Tasks { timeout, .. }
            | Self::Memory { timeout, .. }
            | Self::Database { timeout, .. } => timeout,
        };
        timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT)
    }

    /// Turn the declaration into a runnable probe.
    ///
    /// `pool` backs `database` probes; without it they always fail.
    pub fn build(&self, pool: Option<&PgPool>) -> Result<ProbeDefinition> {
        let name = self.name().to_string();
        let def = match self {
            Self::Tcp { addr, .. } => ProbeDefinition::new(name, TcpDialProbe::new(addr.clone())),
            Self::Http { url, .. } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidProbe {
                        name,
                        reason: format!("url must be http or https: {}", url),
                    });
                }
                let probe = HttpGetProbe::new(url.clone()).map_err(|e| {
                    ConfigError::InvalidProbe {
                        name: name.clone(),
                        reason: format!("cannot build HTTP client: {}", e),
                    }
                })?;
                ProbeDefinition::new(name, probe)
            }
            Self::Dns { host, .. } => {
                ProbeDefinition::new(name, DnsResolveProbe::new(host.clone()))
            }
            Self::Tasks { threshold, .. } => {
                ProbeDefinition::new(name, TaskCountProbe::new(*threshold))
            }
            #[cfg(unix)]
            Self::Memory { max_bytes, .. } => {
                ProbeDefinition::new(name, crate::health::MaxRssProbe::new(*max_bytes))
            }
            #[cfg(not(unix))]
            Self::Memory { .. } => {
                return Err(ConfigError::InvalidProbe {
                    name,
                    reason: "memory probes are only supported on unix".to_string(),
                })
            }
            Self::Database { .. } => match pool {
                Some(pool) => ProbeDefinition::new(name, DatabasePingProbe::new(pool.clone())),
                None => ProbeDefinition::new(name, DatabasePingProbe::unconfigured()),
            },
        };
        Ok(def.with_timeout(self.timeout()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. No database probe is registered without it.
    pub url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error or an EnvFilter string)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on /metrics
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ObservabilityConfig {
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_health_path() -> String { DEFAULT_HEALTH_PATH.to_string() }
fn default_cache_ttl() -> Duration { Duration::from_secs(1) }
fn default_global_timeout() -> Duration { Duration::from_secs(10) }
fn default_task_threshold() -> usize { 100 }
fn default_max_connections() -> u32 { 5 }
fn default_metrics_enabled() -> bool { true }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Load configuration from environment and an optional config file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("VITALS").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Semantic checks serde cannot express. Reports every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !self.health.path.starts_with('/') {
            errors.push(ConfigError::InvalidPath {
                path: self.health.path.clone(),
                reason: "must start with '/'".to_string(),
            });
        }
        if self.observability.metrics_enabled && self.health.path == METRICS_PATH {
            errors.push(ConfigError::InvalidPath {
                path: self.health.path.clone(),
                reason: "already served by the metrics endpoint".to_string(),
            });
        }
        if self.health.global_timeout.is_zero() {
            errors.push(ConfigError::ZeroGlobalTimeout);
        }

        let mut seen = HashSet::new();
        for spec in &self.health.probes {
            if spec.name().is_empty() {
                errors.push(ConfigError::EmptyProbeName);
                continue;
            }
            if !seen.insert(spec.name()) {
                errors.push(ConfigError::DuplicateProbe(spec.name().to_string()));
            }
            if spec.timeout().is_zero() {
                errors.push(ConfigError::ZeroProbeTimeout(spec.name().to_string()));
            }
        }

        match ConfigError::from_all(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
