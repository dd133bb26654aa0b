//! Error handling for Vitals Core.
//!
//! Only setup problems surface as errors. Everything that can go wrong while a
//! health check runs is converted into data instead:
//!
//! - A failing, timed out, or panicking probe becomes an
//!   [`Outcome::Failure`](crate::health::Outcome) for that probe.
//! - A panicking status listener is caught and logged.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vitals_core::error::{ConfigError, Result};
//!
//! fn build() -> Result<HealthChecker> {
//!     HealthChecker::builder().with_probe(probe).build()
//! }
//! ```

use thiserror::Error;

/// A specialized Result type for setup operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors, reported once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one probe must be configured")]
    NoProbes,

    #[error("duplicate probe name: {0}")]
    DuplicateProbe(String),

    #[error("probe name must not be empty")]
    EmptyProbeName,

    #[error("probe '{0}' must have a timeout greater than zero")]
    ZeroProbeTimeout(String),

    #[error("global timeout must be greater than zero")]
    ZeroGlobalTimeout,

    #[error("invalid health path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid probe '{name}': {reason}")]
    InvalidProbe { name: String, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("{}", join_errors(.0))]
    Multiple(Vec<ConfigError>),
}

impl ConfigError {
    /// Collapse a list of problems into a single error.
    ///
    /// Returns `None` when the list is empty.
    pub fn from_all(mut errors: Vec<ConfigError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Iterate over the individual problems carried by this error.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        let errors: Vec<&ConfigError> = match self {
            Self::Multiple(errors) => errors.iter().collect(),
            other => vec![other],
        };
        errors.into_iter()
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    let mut out = String::from("configuration invalid: ");
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&err.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_all_empty() {
        assert!(ConfigError::from_all(Vec::new()).is_none());
    }

    #[test]
    fn test_from_all_single_is_unwrapped() {
        let err = ConfigError::from_all(vec![ConfigError::NoProbes]).unwrap();
        assert!(matches!(err, ConfigError::NoProbes));
    }

    #[test]
    fn test_from_all_multiple() {
        let err = ConfigError::from_all(vec![
            ConfigError::ZeroGlobalTimeout,
            ConfigError::DuplicateProbe("db".into()),
        ])
        .unwrap();

        assert_eq!(err.iter().count(), 2);
        assert_eq!(
            err.to_string(),
            "configuration invalid: global timeout must be greater than zero, duplicate probe name: db"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ConfigError::ZeroProbeTimeout("tcp".into()).to_string(),
            "probe 'tcp' must have a timeout greater than zero"
        );
        assert_eq!(
            ConfigError::InvalidPath {
                path: "health".into(),
                reason: "must start with '/'".into(),
            }
            .to_string(),
            "invalid health path 'health': must start with '/'"
        );
    }
}
