//! Typed errors for configuration validation.
//!
//! Everything past startup is infallible: generation, derivation and the
//! refresh cycle never return errors. The only failure mode is a bad
//! configuration table, reported once by [`ConfigError::InvalidConfiguration`].

use thiserror::Error;

/// Result alias for validation steps.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A configured value cannot produce meaningful output.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfiguration {
        /// Dotted config key, e.g. `revenue.iptu`.
        field: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The dotted key that failed validation.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::InvalidConfiguration { field, .. } => field,
        }
    }
}
