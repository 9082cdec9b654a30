//! Observability setup for the toolbox orchestrator.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use toolbox_config::TelemetryConfig;
use tracing_subscriber::EnvFilter;

/// Result alias for telemetry setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter directive could not be parsed.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Directive as configured.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {reason}")]
    Install {
        /// Underlying error message.
        reason: String,
    },
}

/// Builds the event filter: `RUST_LOG` when set and valid, otherwise the
/// configured directive.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directive is
/// malformed and `RUST_LOG` does not take precedence.
pub fn build_filter(config: &TelemetryConfig) -> TelemetryResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_filter).map_err(|err| TelemetryError::InvalidFilter {
        filter: config.log_filter.clone(),
        reason: err.to_string(),
    })
}

/// Installs a global `fmt` subscriber configured from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad directive and
/// [`TelemetryError::Install`] if a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> TelemetryResult<()> {
    let filter = build_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .try_init()
        .map_err(|err| TelemetryError::Install {
            reason: err.to_string(),
        })?;
    tracing::debug!(filter = %config.log_filter, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(build_filter(&TelemetryConfig::default()).is_ok());
    }

    #[test]
    fn second_install_reports_error() {
        let config = TelemetryConfig::default();
        let _ = init_tracing(&config);
        let second = init_tracing(&config);
        assert!(matches!(second, Err(TelemetryError::Install { .. })));
    }
}
