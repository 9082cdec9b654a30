//! Strongly typed configuration schemas.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toolbox_primitives::ToolCategory;

use crate::error::{ConfigError, ConfigResult};

/// Per-call deadline applied when a request names none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Worker limit for parallel batches.
pub const DEFAULT_MAX_PARALLEL_WORKERS: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(value) => value,
    None => unreachable!(),
};

/// Orchestrator settings, read once at construction.
///
/// ```toml
/// default_timeout_secs = 30
/// max_parallel_workers = 5
/// enabled_categories = ["market-data", "chain-read"]
///
/// [telemetry]
/// log_filter = "info,toolbox_kernel=debug"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    #[serde(rename = "default_timeout_secs", with = "toolbox_primitives::duration::secs")]
    default_timeout: Duration,
    max_parallel_workers: NonZeroUsize,
    enabled_categories: BTreeSet<ToolCategory>,
    telemetry: TelemetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            max_parallel_workers: DEFAULT_MAX_PARALLEL_WORKERS,
            enabled_categories: ToolCategory::ALL.into_iter().collect(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Returns the default per-call timeout.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Returns the parallel batch worker limit.
    #[must_use]
    pub fn max_parallel_workers(&self) -> NonZeroUsize {
        self.max_parallel_workers
    }

    /// Returns the categories whose providers are loaded at startup.
    #[must_use]
    pub fn enabled_categories(&self) -> &BTreeSet<ToolCategory> {
        &self.enabled_categories
    }

    /// Returns `true` when tools of `category` should be registered.
    #[must_use]
    pub fn is_enabled(&self, category: ToolCategory) -> bool {
        self.enabled_categories.contains(&category)
    }

    /// Returns the telemetry section.
    #[must_use]
    pub fn telemetry(&self) -> &TelemetryConfig {
        &self.telemetry
    }

    /// Overrides the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero duration.
    pub fn with_default_timeout(mut self, timeout: Duration) -> ConfigResult<Self> {
        self.default_timeout = timeout;
        self.validate()?;
        Ok(self)
    }

    /// Overrides the parallel worker limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `workers` is zero.
    pub fn with_max_parallel_workers(mut self, workers: usize) -> ConfigResult<Self> {
        self.max_parallel_workers = NonZeroUsize::new(workers).ok_or(ConfigError::Invalid {
            field: "max_parallel_workers",
            reason: "must be at least 1".into(),
        })?;
        Ok(self)
    }

    /// Replaces the enabled category set.
    #[must_use]
    pub fn with_enabled_categories(
        mut self,
        categories: impl IntoIterator<Item = ToolCategory>,
    ) -> Self {
        self.enabled_categories = categories.into_iter().collect();
        self
    }

    /// Replaces the telemetry section.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Checks cross-field constraints not enforced by the types.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "default_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.telemetry.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "telemetry.log_filter",
                reason: "cannot be empty".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn set_default_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    pub(crate) fn set_max_parallel_workers(&mut self, workers: NonZeroUsize) {
        self.max_parallel_workers = workers;
    }

    pub(crate) fn set_enabled_categories(&mut self, categories: BTreeSet<ToolCategory>) {
        self.enabled_categories = categories;
    }

    pub(crate) fn telemetry_mut(&mut self) -> &mut TelemetryConfig {
        &mut self.telemetry
    }
}

/// Settings for the tracing subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info,toolbox_kernel=debug`.
    pub log_filter: String,
    /// Include the event target (module path) in formatted output.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_owned(),
            with_target: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_reject_zero_values() {
        let err = OrchestratorConfig::default()
            .with_default_timeout(Duration::ZERO)
            .expect_err("zero timeout");
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "default_timeout_secs"));

        let err = OrchestratorConfig::default()
            .with_max_parallel_workers(0)
            .expect_err("zero workers");
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "max_parallel_workers"));
    }

    #[test]
    fn enabled_categories_gate_lookup() {
        let config = OrchestratorConfig::default().with_enabled_categories([ToolCategory::Search]);
        assert!(config.is_enabled(ToolCategory::Search));
        assert!(!config.is_enabled(ToolCategory::ChainWrite));
        assert!(OrchestratorConfig::default().is_enabled(ToolCategory::ChainWrite));
    }

    #[test]
    fn blank_log_filter_fails_validation() {
        let config = OrchestratorConfig::default().with_telemetry(TelemetryConfig {
            log_filter: "  ".into(),
            with_target: true,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "telemetry.log_filter", .. })
        ));
    }
}
