//! Configuration loader implementations.
//!
//! Environment variables override values loaded from TOML:
//!
//! - `TOOLBOX_DEFAULT_TIMEOUT_SECS` - default per-call timeout in seconds (fractions allowed)
//! - `TOOLBOX_MAX_PARALLEL_WORKERS` - parallel batch worker limit
//! - `TOOLBOX_ENABLED_CATEGORIES` - comma separated category list, e.g. `market-data,search`
//! - `TOOLBOX_LOG_FILTER` - tracing filter directive

use std::collections::BTreeSet;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use toolbox_primitives::ToolCategory;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::OrchestratorConfig;

/// Environment variable overriding the default timeout.
pub const ENV_DEFAULT_TIMEOUT_SECS: &str = "TOOLBOX_DEFAULT_TIMEOUT_SECS";
/// Environment variable overriding the worker limit.
pub const ENV_MAX_PARALLEL_WORKERS: &str = "TOOLBOX_MAX_PARALLEL_WORKERS";
/// Environment variable overriding the enabled categories.
pub const ENV_ENABLED_CATEGORIES: &str = "TOOLBOX_ENABLED_CATEGORIES";
/// Environment variable overriding the log filter.
pub const ENV_LOG_FILTER: &str = "TOOLBOX_LOG_FILTER";

impl OrchestratorConfig {
    /// Parses and validates a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`from_toml_str`](Self::from_toml_str).
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), "loaded orchestrator config");
        Ok(config)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] for unparsable values and
    /// [`ConfigError::Invalid`] when the result fails validation.
    pub fn apply_env(self) -> ConfigResult<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same as [`apply_env`](Self::apply_env).
    pub fn apply_env_from<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_DEFAULT_TIMEOUT_SECS) {
            self.set_default_timeout(parse_secs(ENV_DEFAULT_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_MAX_PARALLEL_WORKERS) {
            self.set_max_parallel_workers(parse_workers(ENV_MAX_PARALLEL_WORKERS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_ENABLED_CATEGORIES) {
            self.set_enabled_categories(parse_categories(ENV_ENABLED_CATEGORIES, &raw)?);
        }
        if let Some(raw) = lookup(ENV_LOG_FILTER) {
            self.telemetry_mut().log_filter = raw;
        }

        self.validate()?;
        Ok(self)
    }
}

fn invalid_env(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar {
        key: key.to_owned(),
        message: message.into(),
    }
}

fn parse_secs(key: &str, raw: &str) -> ConfigResult<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|err| invalid_env(key, format!("invalid seconds value '{raw}': {err}")))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|err| invalid_env(key, format!("invalid seconds value '{raw}': {err}")))
}

fn parse_workers(key: &str, raw: &str) -> ConfigResult<NonZeroUsize> {
    raw.trim()
        .parse::<NonZeroUsize>()
        .map_err(|err| invalid_env(key, format!("expected a positive integer, got '{raw}': {err}")))
}

fn parse_categories(key: &str, raw: &str) -> ConfigResult<BTreeSet<ToolCategory>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<ToolCategory>()
                .map_err(|err| invalid_env(key, err.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.default_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_parallel_workers().get(), 5);
        assert_eq!(config.enabled_categories().len(), ToolCategory::ALL.len());
        assert_eq!(config.telemetry().log_filter, "info");
        assert!(!config.telemetry().with_target);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = OrchestratorConfig::from_toml_str("").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn parses_full_document() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            default_timeout_secs = 2.5
            max_parallel_workers = 8
            enabled_categories = ["market-data", "search"]

            [telemetry]
            log_filter = "debug"
            with_target = true
            "#,
        )
        .unwrap();

        assert_eq!(config.default_timeout(), Duration::from_millis(2500));
        assert_eq!(config.max_parallel_workers().get(), 8);
        assert!(config.is_enabled(ToolCategory::MarketData));
        assert!(config.is_enabled(ToolCategory::Search));
        assert!(!config.is_enabled(ToolCategory::Social));
        assert!(config.telemetry().with_target);
    }

    #[test]
    fn rejects_invalid_documents() {
        let err = OrchestratorConfig::from_toml_str("default_timeout_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "default_timeout_secs", .. }));

        assert!(matches!(
            OrchestratorConfig::from_toml_str("max_parallel_workers = 0"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_toml_str(r#"enabled_categories = ["weather"]"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_toml_str("unknown_key = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn environment_overrides_apply() {
        let config = OrchestratorConfig::default()
            .apply_env_from(env(&[
                (ENV_DEFAULT_TIMEOUT_SECS, "0.5"),
                (ENV_MAX_PARALLEL_WORKERS, "2"),
                (ENV_ENABLED_CATEGORIES, "chain-read, Storage"),
                (ENV_LOG_FILTER, "warn"),
            ]))
            .unwrap();

        assert_eq!(config.default_timeout(), Duration::from_millis(500));
        assert_eq!(config.max_parallel_workers().get(), 2);
        assert_eq!(
            config.enabled_categories().iter().copied().collect::<Vec<_>>(),
            vec![ToolCategory::ChainRead, ToolCategory::Storage]
        );
        assert_eq!(config.telemetry().log_filter, "warn");
    }

    #[test]
    fn invalid_environment_values_error() {
        for (key, value) in [
            (ENV_DEFAULT_TIMEOUT_SECS, "soon"),
            (ENV_DEFAULT_TIMEOUT_SECS, "-1"),
            (ENV_MAX_PARALLEL_WORKERS, "0"),
            (ENV_ENABLED_CATEGORIES, "market-data,weather"),
        ] {
            let err = OrchestratorConfig::default()
                .apply_env_from(env(&[(key, value)]))
                .expect_err("override should be rejected");
            assert!(
                matches!(&err, ConfigError::InvalidEnvVar { key: k, .. } if k == key),
                "unexpected error for {key}={value}: {err}"
            );
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = OrchestratorConfig::from_path("/nonexistent/toolbox.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/toolbox.toml"));
    }
}
