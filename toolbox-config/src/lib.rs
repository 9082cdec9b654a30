//! Configuration for the toolbox orchestrator.
//!
//! Values come from defaults, then an optional TOML file, then environment
//! overrides. The orchestrator reads the result once at construction.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use schema::{
    DEFAULT_MAX_PARALLEL_WORKERS, DEFAULT_TIMEOUT, OrchestratorConfig, TelemetryConfig,
};
