//! Tool-execution orchestrator facade.
//!
//! Bundles the workspace crates behind feature flags so downstream users can
//! pull in only the pieces they need, for example the registry without the
//! execution engine.

#![warn(missing_docs, clippy::pedantic)]

/// Shared primitives: categories, identifiers, and parameter schemas.
pub use toolbox_primitives as primitives;

/// Tool contract and registry (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use toolbox_tools as tools;

/// Execution engine, batch executor, and orchestrator (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use toolbox_kernel as kernel;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use toolbox_config as config;

/// Tracing subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use toolbox_telemetry as telemetry;
