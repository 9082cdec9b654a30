//! Tool-execution orchestrator: execution engine, batch executor, and
//! discovery over a category-indexed registry.
//!
//! Build an [`Orchestrator`] from an [`OrchestratorConfig`](toolbox_config::OrchestratorConfig),
//! load tools through [`ToolProvider`]s, then run single calls, batches, or
//! JSON command envelopes against it. Every call yields a structured
//! [`ExecutionResult`]; tool failures never surface as `Err`.

#![warn(missing_docs, clippy::pedantic)]

mod batch;
mod envelope;
mod executor;
mod health;
mod lifecycle;
mod orchestrator;
mod result;
mod scheduler;
mod sink;

pub use batch::{BatchCommand, BatchExecutor, ExecutionMode};
pub use envelope::{Command, CommandEnvelope, ResponseEnvelope, ResponsePayload, ResponseStatus};
pub use executor::ToolExecutor;
pub use health::{HealthReport, HealthReporter, HealthStatus, ToolDescription};
pub use lifecycle::{
    Lifecycle, LifecycleError, LifecycleEvent, LifecycleResult, OrchestratorState,
};
pub use orchestrator::{
    CategoryRegistrar, Orchestrator, OrchestratorError, OrchestratorResult, ToolProvider,
};
pub use result::{BatchResult, ErrorDescriptor, ErrorKind, ExecutionResult};
pub use scheduler::{SchedulerConfig, SchedulerError, SchedulerResult, TaskScheduler};
pub use sink::{CollectingSink, ExecutionSink, TracingExecutionSink};
