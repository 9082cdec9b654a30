//! Observers receiving every produced [`ExecutionResult`].

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::result::ExecutionResult;

/// Observer trait used to capture execution results (for logging, metrics, etc.).
pub trait ExecutionSink: Send + Sync {
    /// Records a finished execution.
    fn record(&self, result: &ExecutionResult);
}

/// Sink implementation that logs to tracing.
#[derive(Debug, Default)]
pub struct TracingExecutionSink;

impl ExecutionSink for TracingExecutionSink {
    fn record(&self, result: &ExecutionResult) {
        let duration_ms = result.metadata().get("duration_ms").and_then(serde_json::Value::as_u64);
        let category = result.category().map(|category| category.as_str());

        match result.error() {
            None => info!(
                tool = result.tool_name(),
                category,
                duration_ms,
                "tool execution succeeded"
            ),
            Some(error) => warn!(
                tool = result.tool_name(),
                category,
                duration_ms,
                kind = %error.kind(),
                error = error.message(),
                "tool execution failed"
            ),
        }
    }
}

/// Sink used during testing to capture results.
#[derive(Debug, Default)]
pub struct CollectingSink {
    results: Mutex<Vec<ExecutionResult>>,
}

impl CollectingSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Removes and returns the collected results.
    #[must_use]
    pub fn drain(&self) -> Vec<ExecutionResult> {
        let mut lock = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        lock.drain(..).collect()
    }
}

impl ExecutionSink for CollectingSink {
    fn record(&self, result: &ExecutionResult) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
    }
}
