//! Serial and parallel batch execution.

use std::fmt;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbox_primitives::duration::as_millis_u64;
use toolbox_primitives::{Parameters, RequestId};
use tracing::{debug, info};

use crate::executor::ToolExecutor;
use crate::result::{BatchResult, ErrorKind, ExecutionResult};
use crate::scheduler::TaskScheduler;

/// One tool call inside a batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchCommand {
    tool_name: String,
    #[serde(default)]
    parameters: Parameters,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "toolbox_primitives::duration::secs_option"
    )]
    timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<RequestId>,
}

impl BatchCommand {
    /// Creates a command with no parameters and the default timeout.
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: Parameters::new(),
            timeout: None,
            request_id: None,
        }
    }

    /// Replaces all parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets a single parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Overrides the per-call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the correlation id echoed on the result.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<RequestId>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns the target tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the call parameters.
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns the per-call deadline, if overridden.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the correlation id, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub(crate) fn into_parts(self) -> (String, Parameters, Option<Duration>, Option<RequestId>) {
        (self.tool_name, self.parameters, self.timeout, self.request_id)
    }
}

/// How a batch is dispatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One command at a time, in input order.
    #[default]
    Serial,
    /// All commands at once, bounded by the worker limit.
    Parallel,
}

impl ExecutionMode {
    /// Maps a `parallel` request flag to a mode.
    #[must_use]
    pub const fn from_parallel(parallel: bool) -> Self {
        if parallel { Self::Parallel } else { Self::Serial }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serial => "serial",
            Self::Parallel => "parallel",
        })
    }
}

/// Runs batches of commands through a [`ToolExecutor`].
///
/// Failures stay inside their own slot; the batch always yields one result per
/// command, in the order the commands were given.
#[derive(Clone, Debug)]
pub struct BatchExecutor {
    executor: ToolExecutor,
    scheduler: TaskScheduler,
}

impl BatchExecutor {
    /// Creates a batch executor dispatching parallel work onto `scheduler`.
    #[must_use]
    pub fn new(executor: ToolExecutor, scheduler: TaskScheduler) -> Self {
        Self {
            executor,
            scheduler,
        }
    }

    /// Returns the scheduler used for parallel batches.
    #[must_use]
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Executes `commands` in `mode`.
    pub async fn run(&self, commands: Vec<BatchCommand>, mode: ExecutionMode) -> BatchResult {
        let total = commands.len();
        let started = Instant::now();
        debug!(commands = total, %mode, "running batch");

        let results = match mode {
            ExecutionMode::Serial => self.run_serial(commands).await,
            ExecutionMode::Parallel => self.run_parallel(commands).await,
        };
        let batch = BatchResult::new(results);

        info!(
            commands = total,
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            %mode,
            duration_ms = as_millis_u64(started.elapsed()),
            "batch finished"
        );
        batch
    }

    async fn run_serial(&self, commands: Vec<BatchCommand>) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.executor.execute_command(command).await);
        }
        results
    }

    async fn run_parallel(&self, commands: Vec<BatchCommand>) -> Vec<ExecutionResult> {
        let submitted: Vec<_> = commands
            .into_iter()
            .map(|command| {
                let slot = (command.tool_name.clone(), command.request_id.clone());
                let executor = self.executor.clone();
                let spawned = self
                    .scheduler
                    .spawn(async move { executor.execute_command(command).await });
                (slot, spawned)
            })
            .collect();

        join_all(
            submitted
                .into_iter()
                .map(|((tool_name, request_id), spawned)| async move {
                    let failure = match spawned {
                        Ok(handle) => match handle.await {
                            Ok(Ok(result)) => return result,
                            Ok(Err(err)) => err.to_string(),
                            Err(join_err) => format!("batch worker failed: {join_err}"),
                        },
                        Err(err) => err.to_string(),
                    };
                    self.executor
                        .reject(tool_name, request_id, ErrorKind::Execution, failure)
                }),
        )
        .await
    }
}
