//! Context object tying the registry, executors, and reporter together.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use toolbox_config::{ConfigError, OrchestratorConfig};
use toolbox_primitives::{Parameters, ToolCategory};
use toolbox_tools::{Capability, Tool, ToolError, ToolMetadata, ToolRegistry, ToolResult};
use tracing::{info, warn};

use crate::batch::{BatchCommand, BatchExecutor, ExecutionMode};
use crate::envelope::{Command, CommandEnvelope, ResponseEnvelope};
use crate::executor::ToolExecutor;
use crate::health::{HealthReport, HealthReporter, ToolDescription};
use crate::lifecycle::{Lifecycle, LifecycleError, LifecycleEvent, OrchestratorState};
use crate::result::{BatchResult, ErrorKind, ExecutionResult};
use crate::scheduler::{SchedulerConfig, TaskScheduler};
use crate::sink::{ExecutionSink, TracingExecutionSink};

/// Errors raised while building or initialising an [`Orchestrator`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Supplied configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A provider failed to register its tools.
    #[error("provider for category `{category}` failed: {source}")]
    Provider {
        /// Category the provider serves.
        category: ToolCategory,
        /// Registration failure.
        #[source]
        source: ToolError,
    },

    /// Lifecycle rejected the requested transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Result alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Source of the tools for one category.
///
/// Providers are handed to [`Orchestrator::initialize`], which skips those
/// whose category is disabled in the configuration.
pub trait ToolProvider: Send + Sync {
    /// Category every tool of this provider is registered under.
    fn category(&self) -> ToolCategory;

    /// Registers the provider's tools.
    ///
    /// # Errors
    ///
    /// Returns any [`ToolError`] raised by registration, or a provider
    /// specific failure such as a missing credential.
    fn register(&self, registrar: &mut CategoryRegistrar<'_>) -> ToolResult<()>;
}

/// Registration surface handed to a [`ToolProvider`], pinned to its category.
pub struct CategoryRegistrar<'a> {
    registry: &'a ToolRegistry,
    category: ToolCategory,
    registered: Vec<String>,
}

impl fmt::Debug for CategoryRegistrar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryRegistrar")
            .field("category", &self.category)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl<'a> CategoryRegistrar<'a> {
    fn new(registry: &'a ToolRegistry, category: ToolCategory) -> Self {
        Self {
            registry,
            category,
            registered: Vec::new(),
        }
    }

    /// Category tools are registered under.
    #[must_use]
    pub fn category(&self) -> ToolCategory {
        self.category
    }

    /// Names registered through this registrar so far.
    #[must_use]
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// Registers a tool implementation with explicit metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is taken.
    pub fn register_tool<T>(&mut self, metadata: ToolMetadata, tool: T) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        let name = metadata.name().to_owned();
        self.registry.register_tool(metadata, self.category, tool)?;
        self.registered.push(name);
        Ok(())
    }

    /// Registers a tool that declares its own metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is taken.
    pub fn register<C>(&mut self, capability: C) -> ToolResult<()>
    where
        C: Capability + 'static,
    {
        let metadata = capability.metadata();
        self.register_tool(metadata, capability)
    }
}

/// Tool-execution orchestrator.
///
/// Owns the registry and shares it with the executors. Tools are loaded once
/// through [`initialize`](Self::initialize); the registry is read-only after.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    batch: BatchExecutor,
    reporter: HealthReporter,
    lifecycle: Lifecycle,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.lifecycle.state())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator that logs every result through tracing.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Config`] if `config` fails validation.
    pub fn new(config: OrchestratorConfig) -> OrchestratorResult<Self> {
        Self::with_sink(config, Arc::new(TracingExecutionSink))
    }

    /// Creates an orchestrator forwarding every result to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Config`] if `config` fails validation.
    pub fn with_sink(
        config: OrchestratorConfig,
        sink: Arc<dyn ExecutionSink>,
    ) -> OrchestratorResult<Self> {
        config.validate()?;

        let registry = Arc::new(ToolRegistry::new());
        let executor =
            ToolExecutor::new(Arc::clone(&registry), config.default_timeout()).with_sink(sink);
        let scheduler =
            TaskScheduler::new(SchedulerConfig::new(config.max_parallel_workers()));
        let batch = BatchExecutor::new(executor.clone(), scheduler);
        let reporter = HealthReporter::new(Arc::clone(&registry));

        Ok(Self {
            config,
            registry,
            executor,
            batch,
            reporter,
            lifecycle: Lifecycle::new(),
        })
    }

    /// Returns the configuration the orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Returns the shared registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        self.lifecycle.state()
    }

    /// Returns `true` once [`initialize`](Self::initialize) succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lifecycle.state().is_ready()
    }

    /// Registers tools from every provider whose category is enabled, then
    /// freezes the registry.
    ///
    /// Calling this again after success logs a warning and does nothing. On
    /// failure, tools registered by earlier providers are removed so the
    /// call can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Provider`] naming the first provider that
    /// failed.
    pub fn initialize<I>(&mut self, providers: I) -> OrchestratorResult<()>
    where
        I: IntoIterator<Item = Box<dyn ToolProvider>>,
    {
        if self.is_initialized() {
            warn!("orchestrator already initialized; ignoring");
            return Ok(());
        }
        self.lifecycle.transition(LifecycleEvent::Begin)?;

        let mut loaded = Vec::new();
        for provider in providers {
            let category = provider.category();
            if !self.config.is_enabled(category) {
                info!(%category, "category disabled; skipping provider");
                continue;
            }

            let mut registrar = CategoryRegistrar::new(&self.registry, category);
            let outcome = provider.register(&mut registrar);
            let registered = std::mem::take(&mut registrar.registered);
            let count = registered.len();
            loaded.extend(registered);

            if let Err(source) = outcome {
                warn!(
                    %category,
                    kind = %ErrorKind::from(&source),
                    error = %source,
                    "provider failed; rolling back"
                );
                for name in &loaded {
                    if let Err(err) = self.registry.unregister(name) {
                        warn!(tool = %name, error = %err, "rollback could not remove tool");
                    }
                }
                self.lifecycle.transition(LifecycleEvent::Fail)?;
                return Err(OrchestratorError::Provider { category, source });
            }
            info!(%category, tools = count, "provider loaded");
        }

        self.registry.freeze();
        self.lifecycle.transition(LifecycleEvent::Complete)?;
        info!(
            total_tools = self.registry.count(None),
            categories = self.registry.category_counts().len(),
            "orchestrator initialized"
        );
        Ok(())
    }

    /// Executes one tool.
    pub async fn execute(
        &self,
        name: &str,
        params: Parameters,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        self.executor.execute(name, params, timeout).await
    }

    /// Executes a batch.
    pub async fn execute_batch(
        &self,
        commands: Vec<BatchCommand>,
        mode: ExecutionMode,
    ) -> BatchResult {
        self.batch.run(commands, mode).await
    }

    /// Reports counts and initialisation status.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        self.reporter.health(self.is_initialized())
    }

    /// Describes a registered tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if `name` is not registered.
    pub fn describe(&self, name: &str) -> ToolResult<ToolDescription> {
        self.reporter.describe(name)
    }

    /// Tool names grouped by non-empty category.
    #[must_use]
    pub fn available_tools(&self) -> BTreeMap<ToolCategory, Vec<String>> {
        self.reporter.available_tools()
    }

    /// Runs a parsed command envelope.
    pub async fn handle(&self, envelope: CommandEnvelope) -> ResponseEnvelope {
        let CommandEnvelope {
            request_id,
            command,
        } = envelope;

        match command {
            Command::ExecuteTool {
                tool_name,
                parameters,
                timeout,
            } => {
                let mut command = BatchCommand::new(tool_name).with_parameters(parameters);
                if let Some(timeout) = timeout {
                    command = command.with_timeout(timeout);
                }
                if let Some(request_id) = request_id.clone() {
                    command = command.with_request_id(request_id);
                }
                let result = self.executor.execute_command(command).await;
                ResponseEnvelope::single(request_id, result)
            }
            Command::ExecuteBatch { commands, parallel } => {
                let result = self
                    .batch
                    .run(commands, ExecutionMode::from_parallel(parallel))
                    .await;
                ResponseEnvelope::batch(request_id, result)
            }
        }
    }

    /// Parses and runs a JSON command envelope. Malformed input produces an
    /// error response, never a panic or `Err`.
    pub async fn handle_json(&self, raw: &str) -> ResponseEnvelope {
        match CommandEnvelope::from_json(raw) {
            Ok(envelope) => self.handle(envelope).await,
            Err(err) => {
                warn!(error = %err, "rejected malformed command envelope");
                ResponseEnvelope::malformed(raw, &err.to_string())
            }
        }
    }
}
