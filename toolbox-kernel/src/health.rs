//! Read-only views over the registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toolbox_primitives::{ParameterSchema, ToolCategory};
use toolbox_tools::{ToolRegistry, ToolResult};

/// Overall orchestrator status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Initialisation completed.
    Healthy,
    /// Initialisation has not completed.
    NotInitialized,
}

/// Snapshot returned by [`HealthReporter::health`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    initialized: bool,
    status: HealthStatus,
    total_tools: usize,
    tools_by_category: BTreeMap<ToolCategory, usize>,
}

impl HealthReport {
    /// Returns `true` once initialisation completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the derived status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Total number of registered tools.
    #[must_use]
    pub fn total_tools(&self) -> usize {
        self.total_tools
    }

    /// Tool counts per non-empty category.
    #[must_use]
    pub fn tools_by_category(&self) -> &BTreeMap<ToolCategory, usize> {
        &self.tools_by_category
    }
}

/// Declared interface of a tool, for planning by upstream callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescription {
    /// Registered name.
    pub name: String,
    /// Category the tool was registered under.
    pub category: ToolCategory,
    /// Human-readable description.
    pub description: String,
    /// Declared parameter schema.
    pub parameters: ParameterSchema,
}

/// Produces health and discovery views from a shared registry.
#[derive(Clone, Debug)]
pub struct HealthReporter {
    registry: Arc<ToolRegistry>,
}

impl HealthReporter {
    /// Creates a reporter over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Returns counts and status. Never fails.
    #[must_use]
    pub fn health(&self, initialized: bool) -> HealthReport {
        HealthReport {
            initialized,
            status: if initialized {
                HealthStatus::Healthy
            } else {
                HealthStatus::NotInitialized
            },
            total_tools: self.registry.count(None),
            tools_by_category: self.registry.category_counts(),
        }
    }

    /// Describes a registered tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`](toolbox_tools::ToolError::UnknownTool)
    /// if `name` is not registered.
    pub fn describe(&self, name: &str) -> ToolResult<ToolDescription> {
        let registration = self.registry.lookup(name)?;
        let metadata = registration.metadata();
        Ok(ToolDescription {
            name: metadata.name().to_owned(),
            category: registration.category(),
            description: metadata.description().to_owned(),
            parameters: metadata.schema().clone(),
        })
    }

    /// Tool names grouped by non-empty category.
    #[must_use]
    pub fn available_tools(&self) -> BTreeMap<ToolCategory, Vec<String>> {
        self.registry.names_by_category()
    }
}
