//! Capability contract implemented by every tool.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbox_primitives::{ParameterSchema, Parameters, ToolName};

use crate::error::{ToolError, ToolResult};

/// Metadata describing a tool: its name, description, and parameter schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolMetadata {
    name: ToolName,
    description: String,
    #[serde(default)]
    schema: ParameterSchema,
}

impl ToolMetadata {
    /// Creates metadata with an empty parameter schema.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] if the name is not a valid
    /// [`ToolName`] or the description is blank.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> ToolResult<Self> {
        let name = ToolName::new(name).map_err(|err| ToolError::InvalidMetadata {
            reason: err.to_string(),
        })?;

        let description = description.into();
        if description.trim().is_empty() {
            return Err(ToolError::InvalidMetadata {
                reason: format!("tool `{name}` needs a description"),
            });
        }

        Ok(Self {
            name,
            description,
            schema: ParameterSchema::empty(),
        })
    }

    /// Replaces the declared parameter schema.
    #[must_use]
    pub fn with_schema(mut self, schema: ParameterSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared parameter schema.
    #[must_use]
    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }
}

/// Trait implemented by tool executors.
///
/// Implementations may fail with any [`ToolError`]; the orchestrator converts
/// failures into structured results.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with named parameters, returning JSON output.
    async fn invoke(&self, params: Parameters) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Parameters) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, params: Parameters) -> ToolResult<Value> {
        (self)(params).await
    }
}

/// A tool that also declares its own metadata.
pub trait Capability: Tool {
    /// Returns the name, description, and schema this tool advertises.
    fn metadata(&self) -> ToolMetadata;
}

/// Handle through which the orchestrator invokes a registered tool.
#[derive(Clone)]
pub struct ToolHandle {
    metadata: Arc<ToolMetadata>,
    executor: Arc<dyn Tool>,
}

impl std::fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.metadata.name())
            .finish_non_exhaustive()
    }
}

impl ToolHandle {
    /// Wraps a tool implementation together with its metadata.
    #[must_use]
    pub fn new<T>(metadata: ToolMetadata, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        Self {
            metadata: Arc::new(metadata),
            executor: Arc::new(tool),
        }
    }

    /// Returns the associated metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Executes the underlying tool implementation.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by the underlying implementation.
    pub async fn invoke(&self, params: Parameters) -> ToolResult<Value> {
        self.executor.invoke(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolbox_primitives::FieldType;

    struct StaticPrice;

    #[async_trait]
    impl Tool for StaticPrice {
        async fn invoke(&self, params: Parameters) -> ToolResult<Value> {
            let symbol = params
                .get("symbol")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::execution("symbol missing"))?;
            Ok(json!({"symbol": symbol, "price": 2500.0}))
        }
    }

    impl Capability for StaticPrice {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata::new("get_token_price", "Current token price")
                .expect("metadata")
                .with_schema(
                    ParameterSchema::builder()
                        .required("symbol", FieldType::String)
                        .expect("schema")
                        .build(),
                )
        }
    }

    #[tokio::test]
    async fn handle_invokes_struct_tool() {
        let handle = ToolHandle::new(StaticPrice.metadata(), StaticPrice);
        let mut params = Parameters::new();
        params.insert("symbol".into(), json!("ETH-USDC"));

        let output = handle.invoke(params).await.unwrap();
        assert_eq!(output["price"], json!(2500.0));
        assert_eq!(handle.metadata().name(), "get_token_price");
    }

    #[tokio::test]
    async fn handle_invokes_closure_tool() {
        let metadata = ToolMetadata::new("echo", "Echo incoming parameters").unwrap();
        let handle = ToolHandle::new(metadata, |params: Parameters| async move {
            Ok(Value::Object(params))
        });

        let mut params = Parameters::new();
        params.insert("message".into(), json!("hello"));
        let output = handle.invoke(params.clone()).await.unwrap();
        assert_eq!(output, Value::Object(params));
    }

    #[test]
    fn invalid_metadata_errors() {
        let err = ToolMetadata::new("", "desc").expect_err("empty name should error");
        assert!(matches!(err, ToolError::InvalidMetadata { .. }));

        let err = ToolMetadata::new("echo", " ").expect_err("blank description should error");
        assert!(matches!(err, ToolError::InvalidMetadata { .. }));
    }
}
