//! Single-call execution with deadline enforcement.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use toolbox_primitives::duration::as_millis_u64;
use toolbox_primitives::{Parameters, RequestId};
use toolbox_tools::{ToolError, ToolRegistry};
use tracing::{debug, warn};

use crate::batch::BatchCommand;
use crate::result::{Attempt, ErrorKind, ExecutionResult};
use crate::sink::ExecutionSink;

/// Executes registered tools, turning every outcome into an [`ExecutionResult`].
///
/// The executor never returns an error: unknown tools, schema violations,
/// timeouts, tool failures and panics all become failed results.
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    default_timeout: Duration,
    sink: Option<Arc<dyn ExecutionSink>>,
}

impl fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("registry", &self.registry)
            .field("default_timeout", &self.default_timeout)
            .field("sink_configured", &self.sink.is_some())
            .finish()
    }
}

impl ToolExecutor {
    /// Creates an executor over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, default_timeout: Duration) -> Self {
        Self {
            registry,
            default_timeout,
            sink: None,
        }
    }

    /// Forwards every produced result to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ExecutionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the registry the executor resolves names against.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns the deadline applied when a call names none.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Executes `name` with `params` under `timeout` (or the default).
    pub async fn execute(
        &self,
        name: &str,
        params: Parameters,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        self.dispatch(Attempt::start(name, None), params, timeout)
            .await
    }

    /// Executes a batch command, echoing its request id on the result.
    pub async fn execute_command(&self, command: BatchCommand) -> ExecutionResult {
        let (tool_name, parameters, timeout, request_id) = command.into_parts();
        self.dispatch(Attempt::start(tool_name, request_id), parameters, timeout)
            .await
    }

    /// Produces a failed result for a command that never reached dispatch.
    pub(crate) fn reject(
        &self,
        tool_name: String,
        request_id: Option<RequestId>,
        kind: ErrorKind,
        message: String,
    ) -> ExecutionResult {
        let result = Attempt::start(tool_name, request_id).fail(kind, message);
        self.record(&result);
        result
    }

    async fn dispatch(
        &self,
        mut attempt: Attempt,
        params: Parameters,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        let name = attempt.tool_name().to_owned();

        let Some(registration) = self.registry.get(&name) else {
            attempt.insert_metadata(
                "available_tools",
                Value::from(self.registry.tool_names()),
            );
            let result = attempt.fail(
                ErrorKind::NotFound,
                format!("tool `{name}` is not registered"),
            );
            self.record(&result);
            return result;
        };
        attempt.set_category(registration.category());

        if let Err(violation) = registration.metadata().schema().validate(&params) {
            let result = attempt.fail(ErrorKind::Validation, violation.to_string());
            self.record(&result);
            return result;
        }

        let deadline = timeout.unwrap_or(self.default_timeout);
        attempt.set_timeout(deadline);
        debug!(
            tool = %name,
            category = %registration.category(),
            invocation_id = %attempt.invocation_id(),
            timeout_ms = as_millis_u64(deadline),
            "dispatching tool"
        );

        let handle = registration.handle().clone();
        let mut task = tokio::spawn(async move { handle.invoke(params).await });

        let result = match tokio::time::timeout(deadline, &mut task).await {
            Ok(Ok(Ok(data))) => attempt.succeed(data),
            Ok(Ok(Err(err))) => attempt.fail(ErrorKind::Execution, tool_error_message(err)),
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    format!("tool panicked: {}", panic_message(&*join_err.into_panic()))
                } else {
                    "tool task was cancelled".to_owned()
                };
                attempt.fail(ErrorKind::Execution, message)
            }
            Err(_elapsed) => {
                task.abort();
                warn!(
                    tool = %name,
                    timeout_ms = as_millis_u64(deadline),
                    "tool timed out"
                );
                attempt.fail(
                    ErrorKind::Timeout,
                    format!(
                        "tool `{name}` did not finish within {} ms",
                        as_millis_u64(deadline)
                    ),
                )
            }
        };

        self.record(&result);
        result
    }

    fn record(&self, result: &ExecutionResult) {
        if let Some(sink) = &self.sink {
            sink.record(result);
        }
    }
}

fn tool_error_message(err: ToolError) -> String {
    match err {
        ToolError::Execution { reason } => reason,
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use serde_json::json;
    use toolbox_primitives::{FieldType, ParameterSchema, ToolCategory};
    use toolbox_tools::ToolMetadata;

    fn registry() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        let schema = ParameterSchema::builder()
            .required("symbol", FieldType::String)
            .unwrap()
            .optional("limit", FieldType::Integer)
            .unwrap()
            .build();
        registry
            .register_tool(
                ToolMetadata::new("get_token_price", "Token price")
                    .unwrap()
                    .with_schema(schema),
                ToolCategory::MarketData,
                |params: Parameters| async move {
                    Ok(json!({"symbol": params["symbol"], "price": 42.0}))
                },
            )
            .unwrap();
        registry
            .register_tool(
                ToolMetadata::new("failing", "Always fails").unwrap(),
                ToolCategory::Storage,
                |_: Parameters| async move { Err(ToolError::execution("bucket unavailable")) },
            )
            .unwrap();
        registry
            .register_tool(
                ToolMetadata::new("slow", "Sleeps for a second").unwrap(),
                ToolCategory::Search,
                |_: Parameters| async move {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(Value::Null)
                },
            )
            .unwrap();
        registry
            .register_tool(
                ToolMetadata::new("panicking", "Panics").unwrap(),
                ToolCategory::Memory,
                |_: Parameters| async move {
                    if true {
                        panic!("index out of range");
                    }
                    Ok(Value::Null)
                },
            )
            .unwrap();
        Arc::new(registry)
    }

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }

    #[tokio::test]
    async fn success_reports_category_and_data() {
        let executor = ToolExecutor::new(registry(), Duration::from_secs(5));
        let result = executor
            .execute("get_token_price", params(json!({"symbol": "ETH"})), None)
            .await;

        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.category(), Some(ToolCategory::MarketData));
        assert_eq!(result.data().unwrap()["price"], json!(42.0));
        assert_eq!(result.metadata()["timeout_ms"], json!(5000));
    }

    #[tokio::test]
    async fn unknown_tool_lists_available_tools() {
        let executor = ToolExecutor::new(registry(), Duration::from_secs(5));
        let result = executor.execute("nonexistent", Parameters::new(), None).await;

        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
        assert!(result.category().is_none());
        let available = result.metadata()["available_tools"].as_array().unwrap();
        assert_eq!(available.len(), 4);
    }

    #[tokio::test]
    async fn schema_violations_are_validation_errors() {
        let executor = ToolExecutor::new(registry(), Duration::from_secs(5));

        let missing = executor
            .execute("get_token_price", Parameters::new(), None)
            .await;
        assert_eq!(missing.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(missing.category(), Some(ToolCategory::MarketData));

        let mistyped = executor
            .execute(
                "get_token_price",
                params(json!({"symbol": "ETH", "limit": "ten"})),
                None,
            )
            .await;
        assert_eq!(mistyped.error_kind(), Some(ErrorKind::Validation));

        let unknown = executor
            .execute(
                "get_token_price",
                params(json!({"symbol": "ETH", "chain": "base"})),
                None,
            )
            .await;
        assert_eq!(unknown.error_kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn tool_errors_keep_original_message() {
        let executor = ToolExecutor::new(registry(), Duration::from_secs(5));
        let result = executor.execute("failing", Parameters::new(), None).await;

        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::Execution);
        assert_eq!(error.message(), "bucket unavailable");
    }

    #[tokio::test]
    async fn panics_become_execution_errors() {
        let executor = ToolExecutor::new(registry(), Duration::from_secs(5));
        let result = executor.execute("panicking", Parameters::new(), None).await;

        let error = result.error().unwrap();
        assert_eq!(error.kind(), ErrorKind::Execution);
        assert!(error.message().contains("index out of range"));
    }

    #[tokio::test]
    async fn timeout_returns_at_deadline() {
        let executor = ToolExecutor::new(registry(), Duration::from_secs(5));
        let started = std::time::Instant::now();
        let result = executor
            .execute("slow", Parameters::new(), Some(Duration::from_millis(50)))
            .await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(result.metadata()["timeout_ms"], json!(50));
    }

    #[tokio::test]
    async fn sink_receives_every_result() {
        let sink = CollectingSink::new();
        let executor =
            ToolExecutor::new(registry(), Duration::from_secs(5)).with_sink(sink.clone());
        let _ = executor.execute("failing", Parameters::new(), None).await;
        let _ = executor.execute("missing", Parameters::new(), None).await;

        let recorded = sink.drain();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[1].error_kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn command_echoes_request_id() {
        let executor = ToolExecutor::new(registry(), Duration::from_secs(5));
        let command = BatchCommand::new("get_token_price")
            .with_parameter("symbol", json!("BTC"))
            .with_request_id("req-9");
        let result = executor.execute_command(command).await;

        assert!(result.is_success());
        assert_eq!(result.request_id().map(RequestId::as_str), Some("req-9"));
    }
}
