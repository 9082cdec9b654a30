//! Structured results produced by the execution engine.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use toolbox_tools::ToolError;
use toolbox_primitives::duration::as_millis_u64;
use toolbox_primitives::{InvocationId, RequestId, ToolCategory};

/// Classification of a failed execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A registration collided with an existing name.
    #[serde(rename = "DuplicateNameError")]
    DuplicateName,
    /// The named tool is not registered.
    #[serde(rename = "NotFoundError")]
    NotFound,
    /// Parameters or the request envelope failed validation.
    #[serde(rename = "ValidationError")]
    Validation,
    /// The invocation exceeded its deadline.
    #[serde(rename = "TimeoutError")]
    Timeout,
    /// The tool failed or panicked.
    #[serde(rename = "ExecutionError")]
    Execution,
}

impl ErrorKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateName => "DuplicateNameError",
            Self::NotFound => "NotFoundError",
            Self::Validation => "ValidationError",
            Self::Timeout => "TimeoutError",
            Self::Execution => "ExecutionError",
        }
    }
}

impl From<&ToolError> for ErrorKind {
    fn from(err: &ToolError) -> Self {
        match err {
            ToolError::DuplicateTool { .. } => Self::DuplicateName,
            ToolError::UnknownTool { .. } => Self::NotFound,
            ToolError::InvalidMetadata { .. } => Self::Validation,
            ToolError::RegistryFrozen { .. } | ToolError::Execution { .. } => Self::Execution,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure attached to an unsuccessful [`ExecutionResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    kind: ErrorKind,
    message: String,
}

impl ErrorDescriptor {
    /// Creates a descriptor of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of a single tool invocation.
///
/// Exactly one of [`data`](Self::data) and [`error`](Self::error) is set,
/// matching [`is_success`](Self::is_success). Deserialisation rejects
/// documents that break this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExecutionResult")]
pub struct ExecutionResult {
    success: bool,
    tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<ToolCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDescriptor>,
    #[serde(default)]
    metadata: Map<String, Value>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawExecutionResult {
    success: bool,
    tool_name: String,
    #[serde(default)]
    category: Option<ToolCategory>,
    #[serde(default)]
    request_id: Option<RequestId>,
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    error: Option<ErrorDescriptor>,
    #[serde(default)]
    metadata: Map<String, Value>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

// A present key is `Some` even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawExecutionResult> for ExecutionResult {
    type Error = String;

    fn try_from(raw: RawExecutionResult) -> Result<Self, Self::Error> {
        match (raw.success, raw.data.is_some(), raw.error.is_some()) {
            (true, true, false) | (false, false, true) => {}
            (true, _, _) => {
                return Err("successful result must carry `data` and no `error`".to_owned());
            }
            (false, _, _) => {
                return Err("failed result must carry `error` and no `data`".to_owned());
            }
        }

        Ok(Self {
            success: raw.success,
            tool_name: raw.tool_name,
            category: raw.category,
            request_id: raw.request_id,
            data: raw.data,
            error: raw.error,
            metadata: raw.metadata,
            started_at: raw.started_at,
            finished_at: raw.finished_at,
        })
    }
}

impl ExecutionResult {
    /// Returns `true` when the tool completed and produced data.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the requested tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Category resolved from the registry; `None` when the tool was not found.
    #[must_use]
    pub fn category(&self) -> Option<ToolCategory> {
        self.category
    }

    /// Caller correlation identifier, echoed unchanged.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Output of a successful invocation.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Failure of an unsuccessful invocation.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorDescriptor> {
        self.error.as_ref()
    }

    /// Shorthand for the failure kind.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(ErrorDescriptor::kind)
    }

    /// Execution metadata: `invocation_id`, `duration_ms`, and where relevant
    /// `timeout_ms` and `available_tools`.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// When dispatch started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the result was produced.
    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Consumes the result, returning the data or the failure.
    ///
    /// # Errors
    ///
    /// Returns the [`ErrorDescriptor`] of an unsuccessful invocation.
    pub fn into_outcome(self) -> Result<Value, ErrorDescriptor> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (data, None) => Ok(data.unwrap_or(Value::Null)),
        }
    }
}

/// Tracks one dispatch from start to result.
pub(crate) struct Attempt {
    tool_name: String,
    request_id: Option<RequestId>,
    category: Option<ToolCategory>,
    invocation_id: InvocationId,
    timeout: Option<Duration>,
    extra: Map<String, Value>,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl Attempt {
    pub(crate) fn start(tool_name: impl Into<String>, request_id: Option<RequestId>) -> Self {
        Self {
            tool_name: tool_name.into(),
            request_id,
            category: None,
            invocation_id: InvocationId::random(),
            timeout: None,
            extra: Map::new(),
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    pub(crate) fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub(crate) fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    pub(crate) fn set_category(&mut self, category: ToolCategory) {
        self.category = Some(category);
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub(crate) fn insert_metadata(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_owned(), value);
    }

    pub(crate) fn succeed(self, data: Value) -> ExecutionResult {
        self.finish(Some(data), None)
    }

    pub(crate) fn fail(self, kind: ErrorKind, message: impl Into<String>) -> ExecutionResult {
        self.finish(None, Some(ErrorDescriptor::new(kind, message)))
    }

    fn finish(self, data: Option<Value>, error: Option<ErrorDescriptor>) -> ExecutionResult {
        let mut metadata = self.extra;
        metadata.insert(
            "invocation_id".into(),
            Value::String(self.invocation_id.to_string()),
        );
        metadata.insert(
            "duration_ms".into(),
            Value::from(as_millis_u64(self.clock.elapsed())),
        );
        if let Some(timeout) = self.timeout {
            metadata.insert("timeout_ms".into(), Value::from(as_millis_u64(timeout)));
        }

        ExecutionResult {
            success: error.is_none(),
            tool_name: self.tool_name,
            category: self.category,
            request_id: self.request_id,
            data: if error.is_none() {
                Some(data.unwrap_or(Value::Null))
            } else {
                None
            },
            error,
            metadata,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Ordered results of a batch, index-aligned with the submitted commands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    results: Vec<ExecutionResult>,
}

impl BatchResult {
    pub(crate) fn new(results: Vec<ExecutionResult>) -> Self {
        Self { results }
    }

    /// Number of results, always equal to the number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results in command order.
    #[must_use]
    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    /// Iterates results in command order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExecutionResult> {
        self.results.iter()
    }

    /// Number of successful results.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed results.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

impl IntoIterator for BatchResult {
    type Item = ExecutionResult;
    type IntoIter = std::vec::IntoIter<ExecutionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a ExecutionResult;
    type IntoIter = std::slice::Iter<'a, ExecutionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_carries_data_and_metadata() {
        let mut attempt = Attempt::start("get_token_price", Some(RequestId::from("req-1")));
        attempt.set_category(ToolCategory::MarketData);
        attempt.set_timeout(Duration::from_secs(2));
        let result = attempt.succeed(json!({"price": 1.5}));

        assert!(result.is_success());
        assert!(result.error().is_none());
        assert_eq!(result.data(), Some(&json!({"price": 1.5})));
        assert_eq!(result.category(), Some(ToolCategory::MarketData));
        assert_eq!(result.request_id().map(RequestId::as_str), Some("req-1"));
        assert_eq!(result.metadata()["timeout_ms"], json!(2000));
        assert!(result.metadata().contains_key("invocation_id"));
        assert!(result.metadata().contains_key("duration_ms"));
        assert!(result.finished_at() >= result.started_at());
    }

    #[test]
    fn failure_serializes_kind_name() {
        let result = Attempt::start("missing", None).fail(ErrorKind::NotFound, "no such tool");
        assert!(!result.is_success());
        assert!(result.data().is_none());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"]["kind"], json!("NotFoundError"));
        assert!(value.get("category").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn into_outcome_splits_branches() {
        let ok = Attempt::start("echo", None).succeed(json!(1));
        assert_eq!(ok.into_outcome().unwrap(), json!(1));

        let err = Attempt::start("echo", None).fail(ErrorKind::Timeout, "slow");
        assert_eq!(err.into_outcome().unwrap_err().kind(), ErrorKind::Timeout);
    }

    #[test]
    fn null_data_survives_json_round_trip() {
        let ok = Attempt::start("post_update", None).succeed(Value::Null);
        let raw = serde_json::to_string(&ok).unwrap();
        assert!(raw.contains(r#""data":null"#));

        let back: ExecutionResult = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, ok);
        assert_eq!(back.data(), Some(&Value::Null));
    }

    #[test]
    fn inconsistent_documents_are_rejected() {
        let failed = Attempt::start("echo", None).fail(ErrorKind::Timeout, "slow");
        let mut value = serde_json::to_value(&failed).unwrap();

        value["success"] = json!(true);
        assert!(serde_json::from_value::<ExecutionResult>(value.clone()).is_err());

        value["success"] = json!(false);
        value["data"] = json!(1);
        assert!(serde_json::from_value::<ExecutionResult>(value.clone()).is_err());

        let object = value.as_object_mut().unwrap();
        object.remove("data");
        object.remove("error");
        assert!(serde_json::from_value::<ExecutionResult>(value.clone()).is_err());

        value["success"] = json!(true);
        assert!(serde_json::from_value::<ExecutionResult>(value).is_err());
    }

    #[test]
    fn tool_errors_map_to_kinds() {
        let duplicate = ToolError::DuplicateTool {
            name: "echo".into(),
        };
        assert_eq!(ErrorKind::from(&duplicate), ErrorKind::DuplicateName);
        assert_eq!(
            ErrorKind::from(&ToolError::UnknownTool {
                name: "echo".into()
            }),
            ErrorKind::NotFound
        );
        assert_eq!(
            ErrorKind::from(&ToolError::execution("boom")),
            ErrorKind::Execution
        );
    }

    #[test]
    fn batch_counts_outcomes() {
        let batch = BatchResult::new(vec![
            Attempt::start("a", None).succeed(json!(null)),
            Attempt::start("b", None).fail(ErrorKind::Execution, "boom"),
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
        assert!(serde_json::to_value(&batch).unwrap().is_array());
    }
}
