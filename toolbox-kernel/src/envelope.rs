//! Request and response envelopes exchanged with upstream callers.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbox_primitives::{Parameters, RequestId};

use crate::batch::BatchCommand;
use crate::result::{Attempt, BatchResult, ErrorKind, ExecutionResult};

/// Command envelope received from a caller such as an intent router.
///
/// ```json
/// {"action": "execute_tool", "tool_name": "get_token_price",
///  "parameters": {"symbol": "ETH"}, "timeout": 5, "request_id": "r-1"}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Correlation id echoed on the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Requested action.
    #[serde(flatten)]
    pub command: Command,
}

impl CommandEnvelope {
    /// Parses an envelope from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed JSON, an unknown `action`,
    /// or missing required fields.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Action carried by a [`CommandEnvelope`], tagged by `action`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Execute a single tool.
    ExecuteTool {
        /// Tool to invoke.
        tool_name: String,
        /// Named parameters.
        #[serde(default)]
        parameters: Parameters,
        /// Per-call deadline in seconds.
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            with = "toolbox_primitives::duration::secs_option"
        )]
        timeout: Option<Duration>,
    },
    /// Execute a batch of tools.
    ExecuteBatch {
        /// Ordered commands.
        commands: Vec<BatchCommand>,
        /// Dispatch concurrently when `true`.
        #[serde(default)]
        parallel: bool,
    },
}

/// Outcome status of a response envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The request ran; for single calls, the tool also succeeded.
    Success,
    /// The request failed or could not be parsed.
    Error,
}

/// Body of a response envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// Result of a batch, in command order.
    Batch(BatchResult),
    /// Result of one call.
    Single(ExecutionResult),
}

/// Response envelope returned to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    request_id: Option<RequestId>,
    status: ResponseStatus,
    result: ResponsePayload,
}

impl ResponseEnvelope {
    /// Wraps a single result; the status mirrors its success.
    #[must_use]
    pub fn single(request_id: Option<RequestId>, result: ExecutionResult) -> Self {
        let status = if result.is_success() {
            ResponseStatus::Success
        } else {
            ResponseStatus::Error
        };
        Self {
            request_id,
            status,
            result: ResponsePayload::Single(result),
        }
    }

    /// Wraps a batch result. The batch ran, so the status is success even when
    /// individual commands failed.
    #[must_use]
    pub fn batch(request_id: Option<RequestId>, result: BatchResult) -> Self {
        Self {
            request_id,
            status: ResponseStatus::Success,
            result: ResponsePayload::Batch(result),
        }
    }

    /// Builds the response for a request that could not be parsed.
    ///
    /// The request id and tool name are recovered from `raw` when it is a
    /// JSON object carrying them as strings.
    #[must_use]
    pub fn malformed(raw: &str, reason: &str) -> Self {
        let document: Option<Value> = serde_json::from_str(raw).ok();
        let field = |key: &str| {
            document
                .as_ref()
                .and_then(|doc| doc.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        let request_id = field("request_id").map(RequestId::new);
        let tool_name = field("tool_name").unwrap_or_default();
        let result = Attempt::start(tool_name, request_id.clone()).fail(
            ErrorKind::Validation,
            format!("malformed command envelope: {reason}"),
        );
        Self::single(request_id, result)
    }

    /// Returns the echoed correlation id.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    /// Returns the body.
    #[must_use]
    pub fn result(&self) -> &ResponsePayload {
        &self.result
    }

    /// Returns the single result, if this responds to `execute_tool`.
    #[must_use]
    pub fn as_single(&self) -> Option<&ExecutionResult> {
        match &self.result {
            ResponsePayload::Single(result) => Some(result),
            ResponsePayload::Batch(_) => None,
        }
    }

    /// Returns the batch result, if this responds to `execute_batch`.
    #[must_use]
    pub fn as_batch(&self) -> Option<&BatchResult> {
        match &self.result {
            ResponsePayload::Batch(batch) => Some(batch),
            ResponsePayload::Single(_) => None,
        }
    }
}
