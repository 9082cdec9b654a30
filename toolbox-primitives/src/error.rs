//! Shared error definitions for toolbox primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the toolbox runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided invocation identifier could not be parsed.
    #[error("invalid invocation id: {source}")]
    InvalidInvocationId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Tool name failed validation.
    #[error("invalid tool name `{name}`: {reason}")]
    InvalidToolName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Category string does not name one of the known categories.
    #[error("unknown tool category `{value}`")]
    UnknownCategory {
        /// The string that failed to parse.
        value: String,
    },

    /// Parameter schema definition failed validation.
    #[error("invalid parameter schema: {reason}")]
    InvalidSchema {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
