//! Core shared types for the toolbox orchestrator.

#![warn(missing_docs, clippy::pedantic)]

mod category;
pub mod duration;
mod error;
mod ids;
mod schema;

/// Closed set of tool categories.
pub use category::ToolCategory;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifiers for tools, invocations, and caller requests.
pub use ids::{InvocationId, RequestId, ToolName};
/// Declarative parameter schemas.
pub use schema::{
    FieldSpec, FieldType, ParameterSchema, ParameterSchemaBuilder, Parameters, SchemaViolation,
};
