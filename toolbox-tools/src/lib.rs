//! Capability contract and category-indexed registry for orchestrated tools.
//!
//! Every tool implements [`Tool`] (or [`Capability`] when it declares its own
//! metadata) and is registered explicitly under a [`ToolCategory`]. The
//! registry hands out cloned [`ToolHandle`]s so invocations never run under
//! the registry lock.
//!
//! [`ToolCategory`]: toolbox_primitives::ToolCategory

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod registry;
mod tool;

pub use error::{ToolError, ToolResult};
pub use registry::{ToolListing, ToolRegistration, ToolRegistry};
pub use tool::{Capability, Tool, ToolHandle, ToolMetadata};
