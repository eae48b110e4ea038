//! Error types for the workflow engine.
//!
//! - [`NodeError`] — Errors raised by a node's unit of work.
//! - [`ContextError`] — Typed context access failures.
//! - [`BuildError`] — Graph construction failures.
//! - [`WorkflowError`] — Top-level errors for building, validating, and running.

pub mod build_error;
pub mod context_error;
pub mod node_error;
pub mod workflow_error;

pub use build_error::BuildError;
pub use context_error::ContextError;
pub use node_error::NodeError;
pub use workflow_error::WorkflowError;

/// Convenience alias for workflow-level results.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
/// Convenience alias for node-level results.
pub type NodeResult<T> = Result<T, NodeError>;
