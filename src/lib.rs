//! # Tagflow — a graph-based workflow execution engine
//!
//! `tagflow` wires composable node types — action, conditional fork,
//! multi-way case, unconditional jump, exit — into a directed graph and
//! executes it one node at a time against a shared mutable [`Context`]:
//!
//! - **Fluent builder**: chains, nested branch scopes, and tag-addressed
//!   jumps for loops.
//! - **Structural validation**: duplicate tags, dangling jump targets,
//!   and unreachable nodes are reported up front with rich diagnostics,
//!   never at run time.
//! - **Deterministic retries**: explicit delay schedules for transient
//!   failures, interruptible by cancellation.
//! - **Cancellation propagation**: a single token checked before every
//!   node and inside every retry wait.
//! - **Typed context**: typed accessors with distinct type-mismatch
//!   errors, plus disposal tracking for run-scoped resources.
//!
//! # Quick Start
//!
//! ```rust
//! use tagflow::{Context, Work, Workflow};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let workflow = Workflow::builder("greeter")
//!         .step("record greeting", Work::sync(|ctx| {
//!             ctx.set("greeting", "hello");
//!             Ok(())
//!         }))
//!         .exit(0)
//!         .build()
//!         .unwrap();
//!
//!     let mut ctx = Context::new();
//!     let code = workflow.run(&mut ctx, &CancellationToken::new()).await.unwrap();
//!     assert_eq!(code, 0);
//!     assert_eq!(ctx.get_text("greeting").unwrap(), "hello");
//! }
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod factory;
pub mod graph;
pub mod retry;
pub mod runtime;
pub mod workflow;

pub use crate::builder::{BranchBuilder, CaseArms, ForkScope, WorkflowBuilder};
pub use crate::context::{Context, ContextValue, Disposable};
pub use crate::error::{
    BuildError, ContextError, NodeError, NodeResult, WorkflowError, WorkflowResult,
};
pub use crate::factory::NodeFactory;
pub use crate::graph::{
    Diagnostic, DiagnosticLevel, EdgeKind, Node, NodeKind, Predicate, Selector, ValidationReport,
    Work, WorkflowGraph,
};
pub use crate::retry::RetryPolicy;
pub use crate::runtime::{
    create_event_channel, EngineEvent, EventEmitter, EventReceiver, ExecutionStatus,
    WorkflowDispatcher, DEFAULT_EXIT_CODE,
};
pub use crate::workflow::Workflow;
