//! High-level workflow facade.
//!
//! [`Workflow`] is the main entry point: build a graph with
//! [`Workflow::builder`], then [`run`](Workflow::run) it against a
//! fresh [`Context`] and a cancellation token. Structural validation is
//! computed once per workflow and gates every run.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::builder::WorkflowBuilder;
use crate::context::Context;
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::{ValidationReport, WorkflowGraph};
use crate::runtime::{EventEmitter, WorkflowDispatcher};

/// A finalized, immutable workflow: a graph plus its name.
///
/// Graphs exist only in-process for the duration of a run; nothing is
/// persisted.
#[derive(Debug)]
pub struct Workflow {
    name: String,
    graph: Arc<WorkflowGraph>,
    validation: OnceLock<ValidationReport>,
}

impl Workflow {
    pub(crate) fn new(name: String, graph: WorkflowGraph) -> Self {
        Workflow {
            name,
            graph: Arc::new(graph),
            validation: OnceLock::new(),
        }
    }

    /// Start a fluent builder for a new workflow.
    pub fn builder(name: &str) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Shared handle to the graph, for driving a
    /// [`WorkflowDispatcher`] directly.
    pub fn graph_handle(&self) -> Arc<WorkflowGraph> {
        self.graph.clone()
    }

    /// Structural check: every defect in the graph, computed once per
    /// workflow and cached.
    pub fn validate(&self) -> &ValidationReport {
        self.validation.get_or_init(|| self.graph.validate())
    }

    /// Execute the workflow from its root.
    ///
    /// Refuses to run an invalid graph or a disposed context. The
    /// context is disposed at termination regardless of outcome.
    pub async fn run(&self, ctx: &mut Context, cancel: &CancellationToken) -> WorkflowResult<i32> {
        self.run_with_events(ctx, cancel, EventEmitter::disabled())
            .await
    }

    /// Same as [`run`](Self::run), emitting [`EngineEvent`](crate::runtime::EngineEvent)s
    /// to the given emitter.
    pub async fn run_with_events(
        &self,
        ctx: &mut Context,
        cancel: &CancellationToken,
        emitter: EventEmitter,
    ) -> WorkflowResult<i32> {
        let report = self.validate();
        if !report.is_valid {
            return Err(WorkflowError::ValidationFailed(Box::new(report.clone())));
        }
        debug!(workflow = %self.name, "starting run");
        let mut dispatcher = WorkflowDispatcher::with_events(self.graph.clone(), emitter);
        dispatcher.run(ctx, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::Work;

    #[tokio::test]
    async fn test_run_simple_workflow() {
        let workflow = Workflow::builder("greeter")
            .step(
                "greet",
                Work::sync(|ctx| {
                    ctx.set("greeting", "hello");
                    Ok(())
                }),
            )
            .exit(0)
            .build()
            .unwrap();

        assert_eq!(workflow.name(), "greeter");
        let mut ctx = Context::new();
        let code = workflow
            .run(&mut ctx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(ctx.get_text("greeting").unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_invalid_graph_refused_before_execution() {
        let workflow = Workflow::builder("broken")
            .step("only", Work::sync(|_| Ok(())))
            .jump_to("nowhere")
            .build()
            .unwrap();

        assert!(!workflow.validate().is_valid);

        let mut ctx = Context::new();
        let err = workflow
            .run(&mut ctx, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert_eq!(report.errors().len(), 1);
                assert_eq!(report.errors()[0].code, "E202");
            }
            other => panic!("Expected ValidationFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validation_is_cached() {
        let workflow = Workflow::builder("cached")
            .step("only", Work::sync(|_| Ok(())))
            .build()
            .unwrap();
        let first = workflow.validate() as *const ValidationReport;
        let second = workflow.validate() as *const ValidationReport;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_workflow_reusable_across_runs() {
        let workflow = Workflow::builder("reusable")
            .step(
                "mark",
                Work::sync(|ctx| {
                    ctx.set("ran", true);
                    Ok(())
                }),
            )
            .exit(0)
            .build()
            .unwrap();

        for _ in 0..2 {
            let mut ctx = Context::new();
            let code = workflow
                .run(&mut ctx, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(code, 0);
            assert!(ctx.get_bool("ran").unwrap());
        }
    }
}
