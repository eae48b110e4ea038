//! Workflow dispatcher — the main execution driver.
//!
//! [`WorkflowDispatcher`] walks the graph one node at a time against a
//! caller-owned [`Context`]: the cancellation signal is checked before
//! every node, actions run through their retry policy when one is
//! attached, and the context is disposed exactly once on every
//! termination path. Scheduling is strictly sequential; a node's unit
//! of work may suspend internally, but the graph sees only its
//! completion.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::error::{NodeError, WorkflowError, WorkflowResult};
use crate::graph::node::{EdgeKind, NodeKind};
use crate::graph::WorkflowGraph;

use super::event::{EngineEvent, EventEmitter};
use super::ExecutionStatus;

/// Exit code reported when a run ends without reaching an exit node: a
/// missing successor or a documented silent fallthrough.
pub const DEFAULT_EXIT_CODE: i32 = 0;

/// Drives a single sequential pass over a workflow graph.
///
/// The engine places no implicit bound on iteration count — a workflow
/// that jumps back without an exit condition loops until cancelled.
pub struct WorkflowDispatcher {
    graph: Arc<WorkflowGraph>,
    emitter: EventEmitter,
    run_id: String,
    status: ExecutionStatus,
    steps: u64,
}

impl WorkflowDispatcher {
    pub fn new(graph: Arc<WorkflowGraph>) -> Self {
        Self::with_events(graph, EventEmitter::disabled())
    }

    pub fn with_events(graph: Arc<WorkflowGraph>, emitter: EventEmitter) -> Self {
        WorkflowDispatcher {
            graph,
            emitter,
            run_id: uuid::Uuid::new_v4().to_string(),
            status: ExecutionStatus::NotStarted,
            steps: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> &ExecutionStatus {
        &self.status
    }

    /// Nodes visited so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Execute the graph from its root until an exit node, a missing
    /// successor, a failure, or cancellation.
    pub async fn run(
        &mut self,
        ctx: &mut Context,
        cancel: &CancellationToken,
    ) -> WorkflowResult<i32> {
        if ctx.is_disposed() {
            return Err(WorkflowError::ContextDisposed);
        }

        self.status = ExecutionStatus::Running;
        self.steps = 0;
        self.emitter.emit(EngineEvent::RunStarted {
            run_id: self.run_id.clone(),
        });

        let graph = self.graph.clone();
        let mut current = Some(graph.root());

        while let Some(idx) = current {
            if cancel.is_cancelled() {
                return self.abort(ctx);
            }
            let Some(node) = graph.node(idx) else {
                return self.fail_run(
                    ctx,
                    WorkflowError::Internal("node missing from graph".into()),
                );
            };

            self.steps += 1;
            let name = node.name().to_string();
            debug!(
                run_id = %self.run_id,
                node = %name,
                kind = node.kind_name(),
                "executing node"
            );
            self.emitter.emit(EngineEvent::NodeStarted {
                run_id: self.run_id.clone(),
                node: name.clone(),
                kind: node.kind_name(),
            });

            match &node.kind {
                NodeKind::Action { work, retry } => {
                    let result = match retry {
                        Some(policy) => {
                            let emitter = self.emitter.clone();
                            let run_id = self.run_id.clone();
                            let node_name = name.clone();
                            policy
                                .execute_observed(work, ctx, cancel, |attempt, delay, err| {
                                    warn!(
                                        run_id = %run_id,
                                        node = %node_name,
                                        attempt,
                                        error = %err,
                                        "transient failure, retrying"
                                    );
                                    emitter.emit(EngineEvent::NodeRetrying {
                                        run_id: run_id.clone(),
                                        node: node_name.clone(),
                                        attempt,
                                        delay_ms: delay.as_millis() as u64,
                                        error: err.to_string(),
                                    });
                                })
                                .await
                        }
                        None => work.invoke(ctx, cancel).await,
                    };

                    match result {
                        Ok(()) => {
                            self.emitter.emit(EngineEvent::NodeSucceeded {
                                run_id: self.run_id.clone(),
                                node: name.clone(),
                            });
                            current = graph.successor(idx, &EdgeKind::Next);
                        }
                        Err(NodeError::Interrupted) => return self.abort(ctx),
                        Err(err) => return self.fail_node(ctx, name, err),
                    }
                }
                NodeKind::Fork { predicate } => {
                    // Evaluated exactly once per visit.
                    let outcome = predicate.evaluate(ctx).await;
                    let branch = if outcome { "true" } else { "false" };
                    self.emitter.emit(EngineEvent::BranchSelected {
                        run_id: self.run_id.clone(),
                        node: name.clone(),
                        branch: branch.to_string(),
                    });
                    current = if outcome {
                        match graph.successor(idx, &EdgeKind::IfTrue) {
                            Some(next) => Some(next),
                            None => {
                                return self.fail_run(
                                    ctx,
                                    WorkflowError::Internal(format!(
                                        "fork '{}' has no true branch",
                                        name
                                    )),
                                )
                            }
                        }
                    } else {
                        match graph.successor(idx, &EdgeKind::IfFalse) {
                            Some(next) => Some(next),
                            None => {
                                // No false branch: the run ends here.
                                debug!(run_id = %self.run_id, node = %name, "no false branch, run ends");
                                return self.complete(ctx, DEFAULT_EXIT_CODE);
                            }
                        }
                    };
                }
                NodeKind::Case { selector } => {
                    // Evaluated exactly once per visit; ordinal exact match.
                    let key = selector.select(ctx).await;
                    self.emitter.emit(EngineEvent::BranchSelected {
                        run_id: self.run_id.clone(),
                        node: name.clone(),
                        branch: key.clone(),
                    });
                    current = match graph.successor(idx, &EdgeKind::Case(key.clone())) {
                        Some(next) => Some(next),
                        None => match graph.successor(idx, &EdgeKind::Otherwise) {
                            Some(next) => Some(next),
                            None => {
                                // No arm and no fallback: the run ends here.
                                debug!(run_id = %self.run_id, node = %name, key = %key, "no matching arm, run ends");
                                return self.complete(ctx, DEFAULT_EXIT_CODE);
                            }
                        },
                    };
                }
                NodeKind::Jump { target } => {
                    current = match graph.successor(idx, &EdgeKind::Jump) {
                        Some(next) => Some(next),
                        None => {
                            let target = target.clone();
                            return self.fail_run(ctx, WorkflowError::UnresolvedJump(target));
                        }
                    };
                }
                NodeKind::Exit { code } => {
                    let code = *code;
                    return self.complete(ctx, code);
                }
            }
        }

        self.complete(ctx, DEFAULT_EXIT_CODE)
    }

    fn complete(&mut self, ctx: &mut Context, code: i32) -> WorkflowResult<i32> {
        ctx.dispose();
        self.status = ExecutionStatus::Completed(code);
        info!(
            run_id = %self.run_id,
            exit_code = code,
            steps = self.steps,
            "run completed"
        );
        self.emitter.emit(EngineEvent::RunCompleted {
            run_id: self.run_id.clone(),
            exit_code: code,
            steps: self.steps,
        });
        Ok(code)
    }

    fn abort(&mut self, ctx: &mut Context) -> WorkflowResult<i32> {
        ctx.dispose();
        self.status = ExecutionStatus::Failed("aborted".to_string());
        info!(run_id = %self.run_id, "run aborted");
        self.emitter.emit(EngineEvent::RunAborted {
            run_id: self.run_id.clone(),
        });
        Err(WorkflowError::Aborted)
    }

    fn fail_node(
        &mut self,
        ctx: &mut Context,
        node: String,
        source: NodeError,
    ) -> WorkflowResult<i32> {
        self.emitter.emit(EngineEvent::NodeFailed {
            run_id: self.run_id.clone(),
            node: node.clone(),
            error: source.to_string(),
        });
        self.fail_run(ctx, WorkflowError::NodeExecution { node, source })
    }

    fn fail_run(&mut self, ctx: &mut Context, err: WorkflowError) -> WorkflowResult<i32> {
        ctx.dispose();
        let message = err.to_string();
        self.status = ExecutionStatus::Failed(message.clone());
        warn!(run_id = %self.run_id, error = %message, "run failed");
        self.emitter.emit(EngineEvent::RunFailed {
            run_id: self.run_id.clone(),
            error: message,
        });
        Err(err)
    }
}
