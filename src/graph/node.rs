//! Node model: the five node kinds, their callable units, and typed edges.
//!
//! Callables come in a closed set of shapes resolved once at node
//! construction time — the dispatcher matches on the variant, it never
//! re-inspects the callable per invocation.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::NodeResult;
use crate::retry::RetryPolicy;

/// Synchronous unit of work.
pub type SyncWorkFn = dyn Fn(&mut Context) -> NodeResult<()> + Send + Sync;
/// Synchronous unit of work observing the cancellation signal.
pub type SyncCancelWorkFn = dyn Fn(&mut Context, &CancellationToken) -> NodeResult<()> + Send + Sync;
/// Asynchronous unit of work.
pub type AsyncWorkFn =
    dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, NodeResult<()>> + Send + Sync;
/// Asynchronous unit of work observing the cancellation signal.
pub type AsyncCancelWorkFn = dyn for<'a> Fn(&'a mut Context, CancellationToken) -> BoxFuture<'a, NodeResult<()>>
    + Send
    + Sync;

/// A unit of work executed by an action node.
///
/// The engine threads the cancellation signal through every invocation;
/// the `*_cancellable` shapes receive it, the plain shapes ignore it.
/// Work that never observes the signal cannot be interrupted mid-flight
/// — the engine still checks the signal before each node.
#[derive(Clone)]
pub enum Work {
    Sync(Arc<SyncWorkFn>),
    SyncCancellable(Arc<SyncCancelWorkFn>),
    Async(Arc<AsyncWorkFn>),
    AsyncCancellable(Arc<AsyncCancelWorkFn>),
}

impl Work {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> NodeResult<()> + Send + Sync + 'static,
    {
        Work::Sync(Arc::new(f))
    }

    pub fn sync_cancellable<F>(f: F) -> Self
    where
        F: Fn(&mut Context, &CancellationToken) -> NodeResult<()> + Send + Sync + 'static,
    {
        Work::SyncCancellable(Arc::new(f))
    }

    pub fn async_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, NodeResult<()>> + Send + Sync + 'static,
    {
        Work::Async(Arc::new(f))
    }

    pub fn async_cancellable<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context, CancellationToken) -> BoxFuture<'a, NodeResult<()>>
            + Send
            + Sync
            + 'static,
    {
        Work::AsyncCancellable(Arc::new(f))
    }

    pub(crate) async fn invoke(
        &self,
        ctx: &mut Context,
        cancel: &CancellationToken,
    ) -> NodeResult<()> {
        match self {
            Work::Sync(f) => f(ctx),
            Work::SyncCancellable(f) => f(ctx, cancel),
            Work::Async(f) => f(ctx).await,
            Work::AsyncCancellable(f) => f(ctx, cancel.clone()).await,
        }
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Work::Sync(_) => "sync",
            Work::SyncCancellable(_) => "sync+cancel",
            Work::Async(_) => "async",
            Work::AsyncCancellable(_) => "async+cancel",
        };
        write!(f, "Work({})", shape)
    }
}

/// Side-effect-free condition evaluated by a fork node, exactly once per
/// visit. The engine provides no retry for predicate evaluation.
pub type SyncPredicateFn = dyn Fn(&Context) -> bool + Send + Sync;
pub type AsyncPredicateFn = dyn for<'a> Fn(&'a Context) -> BoxFuture<'a, bool> + Send + Sync;

#[derive(Clone)]
pub enum Predicate {
    Sync(Arc<SyncPredicateFn>),
    Async(Arc<AsyncPredicateFn>),
}

impl Predicate {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        Predicate::Sync(Arc::new(f))
    }

    pub fn async_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a Context) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Predicate::Async(Arc::new(f))
    }

    pub(crate) async fn evaluate(&self, ctx: &Context) -> bool {
        match self {
            Predicate::Sync(f) => f(ctx),
            Predicate::Async(f) => f(ctx).await,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Sync(_) => write!(f, "Predicate(sync)"),
            Predicate::Async(_) => write!(f, "Predicate(async)"),
        }
    }
}

/// Key selector evaluated by a case node, exactly once per visit.
pub type SyncSelectorFn = dyn Fn(&Context) -> String + Send + Sync;
pub type AsyncSelectorFn = dyn for<'a> Fn(&'a Context) -> BoxFuture<'a, String> + Send + Sync;

#[derive(Clone)]
pub enum Selector {
    Sync(Arc<SyncSelectorFn>),
    Async(Arc<AsyncSelectorFn>),
}

impl Selector {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Context) -> String + Send + Sync + 'static,
    {
        Selector::Sync(Arc::new(f))
    }

    pub fn async_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a Context) -> BoxFuture<'a, String> + Send + Sync + 'static,
    {
        Selector::Async(Arc::new(f))
    }

    pub(crate) async fn select(&self, ctx: &Context) -> String {
        match self {
            Selector::Sync(f) => f(ctx),
            Selector::Async(f) => f(ctx).await,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Sync(_) => write!(f, "Selector(sync)"),
            Selector::Async(_) => write!(f, "Selector(async)"),
        }
    }
}

/// The concrete behavior of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Executes a unit of work, then advances along the `Next` edge.
    Action {
        work: Work,
        retry: Option<RetryPolicy>,
    },
    /// Conditional fork: true branch required, false branch optional.
    Fork { predicate: Predicate },
    /// Multi-way fork: ordinal exact-match on the selector's key.
    Case { selector: Selector },
    /// Unconditional transfer to the node bound to `target`, resolved
    /// once at graph finalization.
    Jump { target: String },
    /// Terminal node carrying the run's exit code.
    Exit { code: i32 },
}

/// A node in the workflow graph.
///
/// Nodes are created once by the factory/builder and are immutable after
/// graph finalization.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier within the graph, used for jump resolution.
    pub tag: Option<String>,
    /// Display name.
    pub label: String,
    pub kind: NodeKind,
}

impl Node {
    /// Name used in diagnostics, logs, and events: the tag when present,
    /// the label otherwise.
    pub fn name(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.label)
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Action { .. } => "action",
            NodeKind::Fork { .. } => "fork",
            NodeKind::Case { .. } => "case",
            NodeKind::Jump { .. } => "jump",
            NodeKind::Exit { .. } => "exit",
        }
    }
}

/// Edge kinds wiring the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// Plain successor edge.
    Next,
    /// Fork's true branch.
    IfTrue,
    /// Fork's false branch.
    IfFalse,
    /// Case branch matched by exact key.
    Case(String),
    /// Case fallback branch.
    Otherwise,
    /// Resolved jump binding.
    Jump,
}
