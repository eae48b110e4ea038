//! Fluent graph-construction DSL.
//!
//! [`WorkflowBuilder`] appends to a current node chain; `fork` and
//! `case` open nested branch scopes whose sub-chains rejoin the parent
//! continuation unless they end in an exit or a jump. Open chain ends
//! are tracked explicitly as pending edges, so "rejoin the parent" is a
//! wiring step rather than an implicit convention. A branch that
//! composes no node is a build-time error, not a silent gap.

use petgraph::stable_graph::NodeIndex;

use crate::error::BuildError;
use crate::factory::NodeFactory;
use crate::graph::node::{EdgeKind, Predicate, Selector, Work};
use crate::retry::RetryPolicy;
use crate::workflow::Workflow;

/// A pending edge out of an open chain end, wired to the next node
/// appended to the chain.
#[derive(Debug, Clone)]
struct OpenEnd {
    from: NodeIndex,
    edge: EdgeKind,
}

#[derive(Debug, Default)]
struct Chain {
    first: Option<NodeIndex>,
    open: Vec<OpenEnd>,
}

impl Chain {
    fn new() -> Self {
        Chain {
            first: None,
            open: Vec::new(),
        }
    }

    /// Wire all open ends into `idx`; the first node attached becomes
    /// the chain head.
    fn attach(&mut self, factory: &mut NodeFactory, idx: NodeIndex) {
        if self.first.is_none() {
            self.first = Some(idx);
        }
        for end in self.open.drain(..) {
            factory.connect(end.from, end.edge, idx);
        }
    }
}

fn append_action(
    factory: &mut NodeFactory,
    chain: &mut Chain,
    err: &mut Option<BuildError>,
    tag: Option<&str>,
    label: &str,
    work: Work,
    retry: Option<RetryPolicy>,
) {
    if err.is_some() {
        return;
    }
    match factory.action(tag, label, work, retry) {
        Ok(idx) => {
            chain.attach(factory, idx);
            chain.open = vec![OpenEnd {
                from: idx,
                edge: EdgeKind::Next,
            }];
        }
        Err(e) => *err = Some(e),
    }
}

fn append_jump(
    factory: &mut NodeFactory,
    chain: &mut Chain,
    err: &mut Option<BuildError>,
    target: &str,
) {
    if err.is_some() {
        return;
    }
    match factory.jump(None, target) {
        Ok(idx) => {
            chain.attach(factory, idx);
            chain.open = Vec::new();
        }
        Err(e) => *err = Some(e),
    }
}

fn append_exit(
    factory: &mut NodeFactory,
    chain: &mut Chain,
    err: &mut Option<BuildError>,
    tag: Option<&str>,
    code: i32,
) {
    if err.is_some() {
        return;
    }
    let label = format!("exit {}", code);
    match factory.exit(tag, &label, code) {
        Ok(idx) => {
            chain.attach(factory, idx);
            chain.open = Vec::new();
        }
        Err(e) => *err = Some(e),
    }
}

/// Run a branch closure against a fresh sub-chain and return its head
/// and remaining open ends. An empty sub-chain is a build error.
fn run_branch<F>(
    factory: &mut NodeFactory,
    owner: &str,
    build: F,
) -> Result<(NodeIndex, Vec<OpenEnd>), BuildError>
where
    F: for<'a> FnOnce(BranchBuilder<'a>) -> BranchBuilder<'a>,
{
    let branch = BranchBuilder {
        factory,
        chain: Chain::new(),
        err: None,
    };
    let branch = build(branch);
    if let Some(err) = branch.err {
        return Err(err);
    }
    match branch.chain.first {
        Some(first) => Ok((first, branch.chain.open)),
        None => Err(BuildError::EmptyBranch {
            node: owner.to_string(),
        }),
    }
}

fn apply_fork<F>(
    factory: &mut NodeFactory,
    chain: &mut Chain,
    err: &mut Option<BuildError>,
    tag: Option<&str>,
    label: &str,
    predicate: Predicate,
    scope: F,
) where
    F: for<'a> FnOnce(ForkScope<'a>) -> ForkScope<'a>,
{
    if err.is_some() {
        return;
    }
    let idx = match factory.fork(tag, label, predicate) {
        Ok(idx) => idx,
        Err(e) => {
            *err = Some(e);
            return;
        }
    };
    chain.attach(factory, idx);

    let state = ForkScope {
        factory,
        owner: label.to_string(),
        true_chain: None,
        false_chain: None,
        err: None,
    };
    let ForkScope {
        factory,
        true_chain,
        false_chain,
        err: scope_err,
        ..
    } = scope(state);
    if let Some(e) = scope_err {
        *err = Some(e);
        return;
    }

    let mut open = Vec::new();
    match true_chain {
        Some((first, ends)) => {
            factory.connect(idx, EdgeKind::IfTrue, first);
            open.extend(ends);
        }
        None => {
            *err = Some(BuildError::MissingTrueBranch {
                node: label.to_string(),
            });
            return;
        }
    }
    if let Some((first, ends)) = false_chain {
        factory.connect(idx, EdgeKind::IfFalse, first);
        open.extend(ends);
    }
    chain.open = open;
}

fn apply_case<F>(
    factory: &mut NodeFactory,
    chain: &mut Chain,
    err: &mut Option<BuildError>,
    tag: Option<&str>,
    label: &str,
    selector: Selector,
    scope: F,
) where
    F: for<'a> FnOnce(CaseArms<'a>) -> CaseArms<'a>,
{
    if err.is_some() {
        return;
    }
    let idx = match factory.case(tag, label, selector) {
        Ok(idx) => idx,
        Err(e) => {
            *err = Some(e);
            return;
        }
    };
    chain.attach(factory, idx);

    let state = CaseArms {
        factory,
        owner: label.to_string(),
        arms: Vec::new(),
        otherwise: None,
        err: None,
    };
    let CaseArms {
        factory,
        arms,
        otherwise,
        err: scope_err,
        ..
    } = scope(state);
    if let Some(e) = scope_err {
        *err = Some(e);
        return;
    }

    let mut open = Vec::new();
    for (key, first, ends) in arms {
        factory.connect(idx, EdgeKind::Case(key), first);
        open.extend(ends);
    }
    if let Some((first, ends)) = otherwise {
        factory.connect(idx, EdgeKind::Otherwise, first);
        open.extend(ends);
    }
    chain.open = open;
}

/// Branch scope for a fork node: a true branch (required) and a false
/// branch (optional). A false predicate with no false branch ends the
/// run silently at the fork.
pub struct ForkScope<'f> {
    factory: &'f mut NodeFactory,
    owner: String,
    true_chain: Option<(NodeIndex, Vec<OpenEnd>)>,
    false_chain: Option<(NodeIndex, Vec<OpenEnd>)>,
    err: Option<BuildError>,
}

impl<'f> ForkScope<'f> {
    pub fn on_true<F>(mut self, build: F) -> Self
    where
        F: for<'a> FnOnce(BranchBuilder<'a>) -> BranchBuilder<'a>,
    {
        if self.err.is_some() {
            return self;
        }
        match run_branch(self.factory, &self.owner, build) {
            Ok(chain) => self.true_chain = Some(chain),
            Err(e) => self.err = Some(e),
        }
        self
    }

    pub fn on_false<F>(mut self, build: F) -> Self
    where
        F: for<'a> FnOnce(BranchBuilder<'a>) -> BranchBuilder<'a>,
    {
        if self.err.is_some() {
            return self;
        }
        match run_branch(self.factory, &self.owner, build) {
            Ok(chain) => self.false_chain = Some(chain),
            Err(e) => self.err = Some(e),
        }
        self
    }
}

/// Branch scope for a case node: one arm per exact-match key plus an
/// optional fallback. A selector miss with no fallback ends the run
/// silently at the case node.
pub struct CaseArms<'f> {
    factory: &'f mut NodeFactory,
    owner: String,
    arms: Vec<(String, NodeIndex, Vec<OpenEnd>)>,
    otherwise: Option<(NodeIndex, Vec<OpenEnd>)>,
    err: Option<BuildError>,
}

impl<'f> CaseArms<'f> {
    pub fn arm<F>(mut self, key: &str, build: F) -> Self
    where
        F: for<'a> FnOnce(BranchBuilder<'a>) -> BranchBuilder<'a>,
    {
        if self.err.is_some() {
            return self;
        }
        if self.arms.iter().any(|(k, _, _)| k == key) {
            self.err = Some(BuildError::DuplicateCaseKey {
                node: self.owner.clone(),
                key: key.to_string(),
            });
            return self;
        }
        match run_branch(self.factory, &self.owner, build) {
            Ok((first, ends)) => self.arms.push((key.to_string(), first, ends)),
            Err(e) => self.err = Some(e),
        }
        self
    }

    pub fn otherwise<F>(mut self, build: F) -> Self
    where
        F: for<'a> FnOnce(BranchBuilder<'a>) -> BranchBuilder<'a>,
    {
        if self.err.is_some() {
            return self;
        }
        match run_branch(self.factory, &self.owner, build) {
            Ok(chain) => self.otherwise = Some(chain),
            Err(e) => self.err = Some(e),
        }
        self
    }
}

/// Composes a sub-chain inside a branch scope. Offers the same chain
/// operations as [`WorkflowBuilder`].
pub struct BranchBuilder<'f> {
    factory: &'f mut NodeFactory,
    chain: Chain,
    err: Option<BuildError>,
}

impl<'f> BranchBuilder<'f> {
    pub fn step(self, label: &str, work: Work) -> Self {
        self.step_full(None, label, work, None)
    }

    pub fn step_tagged(self, tag: &str, label: &str, work: Work) -> Self {
        self.step_full(Some(tag), label, work, None)
    }

    pub fn step_with_retry(self, label: &str, work: Work, retry: RetryPolicy) -> Self {
        self.step_full(None, label, work, Some(retry))
    }

    pub fn step_full(
        mut self,
        tag: Option<&str>,
        label: &str,
        work: Work,
        retry: Option<RetryPolicy>,
    ) -> Self {
        append_action(
            self.factory,
            &mut self.chain,
            &mut self.err,
            tag,
            label,
            work,
            retry,
        );
        self
    }

    pub fn fork<F>(self, label: &str, predicate: Predicate, scope: F) -> Self
    where
        F: for<'a> FnOnce(ForkScope<'a>) -> ForkScope<'a>,
    {
        self.fork_tagged_opt(None, label, predicate, scope)
    }

    pub fn fork_tagged<F>(self, tag: &str, label: &str, predicate: Predicate, scope: F) -> Self
    where
        F: for<'a> FnOnce(ForkScope<'a>) -> ForkScope<'a>,
    {
        self.fork_tagged_opt(Some(tag), label, predicate, scope)
    }

    fn fork_tagged_opt<F>(
        mut self,
        tag: Option<&str>,
        label: &str,
        predicate: Predicate,
        scope: F,
    ) -> Self
    where
        F: for<'a> FnOnce(ForkScope<'a>) -> ForkScope<'a>,
    {
        apply_fork(
            self.factory,
            &mut self.chain,
            &mut self.err,
            tag,
            label,
            predicate,
            scope,
        );
        self
    }

    pub fn case<F>(self, label: &str, selector: Selector, scope: F) -> Self
    where
        F: for<'a> FnOnce(CaseArms<'a>) -> CaseArms<'a>,
    {
        self.case_tagged_opt(None, label, selector, scope)
    }

    pub fn case_tagged<F>(self, tag: &str, label: &str, selector: Selector, scope: F) -> Self
    where
        F: for<'a> FnOnce(CaseArms<'a>) -> CaseArms<'a>,
    {
        self.case_tagged_opt(Some(tag), label, selector, scope)
    }

    fn case_tagged_opt<F>(
        mut self,
        tag: Option<&str>,
        label: &str,
        selector: Selector,
        scope: F,
    ) -> Self
    where
        F: for<'a> FnOnce(CaseArms<'a>) -> CaseArms<'a>,
    {
        apply_case(
            self.factory,
            &mut self.chain,
            &mut self.err,
            tag,
            label,
            selector,
            scope,
        );
        self
    }

    /// Append a jump to the node bound to `target` and close this chain.
    pub fn jump_to(mut self, target: &str) -> Self {
        append_jump(self.factory, &mut self.chain, &mut self.err, target);
        self
    }

    /// Append a terminal exit node and close this chain.
    pub fn exit(mut self, code: i32) -> Self {
        append_exit(self.factory, &mut self.chain, &mut self.err, None, code);
        self
    }

    pub fn exit_tagged(mut self, tag: &str, code: i32) -> Self {
        append_exit(self.factory, &mut self.chain, &mut self.err, Some(tag), code);
        self
    }
}

/// Fluent builder producing a finalized [`Workflow`].
pub struct WorkflowBuilder {
    name: String,
    factory: NodeFactory,
    chain: Chain,
    err: Option<BuildError>,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        WorkflowBuilder {
            name: name.to_string(),
            factory: NodeFactory::new(),
            chain: Chain::new(),
            err: None,
        }
    }

    /// Append an action node executing `work`.
    pub fn step(self, label: &str, work: Work) -> Self {
        self.step_full(None, label, work, None)
    }

    pub fn step_tagged(self, tag: &str, label: &str, work: Work) -> Self {
        self.step_full(Some(tag), label, work, None)
    }

    pub fn step_with_retry(self, label: &str, work: Work, retry: RetryPolicy) -> Self {
        self.step_full(None, label, work, Some(retry))
    }

    pub fn step_full(
        mut self,
        tag: Option<&str>,
        label: &str,
        work: Work,
        retry: Option<RetryPolicy>,
    ) -> Self {
        append_action(
            &mut self.factory,
            &mut self.chain,
            &mut self.err,
            tag,
            label,
            work,
            retry,
        );
        self
    }

    /// Append a conditional fork; the scope composes the true branch
    /// (required) and false branch (optional).
    pub fn fork<F>(self, label: &str, predicate: Predicate, scope: F) -> Self
    where
        F: for<'a> FnOnce(ForkScope<'a>) -> ForkScope<'a>,
    {
        self.fork_tagged_opt(None, label, predicate, scope)
    }

    pub fn fork_tagged<F>(self, tag: &str, label: &str, predicate: Predicate, scope: F) -> Self
    where
        F: for<'a> FnOnce(ForkScope<'a>) -> ForkScope<'a>,
    {
        self.fork_tagged_opt(Some(tag), label, predicate, scope)
    }

    fn fork_tagged_opt<F>(
        mut self,
        tag: Option<&str>,
        label: &str,
        predicate: Predicate,
        scope: F,
    ) -> Self
    where
        F: for<'a> FnOnce(ForkScope<'a>) -> ForkScope<'a>,
    {
        apply_fork(
            &mut self.factory,
            &mut self.chain,
            &mut self.err,
            tag,
            label,
            predicate,
            scope,
        );
        self
    }

    /// Append a multi-way case; the scope adds one arm per key plus an
    /// optional fallback.
    pub fn case<F>(self, label: &str, selector: Selector, scope: F) -> Self
    where
        F: for<'a> FnOnce(CaseArms<'a>) -> CaseArms<'a>,
    {
        self.case_tagged_opt(None, label, selector, scope)
    }

    pub fn case_tagged<F>(self, tag: &str, label: &str, selector: Selector, scope: F) -> Self
    where
        F: for<'a> FnOnce(CaseArms<'a>) -> CaseArms<'a>,
    {
        self.case_tagged_opt(Some(tag), label, selector, scope)
    }

    fn case_tagged_opt<F>(
        mut self,
        tag: Option<&str>,
        label: &str,
        selector: Selector,
        scope: F,
    ) -> Self
    where
        F: for<'a> FnOnce(CaseArms<'a>) -> CaseArms<'a>,
    {
        apply_case(
            &mut self.factory,
            &mut self.chain,
            &mut self.err,
            tag,
            label,
            selector,
            scope,
        );
        self
    }

    /// Append a jump to the node bound to `target` and close the chain.
    pub fn jump_to(mut self, target: &str) -> Self {
        append_jump(&mut self.factory, &mut self.chain, &mut self.err, target);
        self
    }

    /// Append a terminal exit node and close the chain.
    pub fn exit(mut self, code: i32) -> Self {
        append_exit(&mut self.factory, &mut self.chain, &mut self.err, None, code);
        self
    }

    pub fn exit_tagged(mut self, tag: &str, code: i32) -> Self {
        append_exit(
            &mut self.factory,
            &mut self.chain,
            &mut self.err,
            Some(tag),
            code,
        );
        self
    }

    /// Finalize the graph: resolve jump bindings and produce the
    /// immutable workflow.
    pub fn build(self) -> Result<Workflow, BuildError> {
        if let Some(err) = self.err {
            return Err(err);
        }
        let root = self.chain.first.ok_or(BuildError::EmptyWorkflow)?;
        let graph = self.factory.finish(root);
        Ok(Workflow::new(self.name, graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::EdgeKind;

    fn noop() -> Work {
        Work::sync(|_ctx| Ok(()))
    }

    fn always() -> Predicate {
        Predicate::sync(|_ctx| true)
    }

    #[test]
    fn test_linear_chain_wiring() {
        let workflow = WorkflowBuilder::new("linear")
            .step("one", noop())
            .step("two", noop())
            .exit(0)
            .build()
            .unwrap();

        let graph = workflow.graph();
        assert_eq!(graph.node_count(), 3);
        let root = graph.root();
        let second = graph.successor(root, &EdgeKind::Next).unwrap();
        let third = graph.successor(second, &EdgeKind::Next).unwrap();
        assert_eq!(graph.node(third).unwrap().kind_name(), "exit");
    }

    #[test]
    fn test_fork_branches_rejoin_continuation() {
        let workflow = WorkflowBuilder::new("rejoin")
            .fork("gate", always(), |f| {
                f.on_true(|b| b.step("yes", noop()))
                    .on_false(|b| b.step("no", noop()))
            })
            .step_tagged("after", "after", noop())
            .build()
            .unwrap();

        let graph = workflow.graph();
        let fork = graph.root();
        let yes = graph.successor(fork, &EdgeKind::IfTrue).unwrap();
        let no = graph.successor(fork, &EdgeKind::IfFalse).unwrap();
        let after = graph.node_by_tag("after").unwrap();
        assert_eq!(graph.successor(yes, &EdgeKind::Next), Some(after));
        assert_eq!(graph.successor(no, &EdgeKind::Next), Some(after));
    }

    #[test]
    fn test_branch_ending_in_exit_does_not_rejoin() {
        let workflow = WorkflowBuilder::new("no-rejoin")
            .fork("gate", always(), |f| {
                f.on_true(|b| b.exit(1)).on_false(|b| b.step("no", noop()))
            })
            .step_tagged("after", "after", noop())
            .build()
            .unwrap();

        let graph = workflow.graph();
        let fork = graph.root();
        let exit = graph.successor(fork, &EdgeKind::IfTrue).unwrap();
        assert!(graph.outgoing(exit).is_empty());
        let no = graph.successor(fork, &EdgeKind::IfFalse).unwrap();
        let after = graph.node_by_tag("after").unwrap();
        assert_eq!(graph.successor(no, &EdgeKind::Next), Some(after));
    }

    #[test]
    fn test_empty_branch_is_error() {
        let err = WorkflowBuilder::new("dangling")
            .fork("gate", always(), |f| f.on_true(|b| b))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::EmptyBranch { node: "gate".into() });
    }

    #[test]
    fn test_missing_true_branch_is_error() {
        let err = WorkflowBuilder::new("no-true")
            .fork("gate", always(), |f| f.on_false(|b| b.step("no", noop())))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::MissingTrueBranch { node: "gate".into() });
    }

    #[test]
    fn test_case_arm_wiring() {
        let workflow = WorkflowBuilder::new("routes")
            .case(
                "route",
                Selector::sync(|_ctx| "a".to_string()),
                |arms| {
                    arms.arm("a", |b| b.step("handle a", noop()))
                        .arm("b", |b| b.exit(2))
                        .otherwise(|b| b.step("fallback", noop()))
                },
            )
            .exit(0)
            .build()
            .unwrap();

        let graph = workflow.graph();
        let case = graph.root();
        assert!(graph.successor(case, &EdgeKind::Case("a".into())).is_some());
        assert!(graph.successor(case, &EdgeKind::Case("b".into())).is_some());
        assert!(graph.successor(case, &EdgeKind::Otherwise).is_some());
        assert!(graph.successor(case, &EdgeKind::Case("c".into())).is_none());
    }

    #[test]
    fn test_duplicate_case_key_is_error() {
        let err = WorkflowBuilder::new("dupe")
            .case(
                "route",
                Selector::sync(|_ctx| "a".to_string()),
                |arms| {
                    arms.arm("a", |b| b.exit(0)).arm("a", |b| b.exit(1))
                },
            )
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateCaseKey {
                node: "route".into(),
                key: "a".into()
            }
        );
    }

    #[test]
    fn test_duplicate_tag_poisons_builder() {
        let err = WorkflowBuilder::new("dupe-tag")
            .step_tagged("x", "one", noop())
            .step_tagged("x", "two", noop())
            .exit(0)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::DuplicateTag("x".into()));
    }

    #[test]
    fn test_empty_workflow_is_error() {
        let err = WorkflowBuilder::new("empty").build().unwrap_err();
        assert_eq!(err, BuildError::EmptyWorkflow);
    }

    #[test]
    fn test_jump_closes_chain() {
        let workflow = WorkflowBuilder::new("loop")
            .step_tagged("top", "top", noop())
            .jump_to("top")
            .build()
            .unwrap();

        let graph = workflow.graph();
        let top = graph.node_by_tag("top").unwrap();
        let jump = graph.successor(top, &EdgeKind::Next).unwrap();
        assert_eq!(graph.successor(jump, &EdgeKind::Jump), Some(top));
        assert!(workflow.validate().is_valid);
    }

    #[test]
    fn test_nested_fork_in_branch() {
        let workflow = WorkflowBuilder::new("nested")
            .fork("outer", always(), |f| {
                f.on_true(|b| {
                    b.fork("inner", always(), |f| {
                        f.on_true(|b| b.step("deep", noop()))
                    })
                })
            })
            .exit(0)
            .build()
            .unwrap();
        assert_eq!(workflow.graph().node_count(), 4);
        assert!(workflow.validate().is_valid);
    }
}
