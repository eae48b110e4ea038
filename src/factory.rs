//! Node factory: constructs nodes, enforces tag uniqueness, indexes
//! tags for jump resolution.

use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::error::BuildError;
use crate::graph::node::{EdgeKind, Node, NodeKind, Predicate, Selector, Work};
use crate::graph::{TagIndexMap, WorkflowGraph};
use crate::retry::RetryPolicy;

/// Owns the graph while it is under construction.
///
/// Nodes are created through the per-kind constructors; every tagged
/// node is registered in the tag index at creation time, and a reused
/// tag is rejected there rather than discovered later. [`finish`]
/// performs the second construction pass that binds jumps to their
/// targets and produces the immutable [`WorkflowGraph`].
///
/// [`finish`]: NodeFactory::finish
#[derive(Debug, Default)]
pub struct NodeFactory {
    graph: StableDiGraph<Node, EdgeKind>,
    tag_index: TagIndexMap,
}

impl NodeFactory {
    pub fn new() -> Self {
        NodeFactory {
            graph: StableDiGraph::new(),
            tag_index: TagIndexMap::new(),
        }
    }

    fn insert(
        &mut self,
        tag: Option<&str>,
        label: &str,
        kind: NodeKind,
    ) -> Result<NodeIndex, BuildError> {
        if let Some(tag) = tag {
            if self.tag_index.contains_key(tag) {
                return Err(BuildError::DuplicateTag(tag.to_string()));
            }
        }
        let idx = self.graph.add_node(Node {
            tag: tag.map(str::to_string),
            label: label.to_string(),
            kind,
        });
        if let Some(tag) = tag {
            self.tag_index.insert(tag.to_string(), idx);
        }
        Ok(idx)
    }

    /// Create an action node with an optional retry policy.
    pub fn action(
        &mut self,
        tag: Option<&str>,
        label: &str,
        work: Work,
        retry: Option<RetryPolicy>,
    ) -> Result<NodeIndex, BuildError> {
        self.insert(tag, label, NodeKind::Action { work, retry })
    }

    /// Create a conditional fork node.
    pub fn fork(
        &mut self,
        tag: Option<&str>,
        label: &str,
        predicate: Predicate,
    ) -> Result<NodeIndex, BuildError> {
        self.insert(tag, label, NodeKind::Fork { predicate })
    }

    /// Create a multi-way case node.
    pub fn case(
        &mut self,
        tag: Option<&str>,
        label: &str,
        selector: Selector,
    ) -> Result<NodeIndex, BuildError> {
        self.insert(tag, label, NodeKind::Case { selector })
    }

    /// Create a jump node targeting the node bound to `target`.
    pub fn jump(&mut self, tag: Option<&str>, target: &str) -> Result<NodeIndex, BuildError> {
        let label = format!("jump to {}", target);
        self.insert(
            tag,
            &label,
            NodeKind::Jump {
                target: target.to_string(),
            },
        )
    }

    /// Create a terminal exit node carrying the run's exit code.
    pub fn exit(
        &mut self,
        tag: Option<&str>,
        label: &str,
        code: i32,
    ) -> Result<NodeIndex, BuildError> {
        self.insert(tag, label, NodeKind::Exit { code })
    }

    /// Wire a typed edge between two existing nodes.
    pub fn connect(&mut self, from: NodeIndex, edge: EdgeKind, to: NodeIndex) {
        self.graph.add_edge(from, to, edge);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_index.contains_key(tag)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Second construction pass: bind every jump to its target tag as a
    /// direct edge, so runtime traversal is O(1). Unresolvable targets
    /// are left unbound for validation to report.
    pub fn finish(mut self, root: NodeIndex) -> WorkflowGraph {
        let jumps: Vec<(NodeIndex, String)> = self
            .graph
            .node_indices()
            .filter_map(|idx| match &self.graph[idx].kind {
                NodeKind::Jump { target } => Some((idx, target.clone())),
                _ => None,
            })
            .collect();

        for (idx, target) in jumps {
            if let Some(&to) = self.tag_index.get(&target) {
                self.graph.add_edge(idx, to, EdgeKind::Jump);
            }
        }

        WorkflowGraph {
            graph: self.graph,
            root,
            tag_index: self.tag_index,
        }
    }
}
