//! Workflow graph: node arena, typed edges, tag index, validation.

pub mod node;
pub mod validate;

pub use node::{EdgeKind, Node, NodeKind, Predicate, Selector, Work};
pub use validate::{Diagnostic, DiagnosticLevel, ValidationReport};

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

/// Tag to node index mapping, built at construction time.
pub type TagIndexMap = HashMap<String, NodeIndex>;

/// A finalized workflow graph: the set of all nodes reachable from a
/// designated root, plus the tag index used for jump resolution.
///
/// Immutable after [`NodeFactory::finish`](crate::factory::NodeFactory::finish).
#[derive(Debug)]
pub struct WorkflowGraph {
    pub(crate) graph: StableDiGraph<Node, EdgeKind>,
    pub(crate) root: NodeIndex,
    pub(crate) tag_index: TagIndexMap,
}

impl WorkflowGraph {
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    pub fn node_by_tag(&self, tag: &str) -> Option<NodeIndex> {
        self.tag_index.get(tag).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Target of the first outgoing edge of the given kind, if any.
    pub fn successor(&self, idx: NodeIndex, kind: &EdgeKind) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .find(|e| e.weight() == kind)
            .map(|e| e.target())
    }

    /// All outgoing edges of a node as `(kind, target)` pairs.
    pub fn outgoing(&self, idx: NodeIndex) -> Vec<(EdgeKind, NodeIndex)> {
        self.graph
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .map(|e| (e.weight().clone(), e.target()))
            .collect()
    }

    /// Pre-execution structural check. Reports every defect found, not
    /// just the first; never raised during a run.
    pub fn validate(&self) -> ValidationReport {
        validate::validate(self)
    }
}
