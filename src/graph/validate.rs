//! Structural validation: reachability, dangling references, duplicate
//! tags. Runs before execution; a graph that validates cleanly cannot
//! hit a structural error at run time.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

use super::node::{EdgeKind, NodeKind};
use super::WorkflowGraph;

/// Severity level of a validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: String,
    pub message: String,
    pub node: Option<String>,
}

/// Aggregated result of graph validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Return only the error-level diagnostics.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .collect()
    }

    /// Return only the warning-level diagnostics.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .collect()
    }
}

pub(crate) fn validate(wg: &WorkflowGraph) -> ValidationReport {
    let mut diags = Vec::new();

    check_duplicate_tags(wg, &mut diags);
    check_node_edges(wg, &mut diags);
    check_reachability(wg, &mut diags);
    check_structural_cycles(wg, &mut diags);

    let is_valid = !diags.iter().any(|d| d.level == DiagnosticLevel::Error);
    ValidationReport {
        is_valid,
        diagnostics: diags,
    }
}

fn check_duplicate_tags(wg: &WorkflowGraph, diags: &mut Vec<Diagnostic>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for idx in wg.graph.node_indices() {
        if let Some(tag) = wg.graph[idx].tag.as_deref() {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }
    for (tag, count) in counts {
        if count > 1 {
            diags.push(error(
                "E201",
                format!("Duplicate tag: {}", tag),
                Some(tag.to_string()),
            ));
        }
    }
}

fn check_node_edges(wg: &WorkflowGraph, diags: &mut Vec<Diagnostic>) {
    for idx in wg.graph.node_indices() {
        let node = &wg.graph[idx];
        match &node.kind {
            NodeKind::Jump { target } => {
                if wg.successor(idx, &EdgeKind::Jump).is_none() {
                    diags.push(error(
                        "E202",
                        format!("Jump target not found: {}", target),
                        Some(node.name().to_string()),
                    ));
                }
            }
            NodeKind::Fork { .. } => {
                if wg.successor(idx, &EdgeKind::IfTrue).is_none() {
                    diags.push(error(
                        "E203",
                        format!("Fork '{}' has no true branch", node.name()),
                        Some(node.name().to_string()),
                    ));
                }
            }
            NodeKind::Exit { .. } => {
                if !wg.outgoing(idx).is_empty() {
                    diags.push(error(
                        "E204",
                        format!("Exit '{}' has outgoing edges", node.name()),
                        Some(node.name().to_string()),
                    ));
                }
            }
            _ => {}
        }
    }
}

/// BFS from the root over all edges (jumps included). Tracks a visited
/// set so cyclic graphs terminate.
fn check_reachability(wg: &WorkflowGraph, diags: &mut Vec<Diagnostic>) {
    let mut reachable: HashSet<NodeIndex> = HashSet::new();
    let mut queue = VecDeque::new();
    reachable.insert(wg.root);
    queue.push_back(wg.root);

    while let Some(idx) = queue.pop_front() {
        for (_, target) in wg.outgoing(idx) {
            if reachable.insert(target) {
                queue.push_back(target);
            }
        }
    }

    for idx in wg.graph.node_indices() {
        if !reachable.contains(&idx) {
            let node = &wg.graph[idx];
            diags.push(warn(
                "W201",
                format!("Unreachable node: {}", node.name()),
                Some(node.name().to_string()),
            ));
        }
    }
}

/// Cycles are permitted only via explicit jumps, never via next/branch
/// back-references. Tri-color DFS over the non-jump edges.
fn check_structural_cycles(wg: &WorkflowGraph, diags: &mut Vec<Diagnostic>) {
    let mut state: HashMap<NodeIndex, u8> = HashMap::new();
    for idx in wg.graph.node_indices() {
        state.insert(idx, 0);
    }

    let mut stack: Vec<NodeIndex> = Vec::new();
    let indices: Vec<NodeIndex> = wg.graph.node_indices().collect();
    for idx in indices {
        if state.get(&idx).copied().unwrap_or(0) == 0 {
            dfs(wg, idx, &mut state, &mut stack, diags);
        }
    }
}

fn dfs(
    wg: &WorkflowGraph,
    idx: NodeIndex,
    state: &mut HashMap<NodeIndex, u8>,
    stack: &mut Vec<NodeIndex>,
    diags: &mut Vec<Diagnostic>,
) {
    state.insert(idx, 1);
    stack.push(idx);

    for (kind, target) in wg.outgoing(idx) {
        if kind == EdgeKind::Jump {
            continue;
        }
        match state.get(&target).copied().unwrap_or(0) {
            0 => dfs(wg, target, state, stack, diags),
            1 => {
                if let Some(pos) = stack.iter().position(|n| *n == target) {
                    let mut path: Vec<String> = stack[pos..]
                        .iter()
                        .map(|n| wg.graph[*n].name().to_string())
                        .collect();
                    path.push(wg.graph[target].name().to_string());
                    diags.push(error(
                        "E205",
                        format!("Cycle without jump: {}", path.join(" -> ")),
                        Some(wg.graph[target].name().to_string()),
                    ));
                }
            }
            _ => {}
        }
    }

    stack.pop();
    state.insert(idx, 2);
}

fn error(code: &str, message: String, node: Option<String>) -> Diagnostic {
    Diagnostic {
        level: DiagnosticLevel::Error,
        code: code.to_string(),
        message,
        node,
    }
}

fn warn(code: &str, message: String, node: Option<String>) -> Diagnostic {
    Diagnostic {
        level: DiagnosticLevel::Warning,
        code: code.to_string(),
        message,
        node,
    }
}
