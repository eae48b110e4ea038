use thiserror::Error;

/// Graph construction errors, surfaced while building — before any
/// validation or execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Duplicate tag: {0}")]
    DuplicateTag(String),
    #[error("Empty branch under '{node}': a branch must compose at least one node")]
    EmptyBranch { node: String },
    #[error("Fork '{node}' has no true branch")]
    MissingTrueBranch { node: String },
    #[error("Duplicate case key '{key}' on '{node}'")]
    DuplicateCaseKey { node: String, key: String },
    #[error("Workflow has no nodes")]
    EmptyWorkflow,
}
