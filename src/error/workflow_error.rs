//! Workflow-level error types.

use thiserror::Error;

use crate::graph::validate::ValidationReport;

use super::NodeError;

/// Workflow-level errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Validation failed")]
    ValidationFailed(Box<ValidationReport>),
    #[error("Node execution error: node={node}, error={source}")]
    NodeExecution {
        node: String,
        #[source]
        source: NodeError,
    },
    #[error("Workflow aborted")]
    Aborted,
    #[error("Unresolved jump target: {0}")]
    UnresolvedJump(String),
    #[error("Context already disposed")]
    ContextDisposed,
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::validate::ValidationReport;

    #[test]
    fn test_workflow_error_display() {
        assert_eq!(WorkflowError::Aborted.to_string(), "Workflow aborted");
        assert_eq!(
            WorkflowError::UnresolvedJump("retry-point".into()).to_string(),
            "Unresolved jump target: retry-point"
        );
        assert_eq!(
            WorkflowError::ContextDisposed.to_string(),
            "Context already disposed"
        );
        assert_eq!(
            WorkflowError::Internal("ie".into()).to_string(),
            "Internal error: ie"
        );
    }

    #[test]
    fn test_workflow_error_node_execution() {
        let err = WorkflowError::NodeExecution {
            node: "fetch".into(),
            source: NodeError::execution("connection refused"),
        };
        let msg = err.to_string();
        assert!(msg.contains("fetch"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_workflow_error_validation_failed() {
        let report = ValidationReport {
            is_valid: true,
            diagnostics: vec![],
        };
        let err = WorkflowError::ValidationFailed(Box::new(report));
        assert_eq!(err.to_string(), "Validation failed");
    }
}
