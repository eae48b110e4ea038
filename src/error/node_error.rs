use thiserror::Error;

use super::ContextError;

/// Node-level errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Transient failure: {0}")]
    Transient(String),
    #[error("Interrupted: retry wait cancelled")]
    Interrupted,
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

impl NodeError {
    /// A terminal failure: propagates immediately, never retried.
    pub fn execution(message: impl Into<String>) -> Self {
        NodeError::Execution(message.into())
    }

    /// A retry-eligible failure. The unit of work decides the
    /// classification; the engine never reclassifies.
    pub fn transient(message: impl Into<String>) -> Self {
        NodeError::Transient(message.into())
    }

    /// Whether a [`RetryPolicy`](crate::retry::RetryPolicy) may recover
    /// from this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, NodeError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_display() {
        assert_eq!(
            NodeError::execution("boom").to_string(),
            "Execution error: boom"
        );
        assert_eq!(
            NodeError::transient("503").to_string(),
            "Transient failure: 503"
        );
        assert_eq!(
            NodeError::Interrupted.to_string(),
            "Interrupted: retry wait cancelled"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(NodeError::transient("x").is_transient());
        assert!(!NodeError::execution("x").is_transient());
        assert!(!NodeError::Interrupted.is_transient());
        assert!(!NodeError::from(ContextError::key_not_found("k")).is_transient());
    }

    #[test]
    fn test_from_context_error() {
        let err: NodeError = ContextError::key_not_found("missing").into();
        assert!(matches!(err, NodeError::Context(_)));
        assert!(err.to_string().contains("missing"));
    }
}
