use thiserror::Error;

/// Typed context access errors.
///
/// A read with a mismatched type fails with a distinct typed error,
/// never an unchecked cast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Key not found: '{key}'")]
    KeyNotFound { key: String },
    #[error("Type mismatch for '{key}': expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: String,
        actual: String,
    },
}

impl ContextError {
    /// A lookup for a key that is not present in the context.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        ContextError::KeyNotFound { key: key.into() }
    }

    /// A typed read whose stored value is a different type than requested.
    pub fn type_mismatch(
        key: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ContextError::TypeMismatch {
            key: key.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
