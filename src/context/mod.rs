//! Execution-scoped key/value store with disposal tracking.
//!
//! A [`Context`] is created fresh per workflow run, mutated by node
//! execution, and disposed exactly once at run termination. Values stay
//! readable after disposal; only registered resources are released.

pub mod value;

pub use value::ContextValue;

use std::collections::HashMap;

use crate::error::ContextError;

/// A resource owned by the context, released exactly once when the
/// context is disposed.
pub trait Disposable: Send {
    fn dispose(&mut self);
}

/// Key/value store shared by every node within a single run.
///
/// Exclusively owned by one run for its entire lifetime; never shared
/// across runs.
#[derive(Default)]
pub struct Context {
    values: HashMap<String, ContextValue>,
    disposables: Vec<Box<dyn Disposable>>,
    disposed: bool,
}

impl Context {
    pub fn new() -> Self {
        Context {
            values: HashMap::new(),
            disposables: Vec::new(),
            disposed: false,
        }
    }

    /// Set a value, replacing any previous entry under the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn lookup(&self, key: &str) -> Result<&ContextValue, ContextError> {
        self.values
            .get(key)
            .ok_or_else(|| ContextError::key_not_found(key))
    }

    /// Read a text value; a value of any other type is a typed error.
    pub fn get_text(&self, key: &str) -> Result<&str, ContextError> {
        let value = self.lookup(key)?;
        value
            .as_text()
            .ok_or_else(|| ContextError::type_mismatch(key, "text", value.type_name()))
    }

    /// Read an integer value; a value of any other type is a typed error.
    pub fn get_integer(&self, key: &str) -> Result<i64, ContextError> {
        let value = self.lookup(key)?;
        value
            .as_integer()
            .ok_or_else(|| ContextError::type_mismatch(key, "integer", value.type_name()))
    }

    /// Read a float value; integers widen, anything else is a typed error.
    pub fn get_float(&self, key: &str) -> Result<f64, ContextError> {
        let value = self.lookup(key)?;
        value
            .as_float()
            .ok_or_else(|| ContextError::type_mismatch(key, "float", value.type_name()))
    }

    /// Read a bool value; a value of any other type is a typed error.
    pub fn get_bool(&self, key: &str) -> Result<bool, ContextError> {
        let value = self.lookup(key)?;
        value
            .as_bool()
            .ok_or_else(|| ContextError::type_mismatch(key, "bool", value.type_name()))
    }

    /// Hand a resource to the context. It is released when the context
    /// is disposed; registering against a disposed context releases the
    /// resource immediately.
    pub fn register_disposable(&mut self, mut resource: Box<dyn Disposable>) {
        if self.disposed {
            resource.dispose();
            return;
        }
        self.disposables.push(resource);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release all registered resources. Idempotent: repeated calls are
    /// no-ops, and each resource is released exactly once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for mut resource in self.disposables.drain(..) {
            resource.dispose();
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values)
            .field("disposables", &self.disposables.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}
