use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Typed value held in a [`Context`](super::Context).
///
/// Reads go through the typed accessors on the context; a mismatched
/// read fails with a [`ContextError`](crate::error::ContextError)
/// instead of an unchecked cast.
#[derive(Debug, Clone)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Array(Vec<ContextValue>),
    Object(HashMap<String, ContextValue>),
}

impl ContextValue {
    /// Name of the value's type, used in type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            ContextValue::Null => "null",
            ContextValue::Bool(_) => "bool",
            ContextValue::Integer(_) => "integer",
            ContextValue::Float(_) => "float",
            ContextValue::Text(_) => "text",
            ContextValue::Array(_) => "array",
            ContextValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ContextValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ContextValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ContextValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer values widen losslessly; everything else is a mismatch.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ContextValue::Float(f) => Some(*f),
            ContextValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContextValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ContextValue]> {
        match self {
            ContextValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, ContextValue>> {
        match self {
            ContextValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convert to `serde_json::Value`.
    pub fn to_json(&self) -> Value {
        match self {
            ContextValue::Null => Value::Null,
            ContextValue::Bool(b) => Value::Bool(*b),
            ContextValue::Integer(i) => serde_json::json!(*i),
            ContextValue::Float(f) => serde_json::json!(*f),
            ContextValue::Text(s) => Value::String(s.clone()),
            ContextValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            ContextValue::Object(map) => {
                let m: serde_json::Map<String, Value> =
                    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                Value::Object(m)
            }
        }
    }

    /// Create from `serde_json::Value`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ContextValue::Null,
            Value::Bool(b) => ContextValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ContextValue::Integer(i)
                } else {
                    ContextValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => ContextValue::Text(s.clone()),
            Value::Array(items) => {
                ContextValue::Array(items.iter().map(ContextValue::from_json).collect())
            }
            Value::Object(map) => {
                let m: HashMap<String, ContextValue> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), ContextValue::from_json(v)))
                    .collect();
                ContextValue::Object(m)
            }
        }
    }
}

impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ContextValue::Null, ContextValue::Null) => true,
            (ContextValue::Bool(a), ContextValue::Bool(b)) => a == b,
            (ContextValue::Integer(a), ContextValue::Integer(b)) => a == b,
            (ContextValue::Float(a), ContextValue::Float(b)) => (a - b).abs() < 1e-10,
            (ContextValue::Integer(a), ContextValue::Float(b))
            | (ContextValue::Float(b), ContextValue::Integer(a)) => (*a as f64 - b).abs() < 1e-10,
            (ContextValue::Text(a), ContextValue::Text(b)) => a == b,
            (ContextValue::Array(a), ContextValue::Array(b)) => a == b,
            (ContextValue::Object(a), ContextValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextValue::Null => Ok(()),
            ContextValue::Bool(b) => write!(f, "{}", b),
            ContextValue::Integer(i) => write!(f, "{}", i),
            ContextValue::Float(v) => write!(f, "{}", v),
            ContextValue::Text(s) => write!(f, "{}", s),
            other => write!(
                f,
                "{}",
                serde_json::to_string(&other.to_json()).unwrap_or_default()
            ),
        }
    }
}

impl Serialize for ContextValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContextValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        Ok(ContextValue::from_json(&v))
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        ContextValue::Integer(i)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        ContextValue::Integer(i as i64)
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        ContextValue::Float(f)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}
