use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Generic runtime value for entity records.
///
/// Supports all JSON-compatible types. Used as the field value type in
/// [`Record`], in where-conditions, and as the normalized result type
/// returned by the dispatch engine.
///
/// Serializes untagged, so a `Value` round-trips through `serde_json`
/// as the plain JSON value it represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (signed 64-bit).
    Int(i64),
    /// JSON floating-point (64-bit IEEE 754).
    Float(f64),
    /// JSON string (UTF-8).
    String(String),
    /// JSON array (ordered sequence of values).
    Array(Vec<Value>),
    /// JSON object (ordered map of string keys to values).
    /// Uses `BTreeMap` for deterministic iteration and serialization order.
    Map(BTreeMap<String, Value>),
}

/// A single entity record: an ordered map of field name to value.
pub type Record = BTreeMap<String, Value>;

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Whether this value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The string slice if this value is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric magnitude if this value is an `Int` or `Float`.
    ///
    /// Both integer and float values map onto `f64`, mirroring the single
    /// number type of the JSON data model the engine speaks.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Value equality with `Int`/`Float` unified numerically.
    ///
    /// `Int(1)` and `Float(1.0)` are the same number; every other comparison
    /// falls back to strict structural equality.
    #[must_use]
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Estimated heap cost of this value in bytes.
    ///
    /// A rough accounting used for size-bounded caching; not an exact
    /// allocator measurement.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        match self {
            Value::Null | Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::String(s) => s.len() as u64,
            Value::Array(items) => items.iter().map(Value::estimated_size).sum::<u64>() + 8,
            Value::Map(entries) => {
                entries
                    .iter()
                    .map(|(k, v)| k.len() as u64 + v.estimated_size())
                    .sum::<u64>()
                    + 8
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
