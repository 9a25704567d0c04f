//! Filter condition types for entity queries.
//!
//! A [`WhereCondition`] maps field names to constraints. Each constraint is
//! either a literal value (implicit equality) or an operator object carrying
//! any combination of comparison, membership, and string operators. Fields
//! absent from the condition impose no constraint (open-world filter).
//!
//! The JSON shape follows the client convention: comparison operators are
//! `$`-prefixed, string operators are bare camelCase:
//!
//! ```json
//! { "age": { "$gte": 21 }, "name": { "startsWith": "al", "mode": "insensitive" } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Case-sensitivity mode for string operators.
///
/// Defaults to [`StringMode::Sensitive`]; the insensitive mode lower-cases
/// both operands before comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringMode {
    #[default]
    Sensitive,
    Insensitive,
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Operator object for one field of a [`WhereCondition`].
///
/// Every operator is optional; all present operators must hold for the field
/// to match. `deny_unknown_fields` keeps the untagged [`FieldCondition`]
/// decoder from mistaking an arbitrary object literal for an operator set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operators {
    #[serde(rename = "$eq", skip_serializing_if = "Option::is_none", default)]
    pub eq: Option<Value>,
    #[serde(rename = "$ne", skip_serializing_if = "Option::is_none", default)]
    pub ne: Option<Value>,
    #[serde(rename = "$gt", skip_serializing_if = "Option::is_none", default)]
    pub gt: Option<Value>,
    #[serde(rename = "$gte", skip_serializing_if = "Option::is_none", default)]
    pub gte: Option<Value>,
    #[serde(rename = "$lt", skip_serializing_if = "Option::is_none", default)]
    pub lt: Option<Value>,
    #[serde(rename = "$lte", skip_serializing_if = "Option::is_none", default)]
    pub lte: Option<Value>,
    #[serde(rename = "$in", skip_serializing_if = "Option::is_none", default)]
    pub r#in: Option<Vec<Value>>,
    #[serde(rename = "$nin", skip_serializing_if = "Option::is_none", default)]
    pub nin: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub contains: Option<String>,
    #[serde(rename = "startsWith", skip_serializing_if = "Option::is_none", default)]
    pub starts_with: Option<String>,
    #[serde(rename = "endsWith", skip_serializing_if = "Option::is_none", default)]
    pub ends_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub not: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<StringMode>,
}

impl Operators {
    /// Creates an empty operator set (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, value: impl Into<Value>) -> Self {
        self.eq = Some(value.into());
        self
    }

    #[must_use]
    pub fn ne(mut self, value: impl Into<Value>) -> Self {
        self.ne = Some(value.into());
        self
    }

    #[must_use]
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    #[must_use]
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    #[must_use]
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    #[must_use]
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    #[must_use]
    pub fn is_in(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.r#in = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn not_in(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.nin = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    #[must_use]
    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.starts_with = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn ends_with(mut self, suffix: impl Into<String>) -> Self {
        self.ends_with = Some(suffix.into());
        self
    }

    #[must_use]
    pub fn not(mut self, value: impl Into<Value>) -> Self {
        self.not = Some(value.into());
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: StringMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Constraint on a single field: a literal (implicit equality) or operators.
///
/// Untagged: an object that parses as [`Operators`] is an operator set,
/// anything else (including arbitrary objects) is a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldCondition {
    Operators(Operators),
    Literal(Value),
}

impl From<Operators> for FieldCondition {
    fn from(ops: Operators) -> Self {
        FieldCondition::Operators(ops)
    }
}

impl From<Value> for FieldCondition {
    fn from(value: Value) -> Self {
        FieldCondition::Literal(value)
    }
}

impl From<bool> for FieldCondition {
    fn from(value: bool) -> Self {
        FieldCondition::Literal(value.into())
    }
}

impl From<i64> for FieldCondition {
    fn from(value: i64) -> Self {
        FieldCondition::Literal(value.into())
    }
}

impl From<f64> for FieldCondition {
    fn from(value: f64) -> Self {
        FieldCondition::Literal(value.into())
    }
}

impl From<&str> for FieldCondition {
    fn from(value: &str) -> Self {
        FieldCondition::Literal(value.into())
    }
}

impl From<String> for FieldCondition {
    fn from(value: String) -> Self {
        FieldCondition::Literal(value.into())
    }
}

/// Filter over entity records: field name to constraint.
///
/// An empty condition matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhereCondition(pub BTreeMap<String, FieldCondition>);

impl WhereCondition {
    /// Creates an empty condition (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint for `field`, replacing any existing one.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, condition: impl Into<FieldCondition>) -> Self {
        self.0.insert(field.into(), condition.into());
        self
    }

    /// Whether the condition constrains no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(field, constraint)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldCondition)> {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
