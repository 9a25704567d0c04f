//! Structural schema descriptors for entities.
//!
//! Descriptors are built once at registration time from static metadata and
//! are immutable afterwards. They exist for introspection and documentation;
//! the dispatch core never uses them for runtime validation (that is an
//! adapter concern).

use serde::{Deserialize, Serialize};

/// Kind of a single entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// Nested object value.
    Record,
    Array,
    /// Callable RPC-style action exposed through `call`.
    Action,
}

impl FieldKind {
    /// Lowercase kind name, as used in introspection output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Record => "record",
            FieldKind::Array => "array",
            FieldKind::Action => "action",
        }
    }
}

/// Single field definition within an entity schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Name of the field.
    pub name: String,
    /// Kind of value the field holds.
    pub kind: FieldKind,
    /// Whether the field may be absent.
    #[serde(default)]
    pub optional: bool,
    /// Human-readable description for introspection output.
    #[serde(default)]
    pub description: String,
}

impl FieldDescriptor {
    /// Creates a required field with an empty description.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            description: String::new(),
        }
    }

    /// Marks the field as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Sets the description shown in introspection output.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Structural schema for one entity: a name and its ordered fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDescriptor {
    /// Logical entity name (e.g. `user`, `post`).
    pub name: String,
    /// Field definitions in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Creates a descriptor with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field definition.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Reference to an entity: by name or by full descriptor.
///
/// Callers may hold either a plain name or a descriptor they registered;
/// the router resolves the reference to a name exactly once at its boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef {
    ByName(String),
    ByDescriptor(EntityDescriptor),
}

impl EntityRef {
    /// The entity name this reference resolves to.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            EntityRef::ByName(name) => name,
            EntityRef::ByDescriptor(descriptor) => &descriptor.name,
        }
    }
}

impl From<&str> for EntityRef {
    fn from(name: &str) -> Self {
        EntityRef::ByName(name.to_string())
    }
}

impl From<String> for EntityRef {
    fn from(name: String) -> Self {
        EntityRef::ByName(name)
    }
}

impl From<EntityDescriptor> for EntityRef {
    fn from(descriptor: EntityDescriptor) -> Self {
        EntityRef::ByDescriptor(descriptor)
    }
}

impl From<&EntityDescriptor> for EntityRef {
    fn from(descriptor: &EntityDescriptor) -> Self {
        EntityRef::ByDescriptor(descriptor.clone())
    }
}
