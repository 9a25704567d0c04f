//! Entity schema registry and the `schema` pseudo-entity.
//!
//! The registry owns one immutable [`EntityDescriptor`] per entity plus the
//! introspection view of its sources. Registration is idempotent by name
//! (last write wins) and expected to happen once at startup.
//!
//! [`SchemaAdapter`] serves the registry itself through the ordinary
//! `findOne`/`findMany` contract under the reserved entity name
//! [`SCHEMA_ENTITY`], so any client can introspect at runtime without a
//! separate protocol.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use manifold_core::{matches, paginate, sort_records, EntityDescriptor, Record, Value};

use crate::adapter::SourceAdapter;
use crate::operation::{FindArgs, OperationContext, OperationError};

/// Reserved name of the introspection pseudo-entity.
pub const SCHEMA_ENTITY: &str = "schema";

#[derive(Debug, Clone, Default)]
struct SourceInfo {
    sources: Vec<String>,
    default: Option<String>,
}

/// Process-wide map of entity name to schema and source metadata.
pub struct SchemaRegistry {
    entities: DashMap<String, Arc<EntityDescriptor>>,
    sources: DashMap<String, SourceInfo>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            sources: DashMap::new(),
        }
    }

    /// Registers `descriptor`, replacing any previous one with the same name.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for the reserved name [`SCHEMA_ENTITY`].
    pub fn register(&self, descriptor: EntityDescriptor) -> Result<(), OperationError> {
        if descriptor.name == SCHEMA_ENTITY {
            return Err(OperationError::bad_request(format!(
                "entity name '{SCHEMA_ENTITY}' is reserved"
            )));
        }
        tracing::debug!(entity = %descriptor.name, "schema registered");
        self.entities
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Records the introspection view of an entity's sources.
    pub fn record_sources(&self, entity: &str, sources: Vec<String>, default: Option<String>) {
        self.sources
            .insert(entity.to_string(), SourceInfo { sources, default });
    }

    /// The descriptor registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<EntityDescriptor>> {
        self.entities.get(name).map(|entry| entry.value().clone())
    }

    /// All registered descriptors, ordered by entity name.
    #[must_use]
    pub fn schemas(&self) -> Vec<Arc<EntityDescriptor>> {
        let mut all: Vec<Arc<EntityDescriptor>> = self
            .entities
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// The sources registered for `name`, in registration order.
    #[must_use]
    pub fn sources_of(&self, name: &str) -> Vec<String> {
        self.sources
            .get(name)
            .map(|entry| entry.value().sources.clone())
            .unwrap_or_default()
    }

    /// One introspection record per registered entity, ordered by name.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.schemas()
            .iter()
            .map(|descriptor| {
                let info = self
                    .sources
                    .get(&descriptor.name)
                    .map(|entry| entry.value().clone())
                    .unwrap_or_default();

                let fields: Vec<Value> = descriptor
                    .fields
                    .iter()
                    .map(|field| {
                        Value::Map(Record::from([
                            ("name".to_string(), Value::from(field.name.as_str())),
                            ("kind".to_string(), Value::from(field.kind.as_str())),
                            ("optional".to_string(), Value::Bool(field.optional)),
                            (
                                "description".to_string(),
                                Value::from(field.description.as_str()),
                            ),
                        ]))
                    })
                    .collect();

                Record::from([
                    ("name".to_string(), Value::from(descriptor.name.as_str())),
                    ("fields".to_string(), Value::Array(fields)),
                    (
                        "sources".to_string(),
                        Value::Array(info.sources.iter().map(|s| Value::from(s.as_str())).collect()),
                    ),
                    ("defaultSource".to_string(), Value::from(info.default)),
                ])
            })
            .collect()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// SchemaAdapter
// ---------------------------------------------------------------------------

/// Read-only adapter serving the registry under [`SCHEMA_ENTITY`].
///
/// Only `findOne` and `findMany` are implemented; every mutation reports
/// `NotImplemented` through the default trait bodies.
pub struct SchemaAdapter {
    registry: Arc<SchemaRegistry>,
}

impl SchemaAdapter {
    /// Wraps a registry under the source name `registry`.
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    fn select(&self, args: &FindArgs) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .registry
            .records()
            .into_iter()
            .filter(|record| args.r#where.as_ref().is_none_or(|cond| matches(record, cond)))
            .collect();
        if let Some(order_by) = &args.order_by {
            sort_records(&mut records, order_by);
        }
        records
    }
}

#[async_trait]
impl SourceAdapter for SchemaAdapter {
    fn name(&self) -> &str {
        "registry"
    }

    async fn find_one(
        &self,
        args: &FindArgs,
        _ctx: &OperationContext,
    ) -> Result<Option<Record>, OperationError> {
        Ok(self.select(args).into_iter().next())
    }

    async fn find_many(
        &self,
        args: &FindArgs,
        _ctx: &OperationContext,
    ) -> Result<Vec<Record>, OperationError> {
        Ok(paginate(self.select(args), args.offset, args.limit))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
