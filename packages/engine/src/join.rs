//! Post-fetch relation loading.
//!
//! A [`RelationResolver`] receives the whole primary batch once per
//! requested relation field — not once per record — so it can perform a
//! single batched lookup (e.g. `where userId in [...]`) instead of N+1
//! queries. How related values correlate back onto the primaries is the
//! resolver's own business; the engine only guarantees the batching shape.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use manifold_core::{Record, Value};

use crate::operation::OperationError;

/// Batched loader for one relation field.
#[async_trait]
pub trait RelationResolver: Send + Sync {
    /// Loads related data for the whole batch and attaches it onto each
    /// primary record.
    async fn attach(&self, field: &str, primaries: &mut [Record]) -> Result<(), OperationError>;
}

/// Per-entity map of relation field to resolver.
pub struct RelationRegistry {
    relations: DashMap<String, HashMap<String, Arc<dyn RelationResolver>>>,
}

impl RelationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            relations: DashMap::new(),
        }
    }

    /// Registers `resolver` for `entity.field`, replacing any existing one.
    pub fn register(
        &self,
        entity: &str,
        field: &str,
        resolver: Arc<dyn RelationResolver>,
    ) {
        self.relations
            .entry(entity.to_string())
            .or_default()
            .insert(field.to_string(), resolver);
    }

    /// The resolver for `entity.field`, if registered.
    #[must_use]
    pub fn resolver_for(&self, entity: &str, field: &str) -> Option<Arc<dyn RelationResolver>> {
        self.relations
            .get(entity)
            .and_then(|fields| fields.get(field).cloned())
    }

    /// Attaches every requested relation onto `records`, one resolver call
    /// per field in request order.
    ///
    /// # Errors
    ///
    /// `BadRequest` when an include names an unregistered relation.
    pub async fn attach_includes(
        &self,
        entity: &str,
        include: &[String],
        records: &mut [Record],
    ) -> Result<(), OperationError> {
        for field in include {
            let resolver = self.resolver_for(entity, field).ok_or_else(|| {
                OperationError::bad_request(format!(
                    "unknown relation '{field}' on entity '{entity}'"
                ))
            })?;
            resolver.attach(field, records).await?;
        }
        Ok(())
    }

    /// Attaches requested relations onto a normalized dispatch result.
    ///
    /// A single record joins as a batch of one; an array joins in place when
    /// every element is a record. Non-record results (null, scalars, mixed
    /// arrays) pass through untouched — there is nothing to correlate.
    pub async fn attach_to_result(
        &self,
        entity: &str,
        include: &[String],
        result: &mut Value,
    ) -> Result<(), OperationError> {
        if include.is_empty() {
            return Ok(());
        }
        match result {
            Value::Map(record) => {
                let mut batch = vec![std::mem::take(record)];
                self.attach_includes(entity, include, &mut batch).await?;
                *record = batch.into_iter().next().unwrap_or_default();
                Ok(())
            }
            Value::Array(items) if items.iter().all(|item| matches!(item, Value::Map(_))) => {
                let mut batch: Vec<Record> = items
                    .iter_mut()
                    .map(|item| match item {
                        Value::Map(record) => std::mem::take(record),
                        _ => Record::new(),
                    })
                    .collect();
                self.attach_includes(entity, include, &mut batch).await?;
                *items = batch.into_iter().map(Value::Map).collect();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Default for RelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
