//! [`SourceAdapter`] facade over a [`CacheStore`].
//!
//! Lets the cache participate in dispatch like any other source: `findOne`
//! by key, `create` as set, `delete` as invalidate, plus a `call` surface
//! for stats and purging. The same store can simultaneously back the
//! read-through cache middleware.

use std::sync::Arc;

use async_trait::async_trait;

use manifold_core::{FieldCondition, Record, Value, WhereCondition};

use crate::adapter::SourceAdapter;
use crate::cache::CacheStore;
use crate::operation::{
    CallArgs, CreateArgs, DeleteArgs, FindArgs, OperationContext, OperationError,
};

/// Cache-backed adapter keyed by the `key` field.
pub struct CacheAdapter {
    name: String,
    store: Arc<CacheStore>,
}

impl CacheAdapter {
    /// Wraps a store under the source name `cache`.
    #[must_use]
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            name: "cache".to_string(),
            store,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    fn entry_record(key: &str, value: Value) -> Record {
        Record::from([
            ("key".to_string(), Value::from(key)),
            ("value".to_string(), value),
        ])
    }
}

/// Extracts the literal `key` constraint from a where-condition.
fn key_of(condition: Option<&WhereCondition>) -> Result<String, OperationError> {
    let condition =
        condition.ok_or_else(|| OperationError::bad_request("cache lookup requires a where clause"))?;
    let constraint = condition
        .0
        .get("key")
        .ok_or_else(|| OperationError::bad_request("cache lookup requires a 'key' field"))?;

    let value = match constraint {
        FieldCondition::Literal(value) => Some(value),
        FieldCondition::Operators(ops) => ops.eq.as_ref(),
    };
    match value.and_then(Value::as_str) {
        Some(key) => Ok(key.to_string()),
        None => Err(OperationError::bad_request(
            "cache 'key' must be an equality on a string",
        )),
    }
}

#[async_trait]
impl SourceAdapter for CacheAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(
        &self,
        args: &FindArgs,
        _ctx: &OperationContext,
    ) -> Result<Option<Record>, OperationError> {
        let key = key_of(args.r#where.as_ref())?;
        Ok(self
            .store
            .get(&key)
            .map(|value| Self::entry_record(&key, value)))
    }

    async fn create(
        &self,
        args: &CreateArgs,
        _ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        let key = args
            .data
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| OperationError::bad_request("cache create requires a string 'key'"))?
            .to_string();
        let value = args.data.get("value").cloned().unwrap_or(Value::Null);
        let ttl_ms = match args.data.get("ttlMs") {
            Some(Value::Int(ms)) if *ms >= 0 => Some(u64::try_from(*ms).unwrap_or(0)),
            Some(other) if !other.is_null() => {
                return Err(OperationError::bad_request("'ttlMs' must be an integer"));
            }
            _ => None,
        };

        self.store.set_with_ttl(key.clone(), value.clone(), ttl_ms);
        Ok(Self::entry_record(&key, value))
    }

    async fn delete(
        &self,
        args: &DeleteArgs,
        ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        let key = key_of(args.r#where.as_ref())?;
        match self.store.delete(&key) {
            Some(value) => Ok(Self::entry_record(&key, value)),
            None => Err(OperationError::NotFound {
                entity: ctx.entity.clone(),
            }),
        }
    }

    async fn call(
        &self,
        args: &CallArgs,
        _ctx: &OperationContext,
    ) -> Result<Value, OperationError> {
        match args.action.as_str() {
            "stats" => {
                let stats = self.store.stats();
                let int = |n: u64| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
                Ok(Value::Map(Record::from([
                    ("hits".to_string(), int(stats.hits)),
                    ("misses".to_string(), int(stats.misses)),
                    ("evictions".to_string(), int(stats.evictions)),
                    ("entries".to_string(), int(stats.entries as u64)),
                    ("residentSize".to_string(), int(stats.resident_size)),
                ])))
            }
            "purge" => match args.payload.as_str() {
                Some(prefix) => {
                    let purged = i64::try_from(self.store.purge_prefix(prefix)).unwrap_or(i64::MAX);
                    Ok(Value::Int(purged))
                }
                None => {
                    self.store.clear();
                    Ok(Value::Null)
                }
            },
            other => Err(OperationError::bad_request(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
