//! In-memory [`SourceAdapter`] backed by a row vector.
//!
//! The reference adapter for tests, mocking, and small datasets. All query
//! semantics come from the shared matcher/sort/paginate primitives, so any
//! other in-memory-style adapter behaves identically.

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use manifold_core::{matches, paginate, sort_records, Record, Value};

use crate::adapter::SourceAdapter;
use crate::operation::{
    CallArgs, CreateArgs, CreateManyArgs, DeleteArgs, FindArgs, OperationContext, OperationError,
    UpdateArgs,
};

/// In-memory adapter storing records in insertion order.
///
/// `create` fills the id field with a fresh UUID string when the incoming
/// record lacks one. `upsert` is deliberately not implemented natively, so
/// the router's find-then-branch combinator covers it.
pub struct MemoryAdapter {
    name: String,
    id_field: String,
    rows: RwLock<Vec<Record>>,
}

impl MemoryAdapter {
    /// Creates an empty adapter serving the source name `memory`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    /// Creates an empty adapter serving the given source name.
    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: "id".to_string(),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Overrides the field treated as the record id.
    #[must_use]
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Seeds the adapter with initial rows.
    #[must_use]
    pub fn with_rows(self, rows: impl IntoIterator<Item = Record>) -> Self {
        self.rows.write().extend(rows);
        self
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn select(&self, args: &FindArgs) -> Vec<Record> {
        let rows = self.rows.read();
        let mut selected: Vec<Record> = rows
            .iter()
            .filter(|row| args.r#where.as_ref().is_none_or(|cond| matches(row, cond)))
            .cloned()
            .collect();
        if let Some(order_by) = &args.order_by {
            sort_records(&mut selected, order_by);
        }
        selected
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Merges `patch` onto `target`, overwriting existing fields.
fn merge(target: &mut Record, patch: &Record) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

#[async_trait]
impl SourceAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        &self.name
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

    async fn create(
        &self,
        args: &CreateArgs,
        _ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        let mut record = args.data.clone();
        record
            .entry(self.id_field.clone())
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        self.rows.write().push(record.clone());
        Ok(record)
    }

    async fn create_many(
        &self,
        args: &CreateManyArgs,
        ctx: &OperationContext,
    ) -> Result<Vec<Record>, OperationError> {
        let mut inserted = Vec::with_capacity(args.data.len());
        for data in &args.data {
            let record = self
                .create(&CreateArgs { data: data.clone() }, ctx)
                .await?;
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn update(
        &self,
        args: &UpdateArgs,
        ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        let mut rows = self.rows.write();
        let hit = rows
            .iter_mut()
            .find(|row| args.r#where.as_ref().is_none_or(|cond| matches(row, cond)));
        match hit {
            Some(row) => {
                merge(row, &args.data);
                Ok(row.clone())
            }
            None => Err(OperationError::NotFound {
                entity: ctx.entity.clone(),
            }),
        }
    }

    async fn update_many(
        &self,
        args: &UpdateArgs,
        _ctx: &OperationContext,
    ) -> Result<Vec<Record>, OperationError> {
        let mut rows = self.rows.write();
        let mut updated = Vec::new();
        for row in rows
            .iter_mut()
            .filter(|row| args.r#where.as_ref().is_none_or(|cond| matches(row, cond)))
        {
            merge(row, &args.data);
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(
        &self,
        args: &DeleteArgs,
        ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        let mut rows = self.rows.write();
        let position = rows
            .iter()
            .position(|row| args.r#where.as_ref().is_none_or(|cond| matches(row, cond)));
        match position {
            Some(index) => Ok(rows.remove(index)),
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
            "count" => {
                let count = i64::try_from(self.rows.read().len()).unwrap_or(i64::MAX);
                Ok(Value::Int(count))
            }
            "clear" => {
                let mut rows = self.rows.write();
                let removed = i64::try_from(rows.len()).unwrap_or(i64::MAX);
                rows.clear();
                Ok(Value::Int(removed))
            }
            other => Err(OperationError::bad_request(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
