//! Source adapter trait and fallback factory.
//!
//! A [`SourceAdapter`] implements the CRUD-style operations for one physical
//! backend. Every method has a default body returning
//! [`OperationError::NotImplemented`], so partial adapters are natural: the
//! router maps a missing `upsert` onto the generic find-then-branch
//! combinator and surfaces every other gap to the caller as-is.
//!
//! Adapters are shared as `Arc<dyn SourceAdapter>` across concurrent calls.

mod memory;
mod upsert;

pub use memory::MemoryAdapter;
pub use upsert::upsert_via_find;

use std::sync::Arc;

use async_trait::async_trait;

use manifold_core::{Record, Value};

use crate::operation::{
    CallArgs, CreateArgs, CreateManyArgs, DeleteArgs, FindArgs, OperationContext, OperationError,
    OperationKind, UpdateArgs, UpsertArgs,
};

/// CRUD-style operations for one physical backend.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The source name this adapter serves (e.g. `memory`, `db`).
    fn name(&self) -> &str;

    /// `NotImplemented` error for an operation this adapter lacks.
    fn unsupported(&self, operation: OperationKind) -> OperationError {
        OperationError::NotImplemented {
            operation,
            source_name: self.name().to_string(),
        }
    }

    /// Returns the first record matching `args`, or `None`.
    async fn find_one(
        &self,
        _args: &FindArgs,
        _ctx: &OperationContext,
    ) -> Result<Option<Record>, OperationError> {
        Err(self.unsupported(OperationKind::FindOne))
    }

    /// Returns every record matching `args`, sorted and paginated.
    async fn find_many(
        &self,
        _args: &FindArgs,
        _ctx: &OperationContext,
    ) -> Result<Vec<Record>, OperationError> {
        Err(self.unsupported(OperationKind::FindMany))
    }

    /// Inserts one record, returning it as stored.
    async fn create(
        &self,
        _args: &CreateArgs,
        _ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        Err(self.unsupported(OperationKind::Create))
    }

    /// Inserts several records, returning them as stored.
    async fn create_many(
        &self,
        _args: &CreateManyArgs,
        _ctx: &OperationContext,
    ) -> Result<Vec<Record>, OperationError> {
        Err(self.unsupported(OperationKind::CreateMany))
    }

    /// Merges the patch onto the first matching record and returns it.
    async fn update(
        &self,
        _args: &UpdateArgs,
        _ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        Err(self.unsupported(OperationKind::Update))
    }

    /// Merges the patch onto every matching record, returning them.
    async fn update_many(
        &self,
        _args: &UpdateArgs,
        _ctx: &OperationContext,
    ) -> Result<Vec<Record>, OperationError> {
        Err(self.unsupported(OperationKind::UpdateMany))
    }

    /// Removes the first matching record and returns it.
    async fn delete(
        &self,
        _args: &DeleteArgs,
        _ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        Err(self.unsupported(OperationKind::Delete))
    }

    /// Update-if-exists-else-create.
    ///
    /// Adapters backed by a real store should override this with a native
    /// atomic upsert; the default defers to the router's best-effort
    /// find-then-branch combinator.
    async fn upsert(
        &self,
        _args: &UpsertArgs,
        _ctx: &OperationContext,
    ) -> Result<Record, OperationError> {
        Err(self.unsupported(OperationKind::Upsert))
    }

    /// Free-form RPC escape hatch.
    ///
    /// May return a structured value, or hand off to a raw streaming handle
    /// when `ctx.transport` is present.
    async fn call(
        &self,
        _args: &CallArgs,
        _ctx: &OperationContext,
    ) -> Result<Value, OperationError> {
        Err(self.unsupported(OperationKind::Call))
    }
}

/// Fallback factory consulted when no explicit binding covers an
/// entity/source pair.
///
/// Factories are tried in registration order; the first one returning an
/// adapter wins.
pub trait AdapterFactory: Send + Sync {
    /// Creates an adapter for the pair, or declines with `None`.
    fn create(&self, entity: &str, source: &str) -> Option<Arc<dyn SourceAdapter>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adapter that only implements `find_one`.
    struct ProbeOnly;

    #[async_trait]
    impl SourceAdapter for ProbeOnly {
        fn name(&self) -> &str {
            "probe"
        }

        async fn find_one(
            &self,
            _args: &FindArgs,
            _ctx: &OperationContext,
        ) -> Result<Option<Record>, OperationError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn unimplemented_methods_default_to_not_implemented() {
        let adapter = ProbeOnly;
        let ctx = OperationContext::new("user");

        let found = adapter.find_one(&FindArgs::new(), &ctx).await.unwrap();
        assert!(found.is_none());

        let err = adapter
            .create(&CreateArgs::default(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::NotImplemented {
                operation: OperationKind::Create,
                ref source_name,
            } if source_name == "probe"
        ));
    }
}
