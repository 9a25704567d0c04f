//! Generic find-then-branch upsert.
//!
//! Used by the router whenever an adapter reports `upsert` as not
//! implemented. The combinator holds no lock between the probe and the
//! write: two concurrent callers racing on the same key may both observe
//! "not found" and both create. That best-effort window is accepted for
//! simple in-memory and stateless adapters; anything backed by a real store
//! should override `upsert` with a native atomic primitive instead.

use manifold_core::Record;

use crate::adapter::SourceAdapter;
use crate::operation::{CreateArgs, FindArgs, OperationContext, OperationError, UpdateArgs, UpsertArgs};

/// `find_one(where)`; hit ⇒ `update(where, update)`, miss ⇒ `create(create)`.
pub async fn upsert_via_find(
    adapter: &dyn SourceAdapter,
    args: &UpsertArgs,
    ctx: &OperationContext,
) -> Result<Record, OperationError> {
    let probe = FindArgs::new().r#where(args.r#where.clone());
    let existing = adapter.find_one(&probe, ctx).await?;

    if existing.is_some() {
        adapter
            .update(
                &UpdateArgs {
                    r#where: Some(args.r#where.clone()),
                    data: args.update.clone(),
                },
                ctx,
            )
            .await
    } else {
        adapter
            .create(
                &CreateArgs {
                    data: args.create.clone(),
                },
                ctx,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use manifold_core::{Value, WhereCondition};

    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::operation::OperationContext;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn creates_then_updates_without_duplicating() {
        let adapter = MemoryAdapter::new();
        let ctx = OperationContext::new("user");
        let args = UpsertArgs {
            r#where: WhereCondition::new().field("id", 1),
            update: record(&[("name", Value::from("x"))]),
            create: record(&[("id", Value::Int(1)), ("name", Value::from("y"))]),
        };

        // Empty store: the create branch runs.
        let first = upsert_via_find(&adapter, &args, &ctx).await.unwrap();
        assert_eq!(first.get("name"), Some(&Value::from("y")));
        assert_eq!(adapter.len(), 1);

        // Existing record: the update branch merges, no duplicate appears.
        let second = upsert_via_find(&adapter, &args, &ctx).await.unwrap();
        assert_eq!(second.get("name"), Some(&Value::from("x")));
        assert_eq!(second.get("id"), Some(&Value::Int(1)));
        assert_eq!(adapter.len(), 1);
    }
}
