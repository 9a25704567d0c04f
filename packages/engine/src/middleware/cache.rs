//! Read-through cache middleware.
//!
//! Short-circuits `findOne`/`findMany` for entities with a configured cache
//! policy, keyed by entity, operation, and serialized arguments. Any
//! non-read operation on the entity — including `call`, whose effects are
//! adapter-defined — purges the entity's cached reads after it completes,
//! whether it succeeded or not.

use std::sync::Arc;

use async_trait::async_trait;

use manifold_core::Value;

use crate::cache::CacheStore;
use crate::config::EngineConfig;
use crate::middleware::{Middleware, Next};
use crate::operation::{Operation, OperationError};

/// Middleware caching read results per entity policy.
pub struct CacheMiddleware {
    store: Arc<CacheStore>,
    config: Arc<EngineConfig>,
}

impl CacheMiddleware {
    /// Creates the middleware; registered under the name `cache`.
    #[must_use]
    pub fn new(store: Arc<CacheStore>, config: Arc<EngineConfig>) -> Self {
        Self { store, config }
    }

    /// Cache key for a read, or `None` when the args fail to serialize.
    fn read_key(op: &Operation) -> Option<String> {
        let args = match op {
            Operation::FindOne { args, .. } | Operation::FindMany { args, .. } => {
                serde_json::to_string(args).ok()?
            }
            _ => return None,
        };
        Some(format!("{}:{}:{}", op.entity(), op.kind(), args))
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    fn name(&self) -> &str {
        "cache"
    }

    async fn handle(
        &self,
        op: &mut Operation,
        next: Next<'_>,
    ) -> Result<Value, OperationError> {
        let Some(policy) = self.config.entity(op.entity()).and_then(|entity| entity.cache)
        else {
            return next.run(op).await;
        };

        if op.is_read() {
            let Some(key) = Self::read_key(op) else {
                return next.run(op).await;
            };
            if let Some(hit) = self.store.get(&key) {
                tracing::debug!(entity = %op.entity(), operation = %op.kind(), "cache hit");
                return Ok(hit);
            }
            let result = next.run(op).await?;
            self.store
                .set_with_ttl(key, result.clone(), Some(policy.ttl_ms));
            Ok(result)
        } else {
            let prefix = format!("{}:", op.entity());
            let result = next.run(op).await;
            let purged = self.store.purge_prefix(&prefix);
            if purged > 0 {
                tracing::debug!(entity = %op.entity(), purged, "cache invalidated");
            }
            result
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
