//! Chain construction: the global middleware list with per-entity
//! exclusions, prebuilt and swapped atomically.
//!
//! Exclusion lists are evaluated once at configuration time, not per call:
//! each configured entity gets its own prebuilt chain, every other entity
//! shares the full chain. Chains live behind an [`ArcSwap`] so concurrent
//! dispatches keep a consistent snapshot while registration replaces them.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use manifold_core::Value;

use crate::middleware::{Middleware, Next, OperationExecutor};
use crate::operation::{Operation, OperationError};

type Chain = Arc<Vec<Arc<dyn Middleware>>>;

/// Prebuilt middleware chains in front of one executor.
pub struct Pipeline {
    /// All registered middlewares in registration order.
    global: Vec<Arc<dyn Middleware>>,
    /// Chain snapshot for the full (no-exclusion) case.
    full_chain: Chain,
    /// Per-entity chains for entities with exclusions.
    chains: ArcSwap<HashMap<String, Chain>>,
    executor: Arc<dyn OperationExecutor>,
}

impl Pipeline {
    /// Creates a pipeline over `middlewares` (registration order preserved).
    #[must_use]
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, executor: Arc<dyn OperationExecutor>) -> Self {
        let full_chain = Arc::new(middlewares.clone());
        Self {
            global: middlewares,
            full_chain,
            chains: ArcSwap::from_pointee(HashMap::new()),
            executor,
        }
    }

    /// Rebuilds the chain for `entity`, dropping middlewares named in
    /// `exclude`. An empty exclusion list restores the full chain.
    pub fn configure_entity(&self, entity: &str, exclude: &[String]) {
        if exclude.is_empty() {
            self.chains.rcu(|current| {
                let mut map = HashMap::clone(current);
                map.remove(entity);
                map
            });
            return;
        }

        let chain: Chain = Arc::new(
            self.global
                .iter()
                .filter(|middleware| !exclude.iter().any(|name| name == middleware.name()))
                .cloned()
                .collect(),
        );
        tracing::debug!(entity, excluded = ?exclude, chain_len = chain.len(), "entity chain built");
        let entity = entity.to_string();
        self.chains.rcu(move |current| {
            let mut map = HashMap::clone(current);
            map.insert(entity.clone(), chain.clone());
            map
        });
    }

    /// The chain snapshot used for `entity`.
    #[must_use]
    pub fn chain_for(&self, entity: &str) -> Chain {
        self.chains
            .load()
            .get(entity)
            .cloned()
            .unwrap_or_else(|| self.full_chain.clone())
    }

    /// Runs `op` through its entity's chain and the executor.
    pub async fn execute(&self, op: &mut Operation) -> Result<Value, OperationError> {
        let chain = self.chain_for(op.entity());
        Next::new(&chain, &*self.executor).run(op).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::operation::{FindArgs, OperationContext};

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recording {
        fn name(&self) -> &str {
            self.label
        }

        async fn handle(
            &self,
            op: &mut Operation,
            next: Next<'_>,
        ) -> Result<Value, OperationError> {
            self.log.lock().push(self.label.to_string());
            next.run(op).await
        }
    }

    struct NullExecutor;

    #[async_trait]
    impl OperationExecutor for NullExecutor {
        async fn execute(&self, _op: &mut Operation) -> Result<Value, OperationError> {
            Ok(Value::Null)
        }
    }

    fn pipeline_with(log: &Arc<Mutex<Vec<String>>>) -> Pipeline {
        let middlewares: Vec<Arc<dyn Middleware>> = ["auth", "trace", "audit"]
            .into_iter()
            .map(|label| {
                Arc::new(Recording {
                    label,
                    log: log.clone(),
                }) as Arc<dyn Middleware>
            })
            .collect();
        Pipeline::new(middlewares, Arc::new(NullExecutor))
    }

    fn op_for(entity: &str) -> Operation {
        Operation::FindMany {
            ctx: OperationContext::new(entity),
            args: FindArgs::new(),
        }
    }

    #[tokio::test]
    async fn unconfigured_entity_uses_full_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(&log);

        pipeline.execute(&mut op_for("user")).await.unwrap();
        assert_eq!(log.lock().clone(), vec!["auth", "trace", "audit"]);
    }

    #[tokio::test]
    async fn exclusion_applies_only_to_the_configured_entity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(&log);
        pipeline.configure_entity("metrics", &["trace".to_string(), "audit".to_string()]);

        pipeline.execute(&mut op_for("metrics")).await.unwrap();
        assert_eq!(log.lock().clone(), vec!["auth"]);

        log.lock().clear();
        pipeline.execute(&mut op_for("user")).await.unwrap();
        assert_eq!(log.lock().clone(), vec!["auth", "trace", "audit"]);
    }

    #[tokio::test]
    async fn empty_exclusion_restores_full_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(&log);
        pipeline.configure_entity("user", &["auth".to_string()]);
        assert_eq!(pipeline.chain_for("user").len(), 2);

        pipeline.configure_entity("user", &[]);
        assert_eq!(pipeline.chain_for("user").len(), 3);
    }
}
