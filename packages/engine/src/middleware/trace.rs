//! Tracing middleware for operations.
//!
//! Records operation duration and outcome using `tracing` spans; the
//! closest observer to the adapter when registered last.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{info_span, Instrument};

use manifold_core::Value;

use crate::middleware::{Middleware, Next};
use crate::operation::{Operation, OperationError};

/// Middleware that instruments operations with timing and outcome fields.
#[derive(Debug, Clone, Default)]
pub struct TraceMiddleware;

impl TraceMiddleware {
    /// Creates the middleware; registered under the name `trace`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for TraceMiddleware {
    fn name(&self) -> &str {
        "trace"
    }

    async fn handle(
        &self,
        op: &mut Operation,
        next: Next<'_>,
    ) -> Result<Value, OperationError> {
        let entity = op.entity().to_string();
        let operation = op.kind();
        let call_id = op.ctx().call_id;

        let span = info_span!(
            "operation",
            entity = %entity,
            operation = %operation,
            call_id = %call_id,
        );

        async move {
            let start = Instant::now();
            let result = next.run(op).await;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            let outcome = match &result {
                Ok(_) => "ok",
                Err(_) => "error",
            };
            tracing::info!(
                entity = %entity,
                operation = %operation,
                duration_ms,
                outcome,
                "operation complete"
            );

            result
        }
        .instrument(span)
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
