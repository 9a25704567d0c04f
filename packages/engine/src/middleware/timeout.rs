//! Timeout middleware for operations.
//!
//! Bounds each call by its context's `timeout_ms` and surfaces
//! [`OperationError::Timeout`] when exceeded. The core defines no other
//! cancellation primitive; adapters observe cancellation only as their
//! future being dropped.

use std::time::Duration;

use async_trait::async_trait;

use manifold_core::Value;

use crate::middleware::{Middleware, Next};
use crate::operation::{Operation, OperationError};

/// Middleware enforcing the per-call timeout budget.
#[derive(Debug, Clone, Default)]
pub struct TimeoutMiddleware;

impl TimeoutMiddleware {
    /// Creates the middleware; registered under the name `timeout`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &str {
        "timeout"
    }

    async fn handle(
        &self,
        op: &mut Operation,
        next: Next<'_>,
    ) -> Result<Value, OperationError> {
        let timeout_ms = op.ctx().timeout_ms;
        if timeout_ms == 0 {
            return next.run(op).await;
        }

        let duration = Duration::from_millis(timeout_ms);
        match tokio::time::timeout(duration, next.run(op)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(OperationError::Timeout { timeout_ms }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::middleware::OperationExecutor;
    use crate::operation::{FindArgs, OperationContext};

    /// Executor that takes a configurable delay before responding.
    struct SlowExecutor {
        delay_ms: u64,
    }

    #[async_trait]
    impl OperationExecutor for SlowExecutor {
        async fn execute(&self, _op: &mut Operation) -> Result<Value, OperationError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(Value::Null)
        }
    }

    fn op_with_timeout(timeout_ms: u64) -> Operation {
        Operation::FindOne {
            ctx: OperationContext::new("user").with_timeout_ms(timeout_ms),
            args: FindArgs::new(),
        }
    }

    #[tokio::test]
    async fn completes_within_timeout() {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(TimeoutMiddleware::new())];
        let executor = SlowExecutor { delay_ms: 10 };

        let mut op = op_with_timeout(1_000);
        let result = Next::new(&chain, &executor).run(&mut op).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn exceeding_timeout_returns_error() {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(TimeoutMiddleware::new())];
        let executor = SlowExecutor { delay_ms: 200 };

        let mut op = op_with_timeout(50);
        let err = Next::new(&chain, &executor).run(&mut op).await.unwrap_err();
        assert!(matches!(err, OperationError::Timeout { timeout_ms: 50 }));
    }

    #[tokio::test]
    async fn zero_timeout_disables_the_bound() {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(TimeoutMiddleware::new())];
        let executor = SlowExecutor { delay_ms: 10 };

        let mut op = op_with_timeout(0);
        let result = Next::new(&chain, &executor).run(&mut op).await;
        assert!(result.is_ok());
    }
}
