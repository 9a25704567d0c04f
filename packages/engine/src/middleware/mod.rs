//! Onion-model middleware around operation execution.
//!
//! A [`Middleware`] wraps a single logical operation invocation. Calling
//! [`Next::run`] invokes the remainder of the chain and yields its result;
//! a middleware may mutate the operation before that call, skip it entirely
//! to short-circuit, replace the returned result, or intercept and remap
//! errors. Execution order equals registration order on the way in and the
//! exact reverse on the way out — nested function composition
//! `m1(m2(m3(core)))`.

pub mod cache;
pub mod hooks;
pub mod pipeline;
pub mod timeout;
pub mod trace;

pub use cache::CacheMiddleware;
pub use hooks::{HookBuilder, HookMiddleware};
pub use pipeline::Pipeline;
pub use timeout::TimeoutMiddleware;
pub use trace::TraceMiddleware;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use manifold_core::Value;

use crate::operation::{Operation, OperationError};

/// Interceptor wrapping one operation invocation.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Unique middleware name, referenced by per-entity `exclude` lists.
    fn name(&self) -> &str;

    /// Handles the operation, usually delegating to `next.run(op)`.
    async fn handle(
        &self,
        op: &mut Operation,
        next: Next<'_>,
    ) -> Result<Value, OperationError>;
}

/// Innermost step of the chain: executes the operation against its adapter.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    /// Runs the operation and returns the normalized result.
    async fn execute(&self, op: &mut Operation) -> Result<Value, OperationError>;
}

/// Continuation representing the remainder of the middleware chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    executor: &'a dyn OperationExecutor,
}

impl<'a> Next<'a> {
    /// Builds the continuation for a full chain in front of `executor`.
    #[must_use]
    pub fn new(chain: &'a [Arc<dyn Middleware>], executor: &'a dyn OperationExecutor) -> Self {
        Self { chain, executor }
    }

    /// Runs the next middleware, or the executor when the chain is empty.
    pub fn run<'b>(
        self,
        op: &'b mut Operation,
    ) -> Pin<Box<dyn Future<Output = Result<Value, OperationError>> + Send + 'b>>
    where
        'a: 'b,
    {
        Box::pin(async move {
            if let Some((head, rest)) = self.chain.split_first() {
                let next = Next {
                    chain: rest,
                    executor: self.executor,
                };
                head.handle(op, next).await
            } else {
                self.executor.execute(op).await
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
