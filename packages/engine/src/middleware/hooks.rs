//! Lifecycle hooks packaged as one middleware.
//!
//! [`HookBuilder`] collects named callbacks (`before_create`, `after_update`,
//! wildcard `before_any`/`after_any`, ...) and produces a [`HookMiddleware`].
//! Before-hooks run prior to the rest of the chain, after-hooks run only
//! once it resolves successfully, and hooks for non-matching operations are
//! no-ops. Hooks observe — they never rewrite arguments or results — but a
//! hook returning an error aborts the call. Gates that shape control flow
//! belong in ordinary middlewares.

use async_trait::async_trait;

use manifold_core::Value;

use crate::middleware::{Middleware, Next};
use crate::operation::{Operation, OperationError, OperationKind};

/// Observer invoked before the operation runs.
pub type BeforeHook = Box<dyn Fn(&Operation) -> Result<(), OperationError> + Send + Sync>;

/// Observer invoked with the result after the operation succeeds.
pub type AfterHook = Box<dyn Fn(&Operation, &Value) -> Result<(), OperationError> + Send + Sync>;

/// Operation group a hook subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookStage {
    Create,
    Update,
    Delete,
    Any,
}

impl HookStage {
    /// Whether this stage covers `kind`.
    ///
    /// `upsert` resolves to create-or-update inside the adapter, so only
    /// `Any` hooks observe it; reads and `call` likewise.
    fn covers(self, kind: OperationKind) -> bool {
        match self {
            HookStage::Any => true,
            HookStage::Create => {
                matches!(kind, OperationKind::Create | OperationKind::CreateMany)
            }
            HookStage::Update => {
                matches!(kind, OperationKind::Update | OperationKind::UpdateMany)
            }
            HookStage::Delete => matches!(kind, OperationKind::Delete),
        }
    }
}

/// Fluent builder producing one [`HookMiddleware`].
pub struct HookBuilder {
    name: String,
    before: Vec<(HookStage, BeforeHook)>,
    after: Vec<(HookStage, AfterHook)>,
}

impl HookBuilder {
    /// Starts a builder for a middleware registered under `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    fn before(mut self, stage: HookStage, hook: impl Fn(&Operation) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.before.push((stage, Box::new(hook)));
        self
    }

    fn after(mut self, stage: HookStage, hook: impl Fn(&Operation, &Value) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.after.push((stage, Box::new(hook)));
        self
    }

    #[must_use]
    pub fn before_create(self, hook: impl Fn(&Operation) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.before(HookStage::Create, hook)
    }

    #[must_use]
    pub fn after_create(self, hook: impl Fn(&Operation, &Value) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.after(HookStage::Create, hook)
    }

    #[must_use]
    pub fn before_update(self, hook: impl Fn(&Operation) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.before(HookStage::Update, hook)
    }

    #[must_use]
    pub fn after_update(self, hook: impl Fn(&Operation, &Value) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.after(HookStage::Update, hook)
    }

    #[must_use]
    pub fn before_delete(self, hook: impl Fn(&Operation) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.before(HookStage::Delete, hook)
    }

    #[must_use]
    pub fn after_delete(self, hook: impl Fn(&Operation, &Value) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.after(HookStage::Delete, hook)
    }

    #[must_use]
    pub fn before_any(self, hook: impl Fn(&Operation) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.before(HookStage::Any, hook)
    }

    #[must_use]
    pub fn after_any(self, hook: impl Fn(&Operation, &Value) -> Result<(), OperationError> + Send + Sync + 'static) -> Self {
        self.after(HookStage::Any, hook)
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> HookMiddleware {
        HookMiddleware {
            name: self.name,
            before: self.before,
            after: self.after,
        }
    }
}

/// Middleware running lifecycle hooks around the rest of the chain.
pub struct HookMiddleware {
    name: String,
    before: Vec<(HookStage, BeforeHook)>,
    after: Vec<(HookStage, AfterHook)>,
}

#[async_trait]
impl Middleware for HookMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        op: &mut Operation,
        next: Next<'_>,
    ) -> Result<Value, OperationError> {
        let kind = op.kind();

        for (stage, hook) in &self.before {
            if stage.covers(kind) {
                hook(op)?;
            }
        }

        let result = next.run(op).await?;

        for (stage, hook) in &self.after {
            if stage.covers(kind) {
                hook(op, &result)?;
            }
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
