//! Operation types dispatched through the engine.
//!
//! An [`Operation`] is a tagged union of the nine logical operations, each
//! variant carrying its typed arguments plus the [`OperationContext`] that
//! flows mutably through the middleware chain. Middlewares may rewrite
//! arguments and metadata before the adapter sees them.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use manifold_core::{EntityRef, OrderBy, Record, Value, WhereCondition};

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Discriminant for the nine logical operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    FindOne,
    FindMany,
    Create,
    CreateMany,
    Update,
    UpdateMany,
    Delete,
    Upsert,
    Call,
}

impl OperationKind {
    /// Client-facing operation name (`findOne`, `createMany`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::FindOne => "findOne",
            OperationKind::FindMany => "findMany",
            OperationKind::Create => "create",
            OperationKind::CreateMany => "createMany",
            OperationKind::Update => "update",
            OperationKind::UpdateMany => "updateMany",
            OperationKind::Delete => "delete",
            OperationKind::Upsert => "upsert",
            OperationKind::Call => "call",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Argument types
// ---------------------------------------------------------------------------

/// Arguments for `findOne` and `findMany`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindArgs {
    /// Filter condition; absent means "match everything".
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub r#where: Option<WhereCondition>,
    /// Ordered sort keys applied before pagination.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub order_by: Option<OrderBy>,
    /// Records to skip; zero or absent means none.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offset: Option<usize>,
    /// Maximum records to return; zero or absent means unlimited.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<usize>,
    /// Relation fields to attach to the result via the join resolver.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub include: Vec<String>,
}

impl FindArgs {
    /// Find-everything arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn r#where(mut self, condition: WhereCondition) -> Self {
        self.r#where = Some(condition);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.include.push(field.into());
        self
    }
}

/// Arguments for `create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateArgs {
    /// The record to insert.
    pub data: Record,
}

/// Arguments for `createMany`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateManyArgs {
    /// The records to insert, in order.
    pub data: Vec<Record>,
}

/// Arguments for `update` and `updateMany`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateArgs {
    /// Filter selecting the records to update.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub r#where: Option<WhereCondition>,
    /// Field patch merged onto each matched record.
    pub data: Record,
}

/// Arguments for `delete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteArgs {
    /// Filter selecting the record to delete.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub r#where: Option<WhereCondition>,
}

/// Arguments for `upsert`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsertArgs {
    /// Filter probing for an existing record.
    #[serde(rename = "where")]
    pub r#where: WhereCondition,
    /// Patch applied when the probe finds a record.
    pub update: Record,
    /// Record inserted when the probe finds nothing.
    pub create: Record,
}

/// Arguments for the free-form `call` escape hatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    /// Adapter-defined action name.
    pub action: String,
    /// Arbitrary action payload.
    #[serde(default)]
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// OperationContext
// ---------------------------------------------------------------------------

/// Opaque handle to the calling transport (e.g. a streaming response sink).
///
/// The engine never inspects it; adapters that understand the concrete
/// transport may downcast.
#[derive(Clone)]
pub struct TransportHandle(Arc<dyn Any + Send + Sync>);

impl TransportHandle {
    /// Wraps a transport-specific value.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrows the wrapped value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransportHandle")
    }
}

/// Context carried with every operation through the pipeline.
///
/// Created fresh per call. Middlewares may mutate `metadata` (and, via the
/// owning [`Operation`], the arguments) before the adapter runs.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Unique id for this call, for correlation in logs.
    pub call_id: Uuid,
    /// Resolved entity name.
    pub entity: String,
    /// Explicit source override; `None` selects the entity's default source.
    pub source: Option<String>,
    /// Per-call timeout budget in milliseconds.
    pub timeout_ms: u64,
    /// Open key/value bag for middleware coordination.
    pub metadata: BTreeMap<String, Value>,
    /// Opaque handle to the calling transport, if any.
    pub transport: Option<TransportHandle>,
}

impl OperationContext {
    /// Default per-call timeout, matching [`crate::config::EngineConfig`].
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    /// Creates a context for `entity`, resolving the reference once here at
    /// the boundary.
    #[must_use]
    pub fn new(entity: impl Into<EntityRef>) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            entity: entity.into().name().to_string(),
            source: None,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            metadata: BTreeMap::new(),
            transport: None,
        }
    }

    /// Selects an explicit source instead of the entity default.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Attaches a transport handle.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportHandle) -> Self {
        self.transport = Some(transport);
        self
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Typed operation variants dispatched through the pipeline.
#[derive(Debug, Clone)]
pub enum Operation {
    FindOne { ctx: OperationContext, args: FindArgs },
    FindMany { ctx: OperationContext, args: FindArgs },
    Create { ctx: OperationContext, args: CreateArgs },
    CreateMany { ctx: OperationContext, args: CreateManyArgs },
    Update { ctx: OperationContext, args: UpdateArgs },
    UpdateMany { ctx: OperationContext, args: UpdateArgs },
    Delete { ctx: OperationContext, args: DeleteArgs },
    Upsert { ctx: OperationContext, args: UpsertArgs },
    Call { ctx: OperationContext, args: CallArgs },
}

impl Operation {
    /// The context shared by all variants.
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Operation::FindOne { ctx, .. }
            | Operation::FindMany { ctx, .. }
            | Operation::Create { ctx, .. }
            | Operation::CreateMany { ctx, .. }
            | Operation::Update { ctx, .. }
            | Operation::UpdateMany { ctx, .. }
            | Operation::Delete { ctx, .. }
            | Operation::Upsert { ctx, .. }
            | Operation::Call { ctx, .. } => ctx,
        }
    }

    /// Mutable access to the context for middlewares.
    #[must_use]
    pub fn ctx_mut(&mut self) -> &mut OperationContext {
        match self {
            Operation::FindOne { ctx, .. }
            | Operation::FindMany { ctx, .. }
            | Operation::Create { ctx, .. }
            | Operation::CreateMany { ctx, .. }
            | Operation::Update { ctx, .. }
            | Operation::UpdateMany { ctx, .. }
            | Operation::Delete { ctx, .. }
            | Operation::Upsert { ctx, .. }
            | Operation::Call { ctx, .. } => ctx,
        }
    }

    /// The operation discriminant.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::FindOne { .. } => OperationKind::FindOne,
            Operation::FindMany { .. } => OperationKind::FindMany,
            Operation::Create { .. } => OperationKind::Create,
            Operation::CreateMany { .. } => OperationKind::CreateMany,
            Operation::Update { .. } => OperationKind::Update,
            Operation::UpdateMany { .. } => OperationKind::UpdateMany,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Upsert { .. } => OperationKind::Upsert,
            Operation::Call { .. } => OperationKind::Call,
        }
    }

    /// The entity this operation addresses.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.ctx().entity
    }

    /// Whether this is a pure read (`findOne`/`findMany`).
    ///
    /// `call` is deliberately not a read: its effects are adapter-defined,
    /// so cache layers must treat it as potentially mutating.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, Operation::FindOne { .. } | Operation::FindMany { .. })
    }
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Errors surfaced by operation dispatch.
///
/// The engine never swallows adapter or middleware errors; they unwind the
/// chain and reach the caller unchanged unless a middleware deliberately
/// remaps them.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("no matching record for entity '{entity}'")]
    NotFound { entity: String },
    #[error("no adapter for entity '{entity}' and source {source_name:?}")]
    NoAdapter { entity: String, source_name: Option<String> },
    #[error("operation '{operation}' not implemented by source '{source_name}'")]
    NotImplemented { operation: OperationKind, source_name: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OperationError {
    /// Convenience constructor for argument validation failures.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        OperationError::BadRequest {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
