//! Operation routing: the engine entry point.
//!
//! [`Engine::execute`] resolves the entity's middleware chain, runs the
//! operation through it, dispatches the innermost step to the adapter
//! resolved from the registry, applies the upsert fallback, attaches
//! requested joins, and returns the normalized [`Value`] result.
//!
//! The engine is reentrant: per-call state lives in the [`Operation`], and
//! the shared registries are read-mostly after startup. Construction goes
//! through [`Engine::builder`] so embedders and tests can run any number of
//! isolated instances.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use manifold_core::{EntityDescriptor, EntityRef, Value};

use crate::adapter::{upsert_via_find, AdapterFactory, SourceAdapter};
use crate::cache::CacheStore;
use crate::config::EngineConfig;
use crate::join::{RelationRegistry, RelationResolver};
use crate::middleware::{CacheMiddleware, Middleware, OperationExecutor, Pipeline};
use crate::operation::{Operation, OperationContext, OperationError, OperationKind};
use crate::registry::{AdapterRegistry, SchemaAdapter, SchemaRegistry, SCHEMA_ENTITY};

// ---------------------------------------------------------------------------
// AdapterExecutor
// ---------------------------------------------------------------------------

/// Innermost pipeline step: resolves the adapter and invokes the method
/// named by the operation.
struct AdapterExecutor {
    adapters: Arc<AdapterRegistry>,
}

fn records_value(records: Vec<manifold_core::Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Map).collect())
}

#[async_trait]
impl OperationExecutor for AdapterExecutor {
    async fn execute(&self, op: &mut Operation) -> Result<Value, OperationError> {
        let adapter = self
            .adapters
            .resolve(&op.ctx().entity, op.ctx().source.as_deref())?;

        match op {
            Operation::FindOne { ctx, args } => Ok(adapter
                .find_one(args, ctx)
                .await?
                .map_or(Value::Null, Value::Map)),
            Operation::FindMany { ctx, args } => {
                Ok(records_value(adapter.find_many(args, ctx).await?))
            }
            Operation::Create { ctx, args } => Ok(Value::Map(adapter.create(args, ctx).await?)),
            Operation::CreateMany { ctx, args } => {
                Ok(records_value(adapter.create_many(args, ctx).await?))
            }
            Operation::Update { ctx, args } => Ok(Value::Map(adapter.update(args, ctx).await?)),
            Operation::UpdateMany { ctx, args } => {
                Ok(records_value(adapter.update_many(args, ctx).await?))
            }
            Operation::Delete { ctx, args } => Ok(Value::Map(adapter.delete(args, ctx).await?)),
            Operation::Upsert { ctx, args } => match adapter.upsert(args, ctx).await {
                Ok(record) => Ok(Value::Map(record)),
                Err(OperationError::NotImplemented {
                    operation: OperationKind::Upsert,
                    ..
                }) => Ok(Value::Map(
                    upsert_via_find(adapter.as_ref(), args, ctx).await?,
                )),
                Err(err) => Err(err),
            },
            Operation::Call { ctx, args } => adapter.call(args, ctx).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The dispatch engine: registries, pipeline, and cache behind one facade.
pub struct Engine {
    config: Arc<EngineConfig>,
    adapters: Arc<AdapterRegistry>,
    schemas: Arc<SchemaRegistry>,
    relations: Arc<RelationRegistry>,
    cache: Arc<CacheStore>,
    pipeline: Pipeline,
}

impl Engine {
    /// Starts an [`EngineBuilder`].
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Creates an operation context for `entity` carrying the configured
    /// default timeout.
    #[must_use]
    pub fn context(&self, entity: impl Into<EntityRef>) -> OperationContext {
        OperationContext::new(entity).with_timeout_ms(self.config.default_timeout_ms)
    }

    /// Registers an entity: its schema descriptor plus one adapter binding
    /// per source. Re-registration replaces the entity wholesale.
    ///
    /// # Errors
    ///
    /// `BadRequest` for the reserved `schema` entity name.
    pub fn register_entity(
        &self,
        descriptor: EntityDescriptor,
        bindings: Vec<(String, Arc<dyn SourceAdapter>)>,
    ) -> Result<(), OperationError> {
        let entity = descriptor.name.clone();
        self.schemas.register(descriptor)?;
        self.adapters.remove_entity(&entity);

        let sources: Vec<String> = bindings.iter().map(|(source, _)| source.clone()).collect();
        for (source, adapter) in bindings {
            self.adapters.register(&entity, &source, adapter);
        }

        let entity_config = self.config.entity(&entity);
        if let Some(default) = entity_config.and_then(|config| config.default_source.as_deref()) {
            self.adapters.set_default(&entity, default);
        }
        self.schemas
            .record_sources(&entity, sources, self.adapters.default_source(&entity));

        let exclude = entity_config.map(|config| config.exclude.as_slice()).unwrap_or(&[]);
        self.pipeline.configure_entity(&entity, exclude);

        tracing::info!(entity = %entity, "entity registered");
        Ok(())
    }

    /// Appends a global fallback adapter factory.
    pub fn register_factory(&self, factory: Arc<dyn AdapterFactory>) {
        self.adapters.register_factory(factory);
    }

    /// Registers a relation resolver for `entity.field`.
    pub fn register_relation(
        &self,
        entity: &str,
        field: &str,
        resolver: Arc<dyn RelationResolver>,
    ) {
        self.relations.register(entity, field, resolver);
    }

    /// The shared adapter registry.
    #[must_use]
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// The shared schema registry.
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// The shared read-cache store.
    #[must_use]
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Dispatches one operation: pipeline, adapter, then joins.
    ///
    /// # Errors
    ///
    /// Propagates middleware and adapter errors unchanged.
    pub async fn execute(&self, mut op: Operation) -> Result<Value, OperationError> {
        let span = tracing::info_span!(
            "dispatch",
            entity = %op.entity(),
            operation = %op.kind(),
            call_id = %op.ctx().call_id,
        );
        async {
            let mut result = self.pipeline.execute(&mut op).await?;
            if let Operation::FindOne { ctx, args } | Operation::FindMany { ctx, args } = &op {
                self.relations
                    .attach_to_result(&ctx.entity, &args.include, &mut result)
                    .await?;
            }
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

// ---------------------------------------------------------------------------
// EngineBuilder
// ---------------------------------------------------------------------------

enum MiddlewareSlot {
    Custom(Arc<dyn Middleware>),
    /// Placeholder for the built-in read cache, resolved at build time when
    /// the store exists.
    Cache,
}

/// Builder wiring the engine's registries, pipeline, and cache.
pub struct EngineBuilder {
    config: EngineConfig,
    slots: Vec<MiddlewareSlot>,
}

impl EngineBuilder {
    /// Starts with the default configuration and no middlewares.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            slots: Vec::new(),
        }
    }

    /// Replaces the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Appends a middleware; chain order equals call order.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.slots.push(MiddlewareSlot::Custom(Arc::new(middleware)));
        self
    }

    /// Appends the built-in read-through cache middleware at this position.
    #[must_use]
    pub fn cache_middleware(mut self) -> Self {
        self.slots.push(MiddlewareSlot::Cache);
        self
    }

    /// Builds the engine and installs the `schema` pseudo-entity.
    #[must_use]
    pub fn build(self) -> Engine {
        let config = Arc::new(self.config);
        let cache = Arc::new(CacheStore::new(config.cache));

        let middlewares: Vec<Arc<dyn Middleware>> = self
            .slots
            .into_iter()
            .map(|slot| match slot {
                MiddlewareSlot::Custom(middleware) => middleware,
                MiddlewareSlot::Cache => {
                    Arc::new(CacheMiddleware::new(cache.clone(), config.clone())) as Arc<dyn Middleware>
                }
            })
            .collect();

        let adapters = Arc::new(AdapterRegistry::new());
        let schemas = Arc::new(SchemaRegistry::new());
        let relations = Arc::new(RelationRegistry::new());
        let executor = Arc::new(AdapterExecutor {
            adapters: adapters.clone(),
        });
        let pipeline = Pipeline::new(middlewares, executor);

        for (entity, entity_config) in &config.entities {
            pipeline.configure_entity(entity, &entity_config.exclude);
        }

        adapters.register(
            SCHEMA_ENTITY,
            "registry",
            Arc::new(SchemaAdapter::new(schemas.clone())),
        );

        Engine {
            config,
            adapters,
            schemas,
            relations,
            cache,
            pipeline,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use manifold_core::{
        FieldDescriptor, FieldKind, Record, WhereCondition,
    };

    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::config::EntityConfig;
    use crate::middleware::Next;
    use crate::operation::{CreateArgs, FindArgs, UpsertArgs};

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn user_descriptor() -> EntityDescriptor {
        EntityDescriptor::new("user")
            .field(FieldDescriptor::new("id", FieldKind::String))
            .field(FieldDescriptor::new("name", FieldKind::String).optional())
    }

    fn seeded_memory(name: &str, user: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(MemoryAdapter::with_name(name).with_rows([record(&[
            ("id", Value::from("1")),
            ("name", Value::from(user)),
        ])]))
    }

    fn engine_with_two_sources() -> Engine {
        let engine = Engine::builder().build();
        engine
            .register_entity(
                user_descriptor(),
                vec![
                    ("mock".to_string(), seeded_memory("mock", "mock-alice")),
                    ("db".to_string(), seeded_memory("db", "db-alice")),
                ],
            )
            .unwrap();
        engine
    }

    fn find_one_by_id(engine: &Engine, id: &str) -> Operation {
        Operation::FindOne {
            ctx: engine.context("user"),
            args: FindArgs::new().r#where(WhereCondition::new().field("id", id)),
        }
    }

    #[tokio::test]
    async fn omitted_source_resolves_to_default_mock() {
        let engine = engine_with_two_sources();

        let result = engine.execute(find_one_by_id(&engine, "1")).await.unwrap();
        match result {
            Value::Map(map) => assert_eq!(map.get("name"), Some(&Value::from("mock-alice"))),
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn explicit_source_overrides_the_default() {
        let engine = engine_with_two_sources();

        let op = Operation::FindOne {
            ctx: engine.context("user").with_source("db"),
            args: FindArgs::new().r#where(WhereCondition::new().field("id", "1")),
        };
        let result = engine.execute(op).await.unwrap();
        match result {
            Value::Map(map) => assert_eq!(map.get("name"), Some(&Value::from("db-alice"))),
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_one_without_match_is_null() {
        let engine = engine_with_two_sources();
        let result = engine.execute(find_one_by_id(&engine, "404")).await.unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn unknown_entity_is_no_adapter() {
        let engine = Engine::builder().build();
        let op = Operation::FindOne {
            ctx: engine.context("ghost"),
            args: FindArgs::new(),
        };
        let err = engine.execute(op).await.unwrap_err();
        assert!(matches!(err, OperationError::NoAdapter { .. }));
    }

    #[tokio::test]
    async fn upsert_falls_back_to_the_combinator() {
        let engine = Engine::builder().build();
        engine
            .register_entity(
                user_descriptor(),
                vec![("memory".to_string(), Arc::new(MemoryAdapter::new()) as Arc<dyn SourceAdapter>)],
            )
            .unwrap();

        let upsert = |engine: &Engine| Operation::Upsert {
            ctx: engine.context("user"),
            args: UpsertArgs {
                r#where: WhereCondition::new().field("id", 1),
                update: record(&[("name", Value::from("x"))]),
                create: record(&[("id", Value::Int(1)), ("name", Value::from("y"))]),
            },
        };

        let first = engine.execute(upsert(&engine)).await.unwrap();
        match first {
            Value::Map(ref map) => assert_eq!(map.get("name"), Some(&Value::from("y"))),
            ref other => panic!("expected record, got {other:?}"),
        }

        let second = engine.execute(upsert(&engine)).await.unwrap();
        match second {
            Value::Map(map) => {
                assert_eq!(map.get("name"), Some(&Value::from("x")));
                assert_eq!(map.get("id"), Some(&Value::Int(1)));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_operation_surfaces_not_implemented() {
        /// Adapter implementing nothing at all.
        struct Inert;

        #[async_trait]
        impl SourceAdapter for Inert {
            fn name(&self) -> &str {
                "inert"
            }
        }

        let engine = Engine::builder().build();
        engine
            .register_entity(
                user_descriptor(),
                vec![("inert".to_string(), Arc::new(Inert) as Arc<dyn SourceAdapter>)],
            )
            .unwrap();

        let op = Operation::Delete {
            ctx: engine.context("user"),
            args: crate::operation::DeleteArgs::default(),
        };
        let err = engine.execute(op).await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::NotImplemented {
                operation: OperationKind::Delete,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn schema_pseudo_entity_serves_introspection() {
        let engine = engine_with_two_sources();

        let op = Operation::FindOne {
            ctx: engine.context(SCHEMA_ENTITY),
            args: FindArgs::new().r#where(WhereCondition::new().field("name", "user")),
        };
        let result = engine.execute(op).await.unwrap();
        match result {
            Value::Map(map) => {
                assert_eq!(map.get("name"), Some(&Value::from("user")));
                assert_eq!(map.get("defaultSource"), Some(&Value::from("mock")));
                assert_eq!(
                    map.get("sources"),
                    Some(&Value::Array(vec![Value::from("mock"), Value::from("db")]))
                );
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registering_the_reserved_entity_name_fails() {
        let engine = Engine::builder().build();
        let err = engine
            .register_entity(EntityDescriptor::new(SCHEMA_ENTITY), Vec::new())
            .unwrap_err();
        assert!(matches!(err, OperationError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn re_registration_replaces_bindings_wholesale() {
        let engine = engine_with_two_sources();
        engine
            .register_entity(
                user_descriptor(),
                vec![("db".to_string(), seeded_memory("db", "db-only"))],
            )
            .unwrap();

        // The old "mock" binding and default are gone; "db" is the default now.
        let result = engine.execute(find_one_by_id(&engine, "1")).await.unwrap();
        match result {
            Value::Map(map) => assert_eq!(map.get("name"), Some(&Value::from("db-only"))),
            other => panic!("expected record, got {other:?}"),
        }

        let op = Operation::FindOne {
            ctx: engine.context("user").with_source("mock"),
            args: FindArgs::new(),
        };
        let err = engine.execute(op).await.unwrap_err();
        assert!(matches!(err, OperationError::NoAdapter { .. }));
    }

    #[tokio::test]
    async fn configured_default_source_wins_over_registration_order() {
        let config = EngineConfig::default()
            .with_entity("user", EntityConfig::new().default_source("db"));
        let engine = Engine::builder().config(config).build();
        engine
            .register_entity(
                user_descriptor(),
                vec![
                    ("mock".to_string(), seeded_memory("mock", "mock-alice")),
                    ("db".to_string(), seeded_memory("db", "db-alice")),
                ],
            )
            .unwrap();

        let result = engine.execute(find_one_by_id(&engine, "1")).await.unwrap();
        match result {
            Value::Map(map) => assert_eq!(map.get("name"), Some(&Value::from("db-alice"))),
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn per_entity_exclusion_drops_named_middleware() {
        struct Deny;

        #[async_trait]
        impl Middleware for Deny {
            fn name(&self) -> &str {
                "deny"
            }

            async fn handle(
                &self,
                _op: &mut Operation,
                _next: Next<'_>,
            ) -> Result<Value, OperationError> {
                Err(OperationError::Unauthorized)
            }
        }

        let config = EngineConfig::default()
            .with_entity("public", EntityConfig::new().exclude("deny"));
        let engine = Engine::builder().config(config).middleware(Deny).build();
        engine
            .register_entity(
                EntityDescriptor::new("public"),
                vec![("memory".to_string(), Arc::new(MemoryAdapter::new()) as Arc<dyn SourceAdapter>)],
            )
            .unwrap();
        engine
            .register_entity(
                user_descriptor(),
                vec![("memory".to_string(), Arc::new(MemoryAdapter::new()) as Arc<dyn SourceAdapter>)],
            )
            .unwrap();

        // "user" keeps the deny middleware.
        let op = Operation::FindMany {
            ctx: engine.context("user"),
            args: FindArgs::new(),
        };
        assert!(matches!(
            engine.execute(op).await.unwrap_err(),
            OperationError::Unauthorized
        ));

        // "public" opted out of it.
        let op = Operation::FindMany {
            ctx: engine.context("public"),
            args: FindArgs::new(),
        };
        assert!(engine.execute(op).await.is_ok());
    }

    #[tokio::test]
    async fn join_resolver_runs_after_the_pipeline() {
        struct PostsResolver {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl RelationResolver for PostsResolver {
            async fn attach(
                &self,
                field: &str,
                primaries: &mut [Record],
            ) -> Result<(), OperationError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                for primary in primaries {
                    primary.insert(field.to_string(), Value::Array(Vec::new()));
                }
                Ok(())
            }
        }

        let engine = Engine::builder().build();
        engine
            .register_entity(
                user_descriptor(),
                vec![(
                    "memory".to_string(),
                    Arc::new(MemoryAdapter::new().with_rows([
                        record(&[("id", Value::from("1"))]),
                        record(&[("id", Value::from("2"))]),
                    ])) as Arc<dyn SourceAdapter>,
                )],
            )
            .unwrap();
        let resolver = Arc::new(PostsResolver {
            calls: AtomicUsize::new(0),
        });
        engine.register_relation("user", "posts", resolver.clone());

        let op = Operation::FindMany {
            ctx: engine.context("user"),
            args: FindArgs::new().include("posts"),
        };
        let result = engine.execute(op).await.unwrap();

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1, "one call per field");
        match result {
            Value::Array(items) => {
                assert_eq!(items.len(), 2);
                assert!(items.iter().all(|item| matches!(
                    item,
                    Value::Map(map) if map.contains_key("posts")
                )));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cache_middleware_serves_repeat_reads() {
        let config = EngineConfig::default()
            .with_entity("user", EntityConfig::new().cache_ttl_ms(60_000));
        let engine = Engine::builder().config(config).cache_middleware().build();
        engine
            .register_entity(
                user_descriptor(),
                vec![("memory".to_string(), seeded_memory("memory", "alice"))],
            )
            .unwrap();

        let find = |engine: &Engine| Operation::FindMany {
            ctx: engine.context("user"),
            args: FindArgs::new(),
        };

        let first = engine.execute(find(&engine)).await.unwrap();
        let second = engine.execute(find(&engine)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cache().stats().hits, 1);

        // A write purges the entity's cached reads.
        let create = Operation::Create {
            ctx: engine.context("user"),
            args: CreateArgs {
                data: record(&[("id", Value::from("2"))]),
            },
        };
        engine.execute(create).await.unwrap();
        assert_eq!(engine.cache().len(), 0);

        let third = engine.execute(find(&engine)).await.unwrap();
        match third {
            Value::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }
}
