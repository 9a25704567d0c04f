//! Adapter registry: `(entity, source)` bindings with defaults and
//! fallback factories.
//!
//! Bindings are installed at plugin-registration time and replaced
//! wholesale on re-registration. Resolution order for a call: explicit
//! source, else the entity's default source; a missing binding then falls
//! through to the global [`AdapterFactory`] list in registration order,
//! where the first factory producing an adapter wins (and its product is
//! cached as a regular binding).

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::adapter::{AdapterFactory, SourceAdapter};
use crate::operation::OperationError;

/// Process-wide map of `(entity, source)` to adapter instance.
pub struct AdapterRegistry {
    bindings: DashMap<(String, String), Arc<dyn SourceAdapter>>,
    /// Entity name to default source. First registration wins unless
    /// explicitly overridden.
    defaults: DashMap<String, String>,
    /// Fallback factories in registration order.
    factories: RwLock<Vec<Arc<dyn AdapterFactory>>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
            defaults: DashMap::new(),
            factories: RwLock::new(Vec::new()),
        }
    }

    /// Binds `adapter` to `(entity, source)`, replacing any existing binding.
    ///
    /// The first source registered for an entity becomes its default until
    /// [`set_default`](Self::set_default) overrides it.
    pub fn register(&self, entity: &str, source: &str, adapter: Arc<dyn SourceAdapter>) {
        self.bindings
            .insert((entity.to_string(), source.to_string()), adapter);
        self.defaults
            .entry(entity.to_string())
            .or_insert_with(|| source.to_string());
        tracing::debug!(entity, source, "adapter registered");
    }

    /// Drops every binding and the default for `entity`.
    ///
    /// Used for wholesale replacement on re-registration; factories are
    /// untouched.
    pub fn remove_entity(&self, entity: &str) {
        self.bindings.retain(|(bound_entity, _), _| bound_entity != entity);
        self.defaults.remove(entity);
    }

    /// Sets the default source used when a call names none.
    pub fn set_default(&self, entity: &str, source: &str) {
        self.defaults
            .insert(entity.to_string(), source.to_string());
    }

    /// The entity's default source, if any.
    #[must_use]
    pub fn default_source(&self, entity: &str) -> Option<String> {
        self.defaults.get(entity).map(|entry| entry.value().clone())
    }

    /// Appends a fallback factory. Registration order is consultation order.
    pub fn register_factory(&self, factory: Arc<dyn AdapterFactory>) {
        self.factories.write().push(factory);
    }

    /// Resolves `(entity, source)` to an adapter.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::NoAdapter`] when the source cannot be
    /// determined or no binding or factory covers the pair.
    pub fn resolve(
        &self,
        entity: &str,
        source: Option<&str>,
    ) -> Result<Arc<dyn SourceAdapter>, OperationError> {
        let Some(source) = source
            .map(str::to_string)
            .or_else(|| self.default_source(entity))
        else {
            return Err(OperationError::NoAdapter {
                entity: entity.to_string(),
                source_name: None,
            });
        };

        if let Some(binding) = self.bindings.get(&(entity.to_string(), source.clone())) {
            return Ok(binding.value().clone());
        }

        let factories = self.factories.read().clone();
        for factory in &factories {
            if let Some(adapter) = factory.create(entity, &source) {
                tracing::debug!(entity, source, "adapter created by fallback factory");
                self.bindings
                    .insert((entity.to_string(), source.clone()), adapter.clone());
                return Ok(adapter);
            }
        }

        Err(OperationError::NoAdapter {
            entity: entity.to_string(),
            source_name: Some(source),
        })
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
