//! Engine configuration.
//!
//! Built explicitly by the startup routine and handed to
//! [`Engine::builder`](crate::router::Engine::builder) — there are no
//! process-wide singletons, so tests and embedders can run multiple
//! isolated engines. Per-entity settings are read at registration and
//! chain-build time, not per call.

use std::collections::HashMap;

use crate::cache::CacheConfig;

/// Per-entity cache policy for the read-through cache middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Time-to-live for cached reads in milliseconds.
    pub ttl_ms: u64,
}

/// Per-entity configuration.
#[derive(Debug, Clone, Default)]
pub struct EntityConfig {
    /// Source used when a call names no explicit source. Falls back to the
    /// first registered binding when absent.
    pub default_source: Option<String>,
    /// Names of middlewares excluded from this entity's chain.
    pub exclude: Vec<String>,
    /// Read-cache policy; `None` disables caching for the entity.
    pub cache: Option<CachePolicy>,
}

impl EntityConfig {
    /// Creates an empty per-entity configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default source for the entity.
    #[must_use]
    pub fn default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = Some(source.into());
        self
    }

    /// Excludes a named middleware from the entity's chain.
    #[must_use]
    pub fn exclude(mut self, middleware: impl Into<String>) -> Self {
        self.exclude.push(middleware.into());
        self
    }

    /// Enables the read cache with the given TTL.
    #[must_use]
    pub fn cache_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.cache = Some(CachePolicy { ttl_ms });
        self
    }
}

/// Engine-level configuration for dispatch and caching.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default per-call timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Sizing for the shared read-cache store.
    pub cache: CacheConfig,
    /// Per-entity settings keyed by entity name.
    pub entities: HashMap<String, EntityConfig>,
}

impl EngineConfig {
    /// Looks up the configuration for `entity`, if any.
    #[must_use]
    pub fn entity(&self, entity: &str) -> Option<&EntityConfig> {
        self.entities.get(entity)
    }

    /// Adds or replaces the configuration for one entity.
    #[must_use]
    pub fn with_entity(mut self, name: impl Into<String>, config: EntityConfig) -> Self {
        self.entities.insert(name.into(), config);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            cache: CacheConfig::default(),
            entities: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_lookup_and_builder() {
        let config = EngineConfig::default().with_entity(
            "user",
            EntityConfig::new()
                .default_source("mock")
                .exclude("trace")
                .cache_ttl_ms(5_000),
        );

        let user = config.entity("user").unwrap();
        assert_eq!(user.default_source.as_deref(), Some("mock"));
        assert_eq!(user.exclude, vec!["trace"]);
        assert_eq!(user.cache, Some(CachePolicy { ttl_ms: 5_000 }));
        assert!(config.entity("post").is_none());
    }
}
