//! Shared registries: adapter bindings and entity schemas.

pub mod adapters;
pub mod schema;

pub use adapters::AdapterRegistry;
pub use schema::{SchemaAdapter, SchemaRegistry, SCHEMA_ENTITY};
