//! Manifold Core — dynamic values, where-conditions, query matching, ordering, and schema descriptors.

pub mod condition;
pub mod matcher;
pub mod ordering;
pub mod schema;
pub mod value;

pub use condition::{FieldCondition, Operators, StringMode, WhereCondition};
pub use matcher::matches;
pub use ordering::{paginate, sort_records, value_ord, OrderBy, SortDirection};
pub use schema::{EntityDescriptor, EntityRef, FieldDescriptor, FieldKind};
pub use value::{Record, Value};
