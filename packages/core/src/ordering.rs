//! Multi-key record ordering and offset/limit slicing.
//!
//! [`sort_records`] applies an ordered list of `(field, direction)` keys as
//! successive tie-breakers; the first key is the primary sort key. It builds
//! on `slice::sort_by`, which the standard library guarantees to be stable,
//! so equal keys preserve their relative input order.
//!
//! [`paginate`] slices `[offset, offset + limit)` clamped to bounds. A zero
//! or absent offset/limit means "no effect", not "return nothing".

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::value::{Record, Value};

/// Sort direction for one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordered list of `(field, direction)` sort keys.
///
/// Mapping order is significant, so this is a sequence rather than a map:
/// earlier entries dominate later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBy(pub Vec<(String, SortDirection)>);

impl OrderBy {
    /// Creates an empty ordering (leaves input order untouched).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sort key with the lowest precedence so far.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.0.push((field.into(), direction));
        self
    }

    /// Whether no sort keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Total order over [`Value`] used for sorting.
///
/// Values rank first by type class (`Null < Bool < numbers < String < Array
/// < Map`), then within a class by their natural ordering. `Int` and `Float`
/// share the number class and compare numerically; NaN is ordered via
/// [`OrderedFloat`] rather than poisoning the sort.
#[must_use]
pub fn value_ord(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Map(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (ax, bx) in x.iter().zip(y.iter()) {
                let ord = value_ord(ax, bx);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Map(x), Value::Map(y)) => {
            for ((ak, av), (bk, bv)) in x.iter().zip(y.iter()) {
                let ord = ak.cmp(bk).then_with(|| value_ord(av, bv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => OrderedFloat(x).cmp(&OrderedFloat(y)),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

/// Sorts `records` in place by the given keys.
///
/// Fields missing from a record sort as `Null`. An empty `order_by` is a
/// no-op.
pub fn sort_records(records: &mut [Record], order_by: &OrderBy) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for (field, direction) in &order_by.0 {
            let av = a.get(field).unwrap_or(&Value::Null);
            let bv = b.get(field).unwrap_or(&Value::Null);
            let ord = match direction {
                SortDirection::Asc => value_ord(av, bv),
                SortDirection::Desc => value_ord(bv, av),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Slices `items` to `[offset, offset + limit)`, clamped to bounds.
///
/// `None` and `Some(0)` both mean "no effect" for either parameter.
#[must_use]
pub fn paginate<T>(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let skip = offset.unwrap_or(0);
    let take = match limit {
        Some(0) | None => usize::MAX,
        Some(n) => n,
    };
    items.into_iter().skip(skip).take(take).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
