//! Record-against-condition evaluation.
//!
//! [`matches`] is the single filter primitive shared by every in-memory
//! adapter: a record satisfies a [`WhereCondition`] when every constrained
//! field satisfies its constraint. Fields the condition does not mention
//! impose no constraint, and fields missing from the record evaluate as
//! [`Value::Null`].
//!
//! No type coercion is performed: an ordering comparison between values of
//! incompatible types is simply false. The only unification is numeric —
//! `Int` and `Float` compare as the single JSON number type.

use std::cmp::Ordering;

use crate::condition::{FieldCondition, Operators, StringMode, WhereCondition};
use crate::value::{Record, Value};

/// Evaluates `condition` against `record`.
#[must_use]
pub fn matches(record: &Record, condition: &WhereCondition) -> bool {
    condition.iter().all(|(field, constraint)| {
        let value = record.get(field).unwrap_or(&Value::Null);
        field_matches(value, constraint)
    })
}

fn field_matches(value: &Value, constraint: &FieldCondition) -> bool {
    match constraint {
        FieldCondition::Literal(expected) => value.loosely_equals(expected),
        FieldCondition::Operators(ops) => operators_match(value, ops),
    }
}

fn operators_match(value: &Value, ops: &Operators) -> bool {
    let insensitive = ops.mode == Some(StringMode::Insensitive);

    if let Some(expected) = &ops.eq {
        if !value.loosely_equals(expected) {
            return false;
        }
    }
    if let Some(expected) = &ops.ne {
        if value.loosely_equals(expected) {
            return false;
        }
    }
    if let Some(bound) = &ops.gt {
        if !ordering_holds(value, bound, Ordering::is_gt) {
            return false;
        }
    }
    if let Some(bound) = &ops.gte {
        if !ordering_holds(value, bound, Ordering::is_ge) {
            return false;
        }
    }
    if let Some(bound) = &ops.lt {
        if !ordering_holds(value, bound, Ordering::is_lt) {
            return false;
        }
    }
    if let Some(bound) = &ops.lte {
        if !ordering_holds(value, bound, Ordering::is_le) {
            return false;
        }
    }
    if let Some(set) = &ops.r#in {
        if !set.iter().any(|candidate| value.loosely_equals(candidate)) {
            return false;
        }
    }
    if let Some(set) = &ops.nin {
        if set.iter().any(|candidate| value.loosely_equals(candidate)) {
            return false;
        }
    }

    if let Value::String(s) = value {
        string_operators_match(s, ops, insensitive)
    } else if let Some(excluded) = &ops.not {
        !value.loosely_equals(excluded)
    } else {
        true
    }
}

fn string_operators_match(s: &str, ops: &Operators, insensitive: bool) -> bool {
    let subject = fold(s, insensitive);

    if let Some(needle) = &ops.contains {
        if !subject.contains(&fold(needle, insensitive)) {
            return false;
        }
    }
    if let Some(prefix) = &ops.starts_with {
        if !subject.starts_with(&fold(prefix, insensitive)) {
            return false;
        }
    }
    if let Some(suffix) = &ops.ends_with {
        if !subject.ends_with(&fold(suffix, insensitive)) {
            return false;
        }
    }
    if let Some(excluded) = &ops.not {
        // `not: null` against a string is vacuously true: a present string is
        // never null. Any non-string operand is likewise never equal.
        if let Value::String(excluded) = excluded {
            if subject == fold(excluded, insensitive) {
                return false;
            }
        }
    }

    true
}

fn fold(s: &str, insensitive: bool) -> String {
    if insensitive {
        s.to_lowercase()
    } else {
        s.to_string()
    }
}

/// Partial comparison used by the ordering operators.
///
/// Numbers compare numerically across `Int`/`Float`; strings and booleans
/// compare by their native ordering. Everything else — including any
/// cross-type pair — is incomparable and yields `None`.
fn compare(value: &Value, bound: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (value.as_number(), bound.as_number()) {
        return a.partial_cmp(&b);
    }
    match (value, bound) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn ordering_holds(value: &Value, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    compare(value, bound).is_some_and(accept)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::condition::Operators;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn empty_condition_matches_everything() {
        let r = record(&[("id", Value::Int(1))]);
        assert!(matches(&r, &WhereCondition::new()));
        assert!(matches(&Record::new(), &WhereCondition::new()));
    }

    #[test]
    fn literal_condition_is_field_equality() {
        let r = record(&[("name", Value::from("alice")), ("age", Value::Int(30))]);

        let hit = WhereCondition::new().field("name", "alice").field("age", 30);
        assert!(matches(&r, &hit));

        let miss = WhereCondition::new().field("name", "bob");
        assert!(!matches(&r, &miss));
    }

    #[test]
    fn missing_field_evaluates_as_null() {
        let r = record(&[("id", Value::Int(1))]);

        assert!(matches(&r, &WhereCondition::new().field("ghost", Value::Null)));
        assert!(!matches(&r, &WhereCondition::new().field("ghost", 7)));
    }

    #[test]
    fn ordering_operators_use_numeric_comparison() {
        let r = record(&[("age", Value::Int(30))]);

        assert!(matches(&r, &WhereCondition::new().field("age", Operators::new().gt(21))));
        assert!(matches(&r, &WhereCondition::new().field("age", Operators::new().gte(30.0))));
        assert!(matches(&r, &WhereCondition::new().field("age", Operators::new().lt(31).gt(29))));
        assert!(!matches(&r, &WhereCondition::new().field("age", Operators::new().lte(29))));
    }

    #[test]
    fn cross_type_comparison_is_false_not_coerced() {
        let r = record(&[("age", Value::from("30"))]);

        assert!(!matches(&r, &WhereCondition::new().field("age", Operators::new().gt(21))));
        assert!(!matches(&r, &WhereCondition::new().field("age", Operators::new().lt(99))));
    }

    #[test]
    fn string_operators_respect_case_mode() {
        let r = record(&[("name", Value::from("Alice"))]);

        let sensitive = WhereCondition::new().field("name", Operators::new().starts_with("al"));
        assert!(!matches(&r, &sensitive));

        let insensitive = WhereCondition::new().field(
            "name",
            Operators::new().starts_with("al").mode(StringMode::Insensitive),
        );
        assert!(matches(&r, &insensitive));

        let contains = WhereCondition::new()
            .field("name", Operators::new().contains("LIC").mode(StringMode::Insensitive));
        assert!(matches(&r, &contains));

        let ends = WhereCondition::new().field("name", Operators::new().ends_with("ice"));
        assert!(matches(&r, &ends));
    }

    #[test]
    fn not_null_on_string_is_vacuously_true() {
        let r = record(&[("name", Value::from("alice"))]);
        let cond = WhereCondition::new().field("name", Operators::new().not(Value::Null));
        assert!(matches(&r, &cond));
    }

    #[test]
    fn generic_not_applies_to_non_strings() {
        let r = record(&[("age", Value::Int(30))]);

        assert!(!matches(&r, &WhereCondition::new().field("age", Operators::new().not(30))));
        assert!(matches(&r, &WhereCondition::new().field("age", Operators::new().not(31))));

        // Missing field is Null, so `not: null` fails there.
        assert!(!matches(&r, &WhereCondition::new().field("ghost", Operators::new().not(Value::Null))));
    }

    #[test]
    fn membership_operators() {
        let r = record(&[("role", Value::from("editor"))]);

        let is_in = WhereCondition::new().field("role", Operators::new().is_in(["admin", "editor"]));
        assert!(matches(&r, &is_in));

        let not_in = WhereCondition::new().field("role", Operators::new().not_in(["admin", "editor"]));
        assert!(!matches(&r, &not_in));
    }

    #[test]
    fn all_present_operators_must_hold() {
        let r = record(&[("age", Value::Int(30))]);
        let cond = WhereCondition::new().field("age", Operators::new().gt(21).ne(30));
        assert!(!matches(&r, &cond));
    }

    // Strategy over the scalar values the matcher compares.
    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-z]{0,6}".prop_map(Value::from),
        ]
    }

    proptest! {
        /// `$in` and `$nin` are exact complements for any value and set.
        #[test]
        fn in_and_nin_are_complements(value in scalar(), set in proptest::collection::vec(scalar(), 0..5)) {
            let r = record(&[("f", value)]);
            let is_in = WhereCondition::new().field("f", Operators::new().is_in(set.clone()));
            let not_in = WhereCondition::new().field("f", Operators::new().not_in(set));
            prop_assert_ne!(matches(&r, &is_in), matches(&r, &not_in));
        }

        /// A literal-only condition is exactly per-field equality.
        #[test]
        fn literal_condition_equals_field_equality(a in scalar(), b in scalar()) {
            let r = record(&[("f", a.clone())]);
            let cond = WhereCondition::new().field("f", b.clone());
            prop_assert_eq!(matches(&r, &cond), a.loosely_equals(&b));
        }
    }
}
