//! Parameter Sets
//!
//! Transition parameters are unordered mappings from key to JSON-shaped
//! value. Two parameter sets are equivalent iff they are structurally
//! deep-equal; object identity never matters. This distinction is what
//! keeps the resolver from re-reporting (and the consumer from
//! re-rendering) when a caller rebuilds an identical parameter map on
//! every render pass.
//!
//! # Equality Rules
//!
//! - Maps are equal iff they have the same key set and every value is
//!   recursively equal. An absent key is *not* equal to a present key
//!   holding `null`: presence is part of the value.
//! - Sequences are equal iff same length, elementwise equal.
//! - Scalars compare by value.
//!
//! # Subset Matching
//!
//! Active-state queries use a deliberately relaxed rule: only the keys
//! present in the query's parameter set are checked against the active
//! parameters. Keys the query does not mention are unconstrained. This
//! is a policy, not a defect, and it is preserved exactly.
//!
//! Parameter sets are shallow, acyclic data; the recursion here assumes
//! that and does not defend against cycles.

use indexmap::IndexMap;

/// A single parameter value. JSON-shaped: scalar, sequence, or mapping.
pub type ParamValue = serde_json::Value;

/// An ordered mapping from parameter key to value.
///
/// Insertion order is preserved so that href generation is deterministic,
/// but order never affects equality.
pub type ParamSet = IndexMap<String, ParamValue>;

/// Structural deep equality over two optional parameter sets.
///
/// `None` and `Some(empty)` are both "no constraints" and compare equal
/// to each other; a non-empty set never equals either.
pub fn deep_equal(a: Option<&ParamSet>, b: Option<&ParamSet>) -> bool {
    let a_empty = a.map(|p| p.is_empty()).unwrap_or(true);
    let b_empty = b.map(|p| p.is_empty()).unwrap_or(true);

    match (a, b) {
        _ if a_empty && b_empty => true,
        (Some(a), Some(b)) => set_eq(a, b),
        _ => false,
    }
}

/// Check that every key present in `wanted` matches the active value.
///
/// A key present in `wanted` but absent from `active` never matches,
/// including `null`-valued wanted keys. Keys absent from `wanted` are
/// unconstrained.
pub fn matches_subset(wanted: &ParamSet, active: &ParamSet) -> bool {
    wanted.iter().all(|(key, value)| {
        active
            .get(key)
            .map(|current| value_eq(value, current))
            .unwrap_or(false)
    })
}

fn set_eq(a: &ParamSet, b: &ParamSet) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|(key, value)| {
        b.get(key)
            .map(|other| value_eq(value, other))
            .unwrap_or(false)
    })
}

/// Recursive structural equality over JSON-shaped values.
fn value_eq(a: &ParamValue, b: &ParamValue) -> bool {
    use serde_json::Value;

    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| value_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key).map(|other| value_eq(value, other)).unwrap_or(false)
                })
        }
        _ => false,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
