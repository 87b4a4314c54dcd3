//! Structural equality over [`HasuraCondition`] trees.
//!
//! `_and`/`_or` members and field operator arrays compare as multisets using
//! greedy pairwise matching, so `{_and: [A, B]}` equals `{_and: [B, A]}` and
//! duplicated members must be matched one-for-one. Operator operands (for
//! example `_in` lists) compare as ordered values.

use crate::hasura::condition::{FieldCondition, HasuraCondition, HasuraOperator};

/// Order-insensitive equality for boolean conditions.
pub fn conditions_are_equal(left: &HasuraCondition, right: &HasuraCondition) -> bool {
    match (left, right) {
        (HasuraCondition::And(a), HasuraCondition::And(b))
        | (HasuraCondition::Or(a), HasuraCondition::Or(b)) => {
            unordered_match(a, b, conditions_are_equal)
        }
        (HasuraCondition::Not(a), HasuraCondition::Not(b)) => conditions_are_equal(a, b),
        (HasuraCondition::Fields(a), HasuraCondition::Fields(b)) => {
            a.len() == b.len()
                && a.iter().all(|(name, cond)| {
                    b.get(name)
                        .is_some_and(|other| field_conditions_are_equal(cond, other))
                })
        }
        _ => false,
    }
}

/// Equality for the value a field maps to.
pub fn field_conditions_are_equal(left: &FieldCondition, right: &FieldCondition) -> bool {
    match (left, right) {
        (FieldCondition::Operator(a), FieldCondition::Operator(b)) => operators_are_equal(a, b),
        (
            FieldCondition::Operators(a) | FieldCondition::OperatorSet(a),
            FieldCondition::Operators(b) | FieldCondition::OperatorSet(b),
        ) => unordered_match(a, b, operators_are_equal),
        (FieldCondition::Nested(a), FieldCondition::Nested(b)) => conditions_are_equal(a, b),
        _ => false,
    }
}

/// Same key, and operands equal as JSON values (arrays ordered).
pub fn operators_are_equal(left: &HasuraOperator, right: &HasuraOperator) -> bool {
    left.key == right.key && left.value == right.value
}

fn unordered_match<T, F>(left: &[T], right: &[T], eq: F) -> bool
where
    F: Fn(&T, &T) -> bool,
{
    if left.len() != right.len() {
        return false;
    }
    let mut used = vec![false; right.len()];
    'outer: for item in left {
        for (idx, candidate) in right.iter().enumerate() {
            if !used[idx] && eq(item, candidate) {
                used[idx] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(value: serde_json::Value) -> HasuraCondition {
        HasuraCondition::from_json(&value).expect("valid condition")
    }

    #[test]
    fn and_or_members_ignore_order() {
        let a = json!({ "name": { "_eq": "a" } });
        let b = json!({ "age": { "_gt": 3 } });
        assert!(conditions_are_equal(
            &cond(json!({ "_and": [a.clone(), b.clone()] })),
            &cond(json!({ "_and": [b.clone(), a.clone()] }))
        ));
        assert!(conditions_are_equal(
            &cond(json!({ "_or": [a.clone(), b.clone()] })),
            &cond(json!({ "_or": [b, a] }))
        ));
    }

    #[test]
    fn reordered_members_with_different_values_differ() {
        let left = cond(json!({ "_and": [
            { "name": { "_eq": "a" } },
            { "age": { "_gt": 3 } }
        ] }));
        let right = cond(json!({ "_and": [
            { "age": { "_gt": 4 } },
            { "name": { "_eq": "a" } }
        ] }));
        assert!(!conditions_are_equal(&left, &right));
    }

    #[test]
    fn duplicates_are_matched_one_for_one() {
        let x = json!({ "a": { "_eq": 1 } });
        let y = json!({ "b": { "_eq": 2 } });
        let left = cond(json!({ "_and": [x.clone(), x.clone(), y.clone()] }));
        let right = cond(json!({ "_and": [x.clone(), y.clone(), y.clone()] }));
        assert!(!conditions_are_equal(&left, &right));
    }

    #[test]
    fn in_lists_compare_in_order() {
        let left = cond(json!({ "id": { "_in": [1, 2] } }));
        let right = cond(json!({ "id": { "_in": [2, 1] } }));
        assert!(!conditions_are_equal(&left, &right));
    }

    #[test]
    fn operator_arrays_compare_as_sets() {
        let left = cond(json!({ "score": [{ "_gte": 1 }, { "_lte": 5 }] }));
        let right = cond(json!({ "score": [{ "_lte": 5 }, { "_gte": 1 }] }));
        assert!(conditions_are_equal(&left, &right));
    }

    #[test]
    fn not_and_nested_paths_recurse() {
        let left = cond(json!({ "_not": { "user": { "name": { "_ilike": "%a%" } } } }));
        let right = cond(json!({ "_not": { "user": { "name": { "_ilike": "%a%" } } } }));
        let other = cond(json!({ "_not": { "user": { "email": { "_ilike": "%a%" } } } }));
        assert!(conditions_are_equal(&left, &right));
        assert!(!conditions_are_equal(&left, &other));
    }

    #[test]
    fn operator_leaf_differs_from_nested_condition() {
        let leaf = cond(json!({ "f": { "_eq": 1 } }));
        let nested = cond(json!({ "f": { "g": { "_eq": 1 } } }));
        assert!(!conditions_are_equal(&leaf, &nested));
    }

    #[test]
    fn operator_object_matches_equivalent_operator_list() {
        let object = cond(json!({ "score": { "_gte": 1, "_lte": 5 } }));
        let list = cond(json!({ "score": [{ "_lte": 5 }, { "_gte": 1 }] }));
        let narrower = cond(json!({ "score": { "_gte": 2, "_lte": 5 } }));
        assert!(conditions_are_equal(&object, &list));
        assert!(!conditions_are_equal(&object, &narrower));
    }
}
