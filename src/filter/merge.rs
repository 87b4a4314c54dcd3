//! Merges assistant-suggested filter values into an existing [`FilterState`].
//!
//! Suggestions arrive as loosely shaped JSON keyed by filter id. Each node is
//! coerced toward the schema's shape, then accepted only if it passes the
//! structural check. Anything that does not fit leaves the current node alone.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::filter::expr::{FilterControl, FilterExpr, FilterLeaf, FilterOperator, FilterSchemasAndGroups};
use crate::filter::state::{is_empty_value, FilterFormState, FilterState};
use crate::filter::traverse::check_shape;

/// Returns `current` with every acceptable entry of `incoming` applied.
pub fn merge_filter_state(
    current: &FilterState,
    incoming: &Value,
    schemas: &FilterSchemasAndGroups,
) -> FilterState {
    let mut merged = current.clone();
    let Value::Object(entries) = incoming else {
        warn!(incoming = %incoming, "filters.merge.not_an_object");
        return merged;
    };
    for (id, node) in entries {
        let Some(schema) = schemas.schema(id) else {
            debug!(filter_id = %id, "filters.merge.skip_unknown_schema");
            continue;
        };
        let Some(candidate) = coerce_node(&schema.expression, node) else {
            warn!(filter_id = %id, node = %node, "filters.merge.rejected");
            continue;
        };
        match check_shape(&schema.expression, &candidate) {
            Ok(()) => {
                debug!(filter_id = %id, "filters.merge.applied");
                merged.insert(id.clone(), candidate);
            }
            Err(err) => warn!(filter_id = %id, error = %err, "filters.merge.rejected"),
        }
    }
    merged
}

fn node_type(node: &Value) -> Option<&str> {
    node.get("type").and_then(Value::as_str)
}

fn leaf_value(node: &Value) -> Value {
    node.get("value").cloned().unwrap_or(Value::Null)
}

fn coerce_node(schema: &FilterExpr, node: &Value) -> Option<FilterFormState> {
    let kind = node_type(node)?;
    match schema {
        FilterExpr::Leaf(leaf) => coerce_leaf(leaf, kind, node),
        FilterExpr::And(filters) if kind == "and" => Some(FilterFormState::And {
            children: coerce_children(filters, node)?,
        }),
        FilterExpr::Or(filters) if kind == "or" => Some(FilterFormState::Or {
            children: coerce_children(filters, node)?,
        }),
        FilterExpr::Not(filter) if kind == "not" => Some(FilterFormState::Not {
            child: Box::new(coerce_node(filter, node.get("child")?)?),
        }),
        _ => None,
    }
}

fn coerce_children(filters: &[FilterExpr], node: &Value) -> Option<Vec<FilterFormState>> {
    let children = node.get("children")?.as_array()?;
    if children.len() != filters.len() {
        return None;
    }
    filters
        .iter()
        .zip(children)
        .map(|(filter, child)| coerce_node(filter, child))
        .collect()
}

fn coerce_leaf(leaf: &FilterLeaf, kind: &str, node: &Value) -> Option<FilterFormState> {
    let value = match kind {
        "leaf" => coerce_leaf_value(leaf, leaf_value(node)),
        "not" => {
            let inner = node.get("child")?;
            if node_type(inner)? != "leaf" {
                return None;
            }
            negated_leaf_value(leaf, leaf_value(inner))?
        }
        "or" if matches!(leaf.op, FilterOperator::In | FilterOperator::NotIn) => {
            let mut values = Vec::new();
            for child in node.get("children")?.as_array()? {
                if node_type(child)? != "leaf" {
                    return None;
                }
                match leaf_value(child) {
                    Value::Array(items) => values.extend(items),
                    other if !is_empty_value(&other) => values.push(other),
                    _ => {}
                }
            }
            Value::Array(values)
        }
        _ => return None,
    };
    Some(FilterFormState::leaf(value))
}

fn coerce_leaf_value(leaf: &FilterLeaf, value: Value) -> Value {
    if let FilterControl::CustomOperator { .. } = &leaf.value {
        if value.get("operator").is_some() {
            return value;
        }
        let operator = leaf.value.first_operator().cloned().unwrap_or(Value::Null);
        return json!({ "operator": operator, "value": value });
    }
    match leaf.op {
        FilterOperator::In | FilterOperator::NotIn
            if !value.is_array() && !is_empty_value(&value) =>
        {
            Value::Array(vec![value])
        }
        _ => value,
    }
}

/// Folds a suggested `not(leaf)` into a leaf whose own operator already
/// negates.
fn negated_leaf_value(leaf: &FilterLeaf, value: Value) -> Option<Value> {
    if let FilterControl::CustomOperator { operators, .. } = &leaf.value {
        let has_neq = operators.iter().any(|option| option.value == "_neq");
        return has_neq.then(|| json!({ "operator": "_neq", "value": value }));
    }
    match leaf.op {
        FilterOperator::NotEquals => Some(value),
        FilterOperator::NotIn if value.is_array() => Some(value),
        FilterOperator::NotIn => Some(Value::Array(vec![value])),
        _ => None,
    }
}
