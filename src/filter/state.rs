//! Runtime form values mirroring a [`FilterExpr`] tree, and the builders that
//! produce the initial tree for a schema.
//!
//! State nodes carry no field or control metadata; that always comes from
//! the schema node at the same position. Mutations must keep the shape the
//! builders establish (same type, child count and order at every level).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::NodeKind;
use crate::filter::expr::{FilterControl, FilterExpr, FilterId, FilterSchemasAndGroups};

/// Form value tree for one filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterFormState {
    /// Value of a comparison leaf.
    Leaf {
        /// Raw form value; absent deserializes as `null`.
        #[serde(default)]
        value: Value,
    },
    /// Children of an `and` node.
    And {
        /// One state per schema child, same order.
        children: Vec<FilterFormState>,
    },
    /// Children of an `or` node.
    Or {
        /// One state per schema child, same order.
        children: Vec<FilterFormState>,
    },
    /// Child of a `not` node.
    Not {
        /// State of the negated schema node.
        child: Box<FilterFormState>,
    },
}

impl FilterFormState {
    /// Leaf holding `value`.
    pub fn leaf(value: impl Into<Value>) -> Self {
        FilterFormState::Leaf {
            value: value.into(),
        }
    }

    /// Node type.
    pub fn kind(&self) -> NodeKind {
        match self {
            FilterFormState::Leaf { .. } => NodeKind::Leaf,
            FilterFormState::And { .. } => NodeKind::And,
            FilterFormState::Or { .. } => NodeKind::Or,
            FilterFormState::Not { .. } => NodeKind::Not,
        }
    }
}

/// Root state per filter id.
pub type FilterState = BTreeMap<FilterId, FilterFormState>;

/// How leaf values are seeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateMode {
    /// Use each control's `initialValue`, falling back to its empty value.
    #[default]
    WithInitialValues,
    /// Ignore declared defaults.
    Empty,
}

/// True for values that mean "filter inactive": `null`, `""`, `[]`.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Builds the state tree for `expr`.
pub fn build_initial_form_state(expr: &FilterExpr, mode: StateMode) -> FilterFormState {
    match expr {
        FilterExpr::Leaf(leaf) => FilterFormState::Leaf {
            value: initial_leaf_value(&leaf.value, mode),
        },
        FilterExpr::And(filters) => FilterFormState::And {
            children: filters
                .iter()
                .map(|child| build_initial_form_state(child, mode))
                .collect(),
        },
        FilterExpr::Or(filters) => FilterFormState::Or {
            children: filters
                .iter()
                .map(|child| build_initial_form_state(child, mode))
                .collect(),
        },
        FilterExpr::Not(filter) => FilterFormState::Not {
            child: Box::new(build_initial_form_state(filter, mode)),
        },
    }
}

/// Builds a root state for every filter in `schemas`.
pub fn build_initial_filter_state(schemas: &FilterSchemasAndGroups, mode: StateMode) -> FilterState {
    schemas
        .filters
        .iter()
        .map(|schema| {
            (
                schema.id.clone(),
                build_initial_form_state(&schema.expression, mode),
            )
        })
        .collect()
}

fn initial_leaf_value(control: &FilterControl, mode: StateMode) -> Value {
    match control {
        FilterControl::CustomOperator {
            operators,
            value_control,
            initial_value,
        } => {
            let operator = operators
                .first()
                .map(|option| option.value.clone())
                .unwrap_or(Value::Null);
            if mode == StateMode::Empty {
                return json!({ "operator": operator, "value": "" });
            }
            // A full `{operator, value}` default replaces the whole pair.
            if let Some(Value::Object(pair)) = initial_value {
                if pair.contains_key("operator") {
                    return Value::Object(pair.clone());
                }
            }
            let inner = initial_value
                .as_ref()
                .or_else(|| value_control.initial_value())
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));
            json!({ "operator": operator, "value": inner })
        }
        other => match mode {
            StateMode::Empty => other.empty_value(),
            StateMode::WithInitialValues => other
                .initial_value()
                .cloned()
                .unwrap_or_else(|| other.empty_value()),
        },
    }
}
