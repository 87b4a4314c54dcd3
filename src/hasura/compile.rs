//! Compiles filter form state into a [`HasuraCondition`].
//!
//! Leaves with empty values (`null`, `""`, `[]`) contribute nothing, and
//! composites whose children all vanish vanish too, so an untouched form
//! compiles to `{}`.

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Result;
use crate::filter::expr::{
    FilterControl, FilterExpr, FilterField, FilterLeaf, FilterSchemasAndGroups, TransformOutcome,
};
use crate::filter::state::{is_empty_value, FilterFormState, FilterState};
use crate::filter::traverse::{traverse_filter_schema_and_state, SchemaStateVisitor};
use crate::hasura::condition::{FieldCondition, HasuraCondition, HasuraOperator, OperatorKey};

/// Compiles every filter in `state` and combines the results.
///
/// States whose id has no schema are skipped. Zero conditions yield `{}`, one
/// is returned bare, several are wrapped in `_and`.
pub fn build_hasura_conditions(
    state: &FilterState,
    schemas: &FilterSchemasAndGroups,
) -> Result<HasuraCondition> {
    let mut conditions = Vec::new();
    for (id, root) in state {
        let Some(schema) = schemas.schema(id) else {
            debug!(filter_id = %id, "filters.compile.skip_unknown_schema");
            continue;
        };
        if let Some(cond) = build_conditions_recursive(&schema.expression, root)? {
            trace!(filter_id = %id, condition = %cond, "filters.compile.filter");
            conditions.push(cond);
        }
    }
    Ok(match conditions.len() {
        0 => HasuraCondition::empty(),
        1 => conditions.remove(0),
        _ => HasuraCondition::And(conditions),
    })
}

/// Compiles one (schema, state) pair; `None` when nothing is active.
pub fn build_conditions_recursive(
    schema: &FilterExpr,
    state: &FilterFormState,
) -> Result<Option<HasuraCondition>> {
    traverse_filter_schema_and_state(schema, state, &mut ConditionCompiler)
}

/// Places `cond` under `field`.
///
/// Dotted paths nest innermost-first (`a.b` → `{a: {b: cond}}`); field groups
/// repeat the same `cond` for each path under `_and`/`_or`.
pub fn build_nested_key(field: &FilterField, cond: FieldCondition) -> HasuraCondition {
    match field {
        FilterField::Path(path) => nest_path(path, cond),
        FilterField::And { and } => HasuraCondition::And(
            and.iter()
                .map(|path| nest_path(path, cond.clone()))
                .collect(),
        ),
        FilterField::Or { or } => HasuraCondition::Or(
            or.iter()
                .map(|path| nest_path(path, cond.clone()))
                .collect(),
        ),
    }
}

/// Nests `cond` under a dotted `path`.
pub fn nest_path(path: &str, cond: FieldCondition) -> HasuraCondition {
    let mut segments = path.rsplit('.');
    let innermost = segments.next().unwrap_or(path);
    let mut current = HasuraCondition::field(innermost, cond);
    for segment in segments {
        current = HasuraCondition::field(segment, FieldCondition::Nested(Box::new(current)));
    }
    current
}

struct ConditionCompiler;

impl SchemaStateVisitor for ConditionCompiler {
    type Output = Option<HasuraCondition>;

    fn leaf(&mut self, schema: &FilterLeaf, raw: &Value) -> Result<Self::Output> {
        let mut field = schema.field.clone();
        let mut value = raw.clone();
        if let Some(transform) = &schema.transform {
            match transform.to_query(raw) {
                TransformOutcome::Condition(cond) => return Ok(Some(cond)),
                TransformOutcome::Override {
                    field: field_override,
                    value: value_override,
                } => {
                    if let Some(f) = field_override {
                        field = f;
                    }
                    if let Some(v) = value_override {
                        value = v;
                    }
                }
            }
        }

        let operator = match &schema.value {
            FilterControl::CustomOperator { .. } => {
                let Some((key, operand)) = split_operator_pair(&value) else {
                    return Ok(None);
                };
                HasuraOperator::new(key, operand)
            }
            _ => {
                if is_empty_value(&value) {
                    return Ok(None);
                }
                HasuraOperator::new(schema.op.hasura_key(), value)
            }
        };
        Ok(Some(build_nested_key(
            &field,
            FieldCondition::Operator(operator),
        )))
    }

    fn and(
        &mut self,
        _schema: &[FilterExpr],
        _state: &[FilterFormState],
        children: Vec<Self::Output>,
    ) -> Result<Self::Output> {
        let present: Vec<HasuraCondition> = children.into_iter().flatten().collect();
        Ok((!present.is_empty()).then(|| HasuraCondition::And(present)))
    }

    fn or(
        &mut self,
        _schema: &[FilterExpr],
        _state: &[FilterFormState],
        children: Vec<Self::Output>,
    ) -> Result<Self::Output> {
        let present: Vec<HasuraCondition> = children.into_iter().flatten().collect();
        Ok((!present.is_empty()).then(|| HasuraCondition::Or(present)))
    }

    fn not(
        &mut self,
        _schema: &FilterExpr,
        _state: &FilterFormState,
        child: Self::Output,
    ) -> Result<Self::Output> {
        Ok(child.map(HasuraCondition::not))
    }
}

/// Reads a `customOperator` value `{operator, value}`. `None` when the
/// operator is falsy or the operand is empty.
fn split_operator_pair(value: &Value) -> Option<(OperatorKey, Value)> {
    let Value::Object(pair) = value else {
        return None;
    };
    let operator = match pair.get("operator") {
        Some(Value::String(op)) if !op.is_empty() => op,
        _ => return None,
    };
    let operand = pair.get("value").cloned().unwrap_or(Value::Null);
    if is_empty_value(&operand) {
        return None;
    }
    Some((OperatorKey::from_key(operator), operand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::expr::{FilterOperator, FilterTransform};
    use serde_json::json;

    fn leaf(op: FilterOperator, field: &str) -> FilterExpr {
        FilterExpr::leaf(op, field, FilterControl::text())
    }

    fn compile(schema: &FilterExpr, state: FilterFormState) -> Option<Value> {
        build_conditions_recursive(schema, &state)
            .expect("compile")
            .map(|cond| cond.to_json())
    }

    #[test]
    fn maps_every_operator() {
        let cases = [
            (FilterOperator::Equals, "_eq"),
            (FilterOperator::NotEquals, "_neq"),
            (FilterOperator::GreaterThan, "_gt"),
            (FilterOperator::LessThan, "_lt"),
            (FilterOperator::GreaterThanOrEqual, "_gte"),
            (FilterOperator::LessThanOrEqual, "_lte"),
            (FilterOperator::In, "_in"),
            (FilterOperator::NotIn, "_nin"),
            (FilterOperator::Like, "_like"),
            (FilterOperator::ILike, "_ilike"),
            (FilterOperator::IsNull, "_is_null"),
        ];
        for (op, key) in cases {
            let out = compile(&leaf(op, "f"), FilterFormState::leaf(json!(true)));
            assert_eq!(out, Some(json!({ "f": { key: true } })), "operator {op}");
        }
    }

    #[test]
    fn nests_dotted_paths() {
        let out = compile(
            &leaf(FilterOperator::Equals, "a.b.c.d"),
            FilterFormState::leaf("deep"),
        );
        assert_eq!(out, Some(json!({ "a": { "b": { "c": { "d": { "_eq": "deep" } } } } })));
    }

    #[test]
    fn fans_out_field_groups() {
        let and_schema = FilterExpr::leaf(
            FilterOperator::Equals,
            FilterField::And {
                and: vec!["name".into(), "title".into()],
            },
            FilterControl::text(),
        );
        assert_eq!(
            compile(&and_schema, FilterFormState::leaf("test")),
            Some(json!({ "_and": [{ "name": { "_eq": "test" } }, { "title": { "_eq": "test" } }] }))
        );
        let or_schema = FilterExpr::leaf(
            FilterOperator::Equals,
            FilterField::Or {
                or: vec!["name".into(), "title".into()],
            },
            FilterControl::text(),
        );
        assert_eq!(
            compile(&or_schema, FilterFormState::leaf("test")),
            Some(json!({ "_or": [{ "name": { "_eq": "test" } }, { "title": { "_eq": "test" } }] }))
        );
    }

    #[test]
    fn empty_children_collapse_composites() {
        let schema = FilterExpr::And(vec![
            leaf(FilterOperator::Equals, "name"),
            FilterExpr::not(leaf(FilterOperator::Equals, "age")),
            leaf(FilterOperator::In, "tags"),
        ]);
        let state = FilterFormState::And {
            children: vec![
                FilterFormState::leaf(""),
                FilterFormState::Not {
                    child: Box::new(FilterFormState::leaf(Value::Null)),
                },
                FilterFormState::leaf(json!([])),
            ],
        };
        assert_eq!(compile(&schema, state), None);
    }

    #[test]
    fn not_wraps_child() {
        let schema = FilterExpr::not(leaf(FilterOperator::Equals, "status"));
        let state = FilterFormState::Not {
            child: Box::new(FilterFormState::leaf("archived")),
        };
        assert_eq!(
            compile(&schema, state),
            Some(json!({ "_not": { "status": { "_eq": "archived" } } }))
        );
    }

    #[test]
    fn custom_operator_leaf() {
        let schema = FilterExpr::leaf(
            FilterOperator::Equals,
            "custom_field",
            FilterControl::custom_operator(Vec::new(), FilterControl::text()),
        );
        assert_eq!(
            compile(
                &schema,
                FilterFormState::leaf(json!({ "operator": "_custom_op", "value": "x" }))
            ),
            Some(json!({ "custom_field": { "_custom_op": "x" } }))
        );
        for empty in [
            json!({ "operator": "", "value": "x" }),
            json!({ "operator": "_eq", "value": "" }),
            json!({ "operator": "_eq", "value": [] }),
            json!({ "value": "x" }),
            json!({ "operator": "_eq" }),
            json!("x"),
        ] {
            assert_eq!(compile(&schema, FilterFormState::leaf(empty.clone())), None, "{empty}");
        }
    }

    #[test]
    fn transform_overrides_field_and_value() {
        let schema = FilterExpr::Leaf(
            FilterLeaf::new(FilterOperator::Equals, "name", FilterControl::text()).with_transform(
                FilterTransform::new(|raw| TransformOutcome::Override {
                    field: Some("renamed".into()),
                    value: raw.as_str().map(|s| Value::String(s.to_lowercase())),
                }),
            ),
        );
        assert_eq!(
            compile(&schema, FilterFormState::leaf("LOWER")),
            Some(json!({ "renamed": { "_eq": "lower" } }))
        );
    }

    #[test]
    fn transform_condition_short_circuits() {
        let prebuilt = HasuraCondition::from_json(&json!({ "_or": [
            { "email": { "_ilike": "%a%" } },
            { "phone": { "_is_null": false } }
        ] }))
        .expect("condition");
        let expected = prebuilt.clone();
        let schema = FilterExpr::Leaf(
            FilterLeaf::new(FilterOperator::Equals, "ignored", FilterControl::text())
                .with_transform(FilterTransform::new(move |_| {
                    TransformOutcome::Condition(prebuilt.clone())
                })),
        );
        // Even an empty raw value is handed to the transform.
        let out = build_conditions_recursive(&schema, &FilterFormState::leaf(""))
            .expect("compile")
            .expect("condition");
        assert_eq!(out, expected);
    }
}
