//! Query document AST for a view.

use std::fmt;

use serde_json::Value;

use crate::graphql::field_query::OrderBy;
use crate::graphql::render::render_graphql_query;
use crate::graphql::selection::{ensure_selected, generate_selection_set_from_columns, SelectionSetItem};
use crate::hasura::condition::{FieldCondition, HasuraCondition};
use crate::view::View;

/// Name of the generated operation.
pub const OPERATION_NAME: &str = "ViewQuery";

/// Variable holding the compiled filter conditions.
pub const CONDITIONS_VAR: &str = "conditions";
/// Variable holding the cursor condition.
pub const PAGINATION_CONDITION_VAR: &str = "paginationCondition";
/// Variable holding the page size.
pub const ROW_LIMIT_VAR: &str = "rowLimit";
/// Variable holding the root ordering.
pub const ORDER_BY_VAR: &str = "orderBy";

/// `$name: Type` in the operation header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDefinition {
    /// Variable name without `$`.
    pub name: String,
    /// GraphQL type, e.g. `users_bool_exp!`.
    pub type_name: String,
}

impl VariableDefinition {
    /// Creates a definition.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Value in argument position.
#[derive(Clone, Debug, PartialEq)]
pub enum GqlValue {
    /// `$name`
    Variable(String),
    /// Bare enum value such as `DESC`.
    Enum(String),
    /// JSON scalar, list or object written in GraphQL syntax.
    Scalar(Value),
    /// `[a, b]`
    List(Vec<GqlValue>),
    /// `{key: value}` with keys in insertion order.
    Object(Vec<(String, GqlValue)>),
}

impl GqlValue {
    /// Object with a single entry.
    pub fn entry(key: impl Into<String>, value: GqlValue) -> Self {
        GqlValue::Object(vec![(key.into(), value)])
    }

    /// Condition in GraphQL input-object form.
    pub fn from_condition(condition: &HasuraCondition) -> Self {
        match condition {
            HasuraCondition::And(items) => GqlValue::entry(
                "_and",
                GqlValue::List(items.iter().map(GqlValue::from_condition).collect()),
            ),
            HasuraCondition::Or(items) => GqlValue::entry(
                "_or",
                GqlValue::List(items.iter().map(GqlValue::from_condition).collect()),
            ),
            HasuraCondition::Not(inner) => GqlValue::entry("_not", GqlValue::from_condition(inner)),
            HasuraCondition::Fields(fields) => GqlValue::Object(
                fields
                    .iter()
                    .map(|(name, cond)| (name.clone(), field_condition_value(cond)))
                    .collect(),
            ),
        }
    }

    /// Ordering with directions as enum values.
    pub fn from_order_by(order: &OrderBy) -> Self {
        let mut current = GqlValue::Enum(order.direction.as_str().to_owned());
        for segment in order.field.rsplit('.') {
            current = GqlValue::entry(segment, current);
        }
        current
    }
}

fn field_condition_value(cond: &FieldCondition) -> GqlValue {
    match cond {
        FieldCondition::Operator(op) => {
            GqlValue::entry(op.key.as_str(), GqlValue::Scalar(op.value.clone()))
        }
        FieldCondition::Operators(ops) | FieldCondition::OperatorSet(ops) => GqlValue::Object(
            ops.iter()
                .map(|op| (op.key.as_str().to_owned(), GqlValue::Scalar(op.value.clone())))
                .collect(),
        ),
        FieldCondition::Nested(inner) => GqlValue::from_condition(inner),
    }
}

impl fmt::Display for GqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GqlValue::Variable(name) => write!(f, "${name}"),
            GqlValue::Enum(name) => f.write_str(name),
            GqlValue::Scalar(value) => write_json_value(f, value),
            GqlValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            GqlValue::Object(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// GraphQL `Name`: `[_A-Za-z][_0-9A-Za-z]*`.
pub(crate) fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Strings are JSON-quoted; object keys are written bare, so callers reject
/// keys that fail [`is_graphql_name`] before a value reaches the document.
fn write_json_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_json_value(f, item)?;
            }
            f.write_str("]")
        }
        Value::Object(map) => {
            f.write_str("{")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: ")?;
                write_json_value(f, item)?;
            }
            f.write_str("}")
        }
        other => write!(f, "{other}"),
    }
}

/// `name: value` argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Argument value.
    pub value: GqlValue,
}

impl Argument {
    /// Creates an argument.
    pub fn new(name: impl Into<String>, value: GqlValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Arguments of a nested selection in render order: `where`, `orderBy`,
/// `distinctOn`, `limit`, `offset`, `path`.
pub fn selection_arguments(item: &SelectionSetItem) -> Vec<Argument> {
    let mut args = Vec::new();
    if let Some(cond) = &item.where_ {
        args.push(Argument::new("where", GqlValue::from_condition(cond)));
    }
    if let Some(order) = &item.order_by {
        args.push(Argument::new(
            "orderBy",
            GqlValue::List(order.iter().map(GqlValue::from_order_by).collect()),
        ));
    }
    if let Some(columns) = &item.distinct_on {
        args.push(Argument::new(
            "distinctOn",
            GqlValue::List(columns.iter().cloned().map(GqlValue::Enum).collect()),
        ));
    }
    if let Some(limit) = item.limit {
        args.push(Argument::new("limit", GqlValue::Scalar(limit.into())));
    }
    if let Some(offset) = item.offset {
        args.push(Argument::new("offset", GqlValue::Scalar(offset.into())));
    }
    if let Some(path) = &item.path {
        args.push(Argument::new("path", GqlValue::Scalar(Value::String(path.clone()))));
    }
    args
}

/// Root collection call.
#[derive(Clone, Debug, PartialEq)]
pub struct RootField {
    /// Collection name.
    pub field: String,
    /// Root arguments.
    pub arguments: Vec<Argument>,
    /// Requested fields.
    pub selections: Vec<SelectionSetItem>,
}

/// Complete query document.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphQLQueryAst {
    /// Operation name.
    pub operation_name: String,
    /// Operation variables.
    pub variables: Vec<VariableDefinition>,
    /// Root collection call.
    pub root: RootField,
}

/// Builds the query AST for `view`.
///
/// The filter and cursor arrive as separate variables so paging never
/// changes the document text.
pub fn generate_graphql_query_ast(view: &View) -> GraphQLQueryAst {
    let mut selections = generate_selection_set_from_columns(&view.column_definitions);
    ensure_selected(&mut selections, &view.pagination_key);

    let bool_exp = format!("{}!", view.bool_exp_type);
    let variables = vec![
        VariableDefinition::new(CONDITIONS_VAR, bool_exp.clone()),
        VariableDefinition::new(PAGINATION_CONDITION_VAR, bool_exp),
        VariableDefinition::new(ROW_LIMIT_VAR, "Int"),
        VariableDefinition::new(ORDER_BY_VAR, view.order_by_type.clone()),
    ];
    let arguments = vec![
        Argument::new(
            "where",
            GqlValue::entry(
                "_and",
                GqlValue::List(vec![
                    GqlValue::Variable(CONDITIONS_VAR.to_owned()),
                    GqlValue::Variable(PAGINATION_CONDITION_VAR.to_owned()),
                ]),
            ),
        ),
        Argument::new("limit", GqlValue::Variable(ROW_LIMIT_VAR.to_owned())),
        Argument::new("orderBy", GqlValue::Variable(ORDER_BY_VAR.to_owned())),
    ];
    GraphQLQueryAst {
        operation_name: OPERATION_NAME.to_owned(),
        variables,
        root: RootField {
            field: view.collection_name.clone(),
            arguments,
            selections,
        },
    }
}

/// Builds and renders the query document for `view`.
pub fn generate_graphql_query(view: &View) -> String {
    render_graphql_query(&generate_graphql_query_ast(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn condition_values_use_input_object_syntax() {
        let cond = HasuraCondition::from_json(&json!({
            "_or": [
                { "name": { "_ilike": "%a\"b%" } },
                { "author": { "tags": { "_in": ["x", 2] } } },
                { "_not": { "deleted_at": { "_is_null": false } } }
            ]
        }))
        .expect("condition");
        assert_eq!(
            GqlValue::from_condition(&cond).to_string(),
            r#"{_or: [{name: {_ilike: "%a\"b%"}}, {author: {tags: {_in: ["x", 2]}}}, {_not: {deleted_at: {_is_null: false}}}]}"#
        );
    }

    #[test]
    fn ordering_renders_bare_enums() {
        let order = OrderBy::new(
            "author.name",
            crate::graphql::field_query::OrderDirection::Desc,
        );
        assert_eq!(GqlValue::from_order_by(&order).to_string(), "{author: {name: DESC}}");
    }

    #[test]
    fn nested_arguments_in_fixed_order() {
        let item = SelectionSetItem {
            limit: Some(10),
            distinct_on: Some(vec!["user_id".into(), "created_at".into()]),
            ..SelectionSetItem::new("items")
        };
        let rendered: Vec<String> = selection_arguments(&item)
            .iter()
            .map(|arg| format!("{}: {}", arg.name, arg.value))
            .collect();
        assert_eq!(rendered, ["distinctOn: [user_id, created_at]", "limit: 10"]);
    }

    #[test]
    fn json_object_operands_render_with_bare_keys() {
        let value = GqlValue::Scalar(json!({ "a": { "b": [1, "c"] } }));
        assert_eq!(value.to_string(), r#"{a: {b: [1, "c"]}}"#);
    }

    #[test]
    fn operator_objects_render_every_key() {
        let cond = HasuraCondition::from_json(&json!({ "total": { "_gte": 10, "_lte": 50 } }))
            .expect("condition");
        assert_eq!(
            GqlValue::from_condition(&cond).to_string(),
            "{total: {_gte: 10, _lte: 50}}"
        );
    }

    #[test]
    fn graphql_names() {
        assert!(is_graphql_name("created_at"));
        assert!(is_graphql_name("_gte"));
        assert!(is_graphql_name("a1"));
        assert!(!is_graphql_name(""));
        assert!(!is_graphql_name("1a"));
        assert!(!is_graphql_name("bad key"));
        assert!(!is_graphql_name("a}b"));
    }
}
