//! Declarative filter schema: which field a filter targets, which input
//! control collects its value, and how leaves combine.
//!
//! The JSON form uses a `type` tag on every node, e.g.
//! `{"type": "equals", "field": "user.name", "value": {"type": "text"}}` or
//! `{"type": "and", "filters": [...]}`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NodeKind, Result};
use crate::hasura::condition::{HasuraCondition, OperatorKey};

/// Stable identifier of a filter definition.
pub type FilterId = String;

/// Field (or field group) a leaf compares against. Paths use `.` to reach
/// into relationships.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterField {
    /// Single dotted path.
    Path(String),
    /// Every path must satisfy the comparison.
    And {
        /// Paths combined with `_and`.
        and: Vec<String>,
    },
    /// Any path may satisfy the comparison.
    Or {
        /// Paths combined with `_or`.
        or: Vec<String>,
    },
}

impl FilterField {
    /// All dotted paths referenced by this field.
    pub fn paths(&self) -> &[String] {
        match self {
            FilterField::Path(path) => std::slice::from_ref(path),
            FilterField::And { and } => and,
            FilterField::Or { or } => or,
        }
    }
}

impl From<&str> for FilterField {
    fn from(path: &str) -> Self {
        FilterField::Path(path.to_owned())
    }
}

impl From<String> for FilterField {
    fn from(path: String) -> Self {
        FilterField::Path(path)
    }
}

/// Label/value pair offered by dropdowns and operator pickers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Display label.
    pub label: String,
    /// Submitted value.
    pub value: Value,
}

impl SelectOption {
    /// Creates an option.
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Shape of the input collecting a leaf's value, with its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FilterControl {
    /// Free text.
    Text {
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
        /// Hint shown while empty.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    /// Numeric input.
    Number {
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
        /// Lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Date picker. Values are ISO-8601 strings.
    Date {
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
    },
    /// Single choice among fixed items.
    Dropdown {
        /// Selectable items.
        #[serde(default)]
        items: Vec<SelectOption>,
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
    },
    /// Several choices among fixed items.
    Multiselect {
        /// Selectable items.
        #[serde(default)]
        items: Vec<SelectOption>,
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
    },
    /// Nested value control plus a selectable operator; the leaf value is
    /// `{operator, value}`.
    CustomOperator {
        /// Selectable operators; the first is the default.
        operators: Vec<SelectOption>,
        /// Control collecting the operand.
        value_control: Box<FilterControl>,
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
    },
    /// Text input with suggestions from a named source.
    Autocomplete {
        /// Suggestion source name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
    },
    /// Opaque control rendered by a registered component.
    Custom {
        /// Registered component name.
        component: String,
        /// Component properties.
        #[serde(default)]
        props: Value,
        /// Declared default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_value: Option<Value>,
    },
}

impl FilterControl {
    /// Text control without default.
    pub fn text() -> Self {
        FilterControl::Text {
            initial_value: None,
            placeholder: None,
        }
    }

    /// Number control without default.
    pub fn number() -> Self {
        FilterControl::Number {
            initial_value: None,
            min: None,
            max: None,
        }
    }

    /// Date control without default.
    pub fn date() -> Self {
        FilterControl::Date {
            initial_value: None,
        }
    }

    /// Operator picker wrapping `value_control`.
    pub fn custom_operator(operators: Vec<SelectOption>, value_control: FilterControl) -> Self {
        FilterControl::CustomOperator {
            operators,
            value_control: Box::new(value_control),
            initial_value: None,
        }
    }

    /// Returns a copy with `initial_value` set.
    pub fn with_initial_value(mut self, value: impl Into<Value>) -> Self {
        let slot = match &mut self {
            FilterControl::Text { initial_value, .. }
            | FilterControl::Number { initial_value, .. }
            | FilterControl::Date { initial_value }
            | FilterControl::Dropdown { initial_value, .. }
            | FilterControl::Multiselect { initial_value, .. }
            | FilterControl::CustomOperator { initial_value, .. }
            | FilterControl::Autocomplete { initial_value, .. }
            | FilterControl::Custom { initial_value, .. } => initial_value,
        };
        *slot = Some(value.into());
        self
    }

    /// Declared default, if any.
    pub fn initial_value(&self) -> Option<&Value> {
        match self {
            FilterControl::Text { initial_value, .. }
            | FilterControl::Number { initial_value, .. }
            | FilterControl::Date { initial_value }
            | FilterControl::Dropdown { initial_value, .. }
            | FilterControl::Multiselect { initial_value, .. }
            | FilterControl::CustomOperator { initial_value, .. }
            | FilterControl::Autocomplete { initial_value, .. }
            | FilterControl::Custom { initial_value, .. } => initial_value.as_ref(),
        }
    }

    /// Value an untouched control holds.
    pub fn empty_value(&self) -> Value {
        match self {
            FilterControl::Multiselect { .. } => Value::Array(Vec::new()),
            FilterControl::Custom { .. } => Value::Null,
            _ => Value::String(String::new()),
        }
    }

    /// First selectable operator of a `customOperator` control.
    pub fn first_operator(&self) -> Option<&Value> {
        match self {
            FilterControl::CustomOperator { operators, .. } => {
                operators.first().map(|option| &option.value)
            }
            _ => None,
        }
    }

    /// Whether the control (or its wrapped value control) collects a date.
    pub fn is_date(&self) -> bool {
        match self {
            FilterControl::Date { .. } => true,
            FilterControl::CustomOperator { value_control, .. } => value_control.is_date(),
            _ => false,
        }
    }
}

/// Comparison a leaf performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `equals`
    Equals,
    /// `notEquals`
    NotEquals,
    /// `greaterThan`
    GreaterThan,
    /// `lessThan`
    LessThan,
    /// `greaterThanOrEqual`
    GreaterThanOrEqual,
    /// `lessThanOrEqual`
    LessThanOrEqual,
    /// `in`
    In,
    /// `notIn`
    NotIn,
    /// `like`
    Like,
    /// `iLike`
    ILike,
    /// `isNull`
    IsNull,
}

impl FilterOperator {
    /// Schema name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "notEquals",
            FilterOperator::GreaterThan => "greaterThan",
            FilterOperator::LessThan => "lessThan",
            FilterOperator::GreaterThanOrEqual => "greaterThanOrEqual",
            FilterOperator::LessThanOrEqual => "lessThanOrEqual",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
            FilterOperator::Like => "like",
            FilterOperator::ILike => "iLike",
            FilterOperator::IsNull => "isNull",
        }
    }

    /// Backend operator this comparison compiles to.
    pub fn hasura_key(self) -> OperatorKey {
        match self {
            FilterOperator::Equals => OperatorKey::Eq,
            FilterOperator::NotEquals => OperatorKey::Neq,
            FilterOperator::GreaterThan => OperatorKey::Gt,
            FilterOperator::LessThan => OperatorKey::Lt,
            FilterOperator::GreaterThanOrEqual => OperatorKey::Gte,
            FilterOperator::LessThanOrEqual => OperatorKey::Lte,
            FilterOperator::In => OperatorKey::In,
            FilterOperator::NotIn => OperatorKey::Nin,
            FilterOperator::Like => OperatorKey::Like,
            FilterOperator::ILike => OperatorKey::Ilike,
            FilterOperator::IsNull => OperatorKey::IsNull,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a leaf's `toQuery` hook.
#[derive(Clone, Debug)]
pub enum TransformOutcome {
    /// Replace the field and/or value before the operator is applied.
    Override {
        /// Replacement field, if any.
        field: Option<FilterField>,
        /// Replacement value, if any.
        value: Option<Value>,
    },
    /// Use this condition for the whole leaf.
    Condition(HasuraCondition),
}

type ToQueryFn = dyn Fn(&Value) -> TransformOutcome + Send + Sync;

/// Per-leaf hook that rewrites the compiled field/value or supplies the
/// condition outright.
#[derive(Clone)]
pub struct FilterTransform {
    to_query: Arc<ToQueryFn>,
}

impl FilterTransform {
    /// Wraps a `toQuery` function.
    pub fn new<F>(to_query: F) -> Self
    where
        F: Fn(&Value) -> TransformOutcome + Send + Sync + 'static,
    {
        Self {
            to_query: Arc::new(to_query),
        }
    }

    /// Invokes the hook with the leaf's raw form value.
    pub fn to_query(&self, raw: &Value) -> TransformOutcome {
        (self.to_query)(raw)
    }
}

impl fmt::Debug for FilterTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterTransform(..)")
    }
}

impl PartialEq for FilterTransform {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.to_query, &other.to_query)
    }
}

/// Comparison leaf of a [`FilterExpr`].
#[derive(Clone, Debug, PartialEq)]
pub struct FilterLeaf {
    /// Comparison performed.
    pub op: FilterOperator,
    /// Target field(s).
    pub field: FilterField,
    /// Input control collecting the value.
    pub value: FilterControl,
    /// Resolved transform hook.
    pub transform: Option<FilterTransform>,
    /// Runtime reference naming the transform in view JSON.
    pub transform_ref: Option<String>,
}

impl FilterLeaf {
    /// Creates a leaf without transform.
    pub fn new(op: FilterOperator, field: impl Into<FilterField>, value: FilterControl) -> Self {
        Self {
            op,
            field: field.into(),
            value,
            transform: None,
            transform_ref: None,
        }
    }

    /// Attaches a resolved transform.
    pub fn with_transform(mut self, transform: FilterTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Recursive filter schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFilterExpr", into = "RawFilterExpr")]
pub enum FilterExpr {
    /// Single comparison.
    Leaf(FilterLeaf),
    /// All children must hold.
    And(Vec<FilterExpr>),
    /// Any child may hold.
    Or(Vec<FilterExpr>),
    /// Child must not hold.
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Leaf node for `op` over `field`.
    pub fn leaf(op: FilterOperator, field: impl Into<FilterField>, value: FilterControl) -> Self {
        FilterExpr::Leaf(FilterLeaf::new(op, field, value))
    }

    /// Negation of `inner`.
    pub fn not(inner: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(inner))
    }

    /// Node type, for mismatch reporting.
    pub fn kind(&self) -> NodeKind {
        match self {
            FilterExpr::Leaf(_) => NodeKind::Leaf,
            FilterExpr::And(_) => NodeKind::And,
            FilterExpr::Or(_) => NodeKind::Or,
            FilterExpr::Not(_) => NodeKind::Not,
        }
    }

    /// True for comparison leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(self, FilterExpr::Leaf(_))
    }

    /// Returns the leaf payload, if this is a leaf.
    pub fn as_leaf(&self) -> Option<&FilterLeaf> {
        match self {
            FilterExpr::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// All leaves in pre-order, children in declared order.
    pub fn field_nodes(&self) -> Vec<&FilterLeaf> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Visits every leaf mutably, stopping at the first error.
    pub fn try_for_each_leaf_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut FilterLeaf) -> Result<()>,
    {
        match self {
            FilterExpr::Leaf(leaf) => f(leaf),
            FilterExpr::And(children) | FilterExpr::Or(children) => {
                for child in children {
                    child.try_for_each_leaf_mut(f)?;
                }
                Ok(())
            }
            FilterExpr::Not(child) => child.try_for_each_leaf_mut(f),
        }
    }
}

fn collect_leaves<'a>(expr: &'a FilterExpr, out: &mut Vec<&'a FilterLeaf>) {
    match expr {
        FilterExpr::Leaf(leaf) => out.push(leaf),
        FilterExpr::And(children) | FilterExpr::Or(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
        FilterExpr::Not(child) => collect_leaves(child, out),
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct RawLeaf {
    field: FilterField,
    value: FilterControl,
    #[serde(default, rename = "transform", skip_serializing_if = "Option::is_none")]
    transform_ref: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RawFilterExpr {
    Equals(RawLeaf),
    NotEquals(RawLeaf),
    GreaterThan(RawLeaf),
    LessThan(RawLeaf),
    GreaterThanOrEqual(RawLeaf),
    LessThanOrEqual(RawLeaf),
    In(RawLeaf),
    NotIn(RawLeaf),
    Like(RawLeaf),
    #[serde(rename = "iLike")]
    ILike(RawLeaf),
    IsNull(RawLeaf),
    And { filters: Vec<FilterExpr> },
    Or { filters: Vec<FilterExpr> },
    Not { filter: Box<FilterExpr> },
}

impl From<RawFilterExpr> for FilterExpr {
    fn from(raw: RawFilterExpr) -> Self {
        let (op, leaf) = match raw {
            RawFilterExpr::And { filters } => return FilterExpr::And(filters),
            RawFilterExpr::Or { filters } => return FilterExpr::Or(filters),
            RawFilterExpr::Not { filter } => return FilterExpr::Not(filter),
            RawFilterExpr::Equals(leaf) => (FilterOperator::Equals, leaf),
            RawFilterExpr::NotEquals(leaf) => (FilterOperator::NotEquals, leaf),
            RawFilterExpr::GreaterThan(leaf) => (FilterOperator::GreaterThan, leaf),
            RawFilterExpr::LessThan(leaf) => (FilterOperator::LessThan, leaf),
            RawFilterExpr::GreaterThanOrEqual(leaf) => (FilterOperator::GreaterThanOrEqual, leaf),
            RawFilterExpr::LessThanOrEqual(leaf) => (FilterOperator::LessThanOrEqual, leaf),
            RawFilterExpr::In(leaf) => (FilterOperator::In, leaf),
            RawFilterExpr::NotIn(leaf) => (FilterOperator::NotIn, leaf),
            RawFilterExpr::Like(leaf) => (FilterOperator::Like, leaf),
            RawFilterExpr::ILike(leaf) => (FilterOperator::ILike, leaf),
            RawFilterExpr::IsNull(leaf) => (FilterOperator::IsNull, leaf),
        };
        FilterExpr::Leaf(FilterLeaf {
            op,
            field: leaf.field,
            value: leaf.value,
            transform: None,
            transform_ref: leaf.transform_ref,
        })
    }
}

impl From<FilterExpr> for RawFilterExpr {
    fn from(expr: FilterExpr) -> Self {
        match expr {
            FilterExpr::And(filters) => RawFilterExpr::And { filters },
            FilterExpr::Or(filters) => RawFilterExpr::Or { filters },
            FilterExpr::Not(filter) => RawFilterExpr::Not { filter },
            FilterExpr::Leaf(leaf) => {
                let raw = RawLeaf {
                    field: leaf.field,
                    value: leaf.value,
                    transform_ref: leaf.transform_ref,
                };
                match leaf.op {
                    FilterOperator::Equals => RawFilterExpr::Equals(raw),
                    FilterOperator::NotEquals => RawFilterExpr::NotEquals(raw),
                    FilterOperator::GreaterThan => RawFilterExpr::GreaterThan(raw),
                    FilterOperator::LessThan => RawFilterExpr::LessThan(raw),
                    FilterOperator::GreaterThanOrEqual => RawFilterExpr::GreaterThanOrEqual(raw),
                    FilterOperator::LessThanOrEqual => RawFilterExpr::LessThanOrEqual(raw),
                    FilterOperator::In => RawFilterExpr::In(raw),
                    FilterOperator::NotIn => RawFilterExpr::NotIn(raw),
                    FilterOperator::Like => RawFilterExpr::Like(raw),
                    FilterOperator::ILike => RawFilterExpr::ILike(raw),
                    FilterOperator::IsNull => RawFilterExpr::IsNull(raw),
                }
            }
        }
    }
}

/// Grouping shown by filter forms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterFieldGroup {
    /// Group key referenced by [`FilterSchema::group`].
    pub name: String,
    /// Display label.
    pub label: String,
}

/// One filter definition of a view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSchema {
    /// Stable id; keys the filter's state.
    pub id: FilterId,
    /// Display label.
    pub label: String,
    /// Schema tree.
    pub expression: FilterExpr,
    /// Owning group name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Whether the assistant produced this filter.
    #[serde(default)]
    pub ai_generated: bool,
}

/// All filters of a view plus their groups.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSchemasAndGroups {
    /// Display groups.
    #[serde(default)]
    pub groups: Vec<FilterFieldGroup>,
    /// Filter definitions.
    #[serde(default)]
    pub filters: Vec<FilterSchema>,
}

impl FilterSchemasAndGroups {
    /// Looks up a filter definition by id.
    pub fn schema(&self, id: &str) -> Option<&FilterSchema> {
        self.filters.iter().find(|schema| schema.id == id)
    }
}
