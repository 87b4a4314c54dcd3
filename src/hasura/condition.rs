//! Hasura-style boolean expression tree.
//!
//! The wire format is the plain JSON object accepted by `*_bool_exp` GraphQL
//! arguments: `{_and: [...]}`, `{_or: [...]}`, `{_not: {...}}`, or a map from
//! field name to either an operator object (`{_eq: 1}` or `{_gte: 1, _lte: 5}`),
//! an array of operator objects, or a nested condition for relationship/object
//! fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, ViewError};
use crate::hasura::equality::{conditions_are_equal, field_conditions_are_equal};

/// Operator keys understood by the backend, plus an escape hatch for
/// operators declared by `customOperator` controls.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorKey {
    /// `_eq`
    Eq,
    /// `_neq`
    Neq,
    /// `_gt`
    Gt,
    /// `_lt`
    Lt,
    /// `_gte`
    Gte,
    /// `_lte`
    Lte,
    /// `_in`
    In,
    /// `_nin`
    Nin,
    /// `_like`
    Like,
    /// `_ilike`
    Ilike,
    /// `_is_null`
    IsNull,
    /// `_similar`
    Similar,
    /// `_nsimilar`
    Nsimilar,
    /// `_regex`
    Regex,
    /// `_nregex`
    Nregex,
    /// `_iregex`
    Iregex,
    /// `_niregex`
    Niregex,
    /// Any other `_`-prefixed key, kept verbatim.
    Custom(String),
}

impl OperatorKey {
    /// Returns the wire key, including the leading underscore.
    pub fn as_str(&self) -> &str {
        match self {
            OperatorKey::Eq => "_eq",
            OperatorKey::Neq => "_neq",
            OperatorKey::Gt => "_gt",
            OperatorKey::Lt => "_lt",
            OperatorKey::Gte => "_gte",
            OperatorKey::Lte => "_lte",
            OperatorKey::In => "_in",
            OperatorKey::Nin => "_nin",
            OperatorKey::Like => "_like",
            OperatorKey::Ilike => "_ilike",
            OperatorKey::IsNull => "_is_null",
            OperatorKey::Similar => "_similar",
            OperatorKey::Nsimilar => "_nsimilar",
            OperatorKey::Regex => "_regex",
            OperatorKey::Nregex => "_nregex",
            OperatorKey::Iregex => "_iregex",
            OperatorKey::Niregex => "_niregex",
            OperatorKey::Custom(key) => key,
        }
    }

    /// Parses a wire key. Unknown keys become [`OperatorKey::Custom`].
    pub fn from_key(key: &str) -> Self {
        match key {
            "_eq" => OperatorKey::Eq,
            "_neq" => OperatorKey::Neq,
            "_gt" => OperatorKey::Gt,
            "_lt" => OperatorKey::Lt,
            "_gte" => OperatorKey::Gte,
            "_lte" => OperatorKey::Lte,
            "_in" => OperatorKey::In,
            "_nin" => OperatorKey::Nin,
            "_like" => OperatorKey::Like,
            "_ilike" => OperatorKey::Ilike,
            "_is_null" => OperatorKey::IsNull,
            "_similar" => OperatorKey::Similar,
            "_nsimilar" => OperatorKey::Nsimilar,
            "_regex" => OperatorKey::Regex,
            "_nregex" => OperatorKey::Nregex,
            "_iregex" => OperatorKey::Iregex,
            "_niregex" => OperatorKey::Niregex,
            other => OperatorKey::Custom(other.to_owned()),
        }
    }
}

impl fmt::Display for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single `{_op: value}` comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct HasuraOperator {
    /// Operator key.
    pub key: OperatorKey,
    /// Right-hand operand.
    pub value: Value,
}

impl HasuraOperator {
    /// Creates an operator from a key and operand.
    pub fn new(key: OperatorKey, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.key.as_str().to_owned(), self.value.clone());
        Value::Object(map)
    }
}

/// What a field name maps to inside a [`HasuraCondition::Fields`] map.
#[derive(Clone, Debug)]
pub enum FieldCondition {
    /// `field: {_op: value}`
    Operator(HasuraOperator),
    /// `field: [{_op: value}, ...]`
    Operators(Vec<HasuraOperator>),
    /// `field: {_op: value, _other: value}`, several operators in one object.
    OperatorSet(Vec<HasuraOperator>),
    /// `field: {nested condition}` for object and array relationships.
    Nested(Box<HasuraCondition>),
}

impl FieldCondition {
    fn to_json(&self) -> Value {
        match self {
            FieldCondition::Operator(op) => op.to_json(),
            FieldCondition::Operators(ops) => {
                Value::Array(ops.iter().map(HasuraOperator::to_json).collect())
            }
            FieldCondition::OperatorSet(ops) => Value::Object(
                ops.iter()
                    .map(|op| (op.key.as_str().to_owned(), op.value.clone()))
                    .collect(),
            ),
            FieldCondition::Nested(cond) => cond.to_json(),
        }
    }

    fn from_json(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let mut ops = Vec::with_capacity(items.len());
                for item in items {
                    let Value::Object(map) = item else {
                        return Err(ViewError::InvalidCondition(format!(
                            "operator list for '{field}' must contain objects"
                        )));
                    };
                    if !is_operator_object(map) {
                        return Err(ViewError::InvalidCondition(format!(
                            "operator list for '{field}' contains a non-operator object"
                        )));
                    }
                    ops.extend(operators_from_map(map));
                }
                Ok(FieldCondition::Operators(ops))
            }
            Value::Object(map) if is_operator_object(map) => {
                let mut ops = operators_from_map(map);
                if ops.len() == 1 {
                    Ok(FieldCondition::Operator(ops.remove(0)))
                } else {
                    Ok(FieldCondition::OperatorSet(ops))
                }
            }
            Value::Object(_) => Ok(FieldCondition::Nested(Box::new(HasuraCondition::from_json(
                value,
            )?))),
            other => Err(ViewError::InvalidCondition(format!(
                "field '{field}' must map to an object or array, got {other}"
            ))),
        }
    }
}

impl PartialEq for FieldCondition {
    fn eq(&self, other: &Self) -> bool {
        field_conditions_are_equal(self, other)
    }
}

/// Recursive boolean condition.
///
/// `Fields` with an empty map is the neutral `{}` condition. Equality is
/// structural and ignores the order of `_and`/`_or` members.
#[derive(Clone, Debug)]
pub enum HasuraCondition {
    /// `{_and: [...]}`
    And(Vec<HasuraCondition>),
    /// `{_or: [...]}`
    Or(Vec<HasuraCondition>),
    /// `{_not: {...}}`
    Not(Box<HasuraCondition>),
    /// `{field: ..., other: ...}`
    Fields(BTreeMap<String, FieldCondition>),
}

impl Default for HasuraCondition {
    fn default() -> Self {
        HasuraCondition::empty()
    }
}

impl HasuraCondition {
    /// The `{}` condition, which matches every row.
    pub fn empty() -> Self {
        HasuraCondition::Fields(BTreeMap::new())
    }

    /// Returns true for the `{}` condition.
    pub fn is_empty(&self) -> bool {
        matches!(self, HasuraCondition::Fields(fields) if fields.is_empty())
    }

    /// Condition constraining a single (non-dotted) field.
    pub fn field(name: impl Into<String>, condition: FieldCondition) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), condition);
        HasuraCondition::Fields(fields)
    }

    /// Negates `inner`.
    pub fn not(inner: HasuraCondition) -> Self {
        HasuraCondition::Not(Box::new(inner))
    }

    /// Converts the tree into its JSON wire form.
    pub fn to_json(&self) -> Value {
        match self {
            HasuraCondition::And(items) => single_key(
                "_and",
                Value::Array(items.iter().map(HasuraCondition::to_json).collect()),
            ),
            HasuraCondition::Or(items) => single_key(
                "_or",
                Value::Array(items.iter().map(HasuraCondition::to_json).collect()),
            ),
            HasuraCondition::Not(inner) => single_key("_not", inner.to_json()),
            HasuraCondition::Fields(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (name, cond) in fields {
                    map.insert(name.clone(), cond.to_json());
                }
                Value::Object(map)
            }
        }
    }

    /// Reads a condition from its JSON wire form.
    ///
    /// Objects mixing `_and`/`_or`/`_not` with field keys are split into an
    /// `_and` of single-key conditions.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ViewError::InvalidCondition(format!(
                "condition must be an object, got {value}"
            )));
        };
        let logical = map.keys().filter(|k| is_logical_key(k)).count();
        if logical > 0 && map.len() > 1 {
            let mut parts = Vec::with_capacity(map.len());
            for (key, child) in map {
                let mut single = Map::with_capacity(1);
                single.insert(key.clone(), child.clone());
                parts.push(HasuraCondition::from_json(&Value::Object(single))?);
            }
            return Ok(HasuraCondition::And(parts));
        }
        if let Some(items) = map.get("_and") {
            return Ok(HasuraCondition::And(condition_list("_and", items)?));
        }
        if let Some(items) = map.get("_or") {
            return Ok(HasuraCondition::Or(condition_list("_or", items)?));
        }
        if let Some(inner) = map.get("_not") {
            return Ok(HasuraCondition::not(HasuraCondition::from_json(inner)?));
        }
        let mut fields = BTreeMap::new();
        for (name, child) in map {
            fields.insert(name.clone(), FieldCondition::from_json(name, child)?);
        }
        Ok(HasuraCondition::Fields(fields))
    }
}

impl PartialEq for HasuraCondition {
    fn eq(&self, other: &Self) -> bool {
        conditions_are_equal(self, other)
    }
}

impl fmt::Display for HasuraCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for HasuraCondition {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HasuraCondition {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        HasuraCondition::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

fn single_key(key: &str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_owned(), value);
    Value::Object(map)
}

fn is_logical_key(key: &str) -> bool {
    matches!(key, "_and" | "_or" | "_not")
}

/// An object is an operator object when every key is `_`-prefixed and none
/// of them is a logical combinator. A nested field whose name starts with
/// `_` is therefore read as an operator.
fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map
            .keys()
            .all(|key| key.starts_with('_') && !is_logical_key(key))
}

fn operators_from_map(map: &Map<String, Value>) -> Vec<HasuraOperator> {
    map.iter()
        .map(|(key, value)| HasuraOperator::new(OperatorKey::from_key(key), value.clone()))
        .collect()
}

fn condition_list(key: &str, value: &Value) -> Result<Vec<HasuraCondition>> {
    let Value::Array(items) = value else {
        return Err(ViewError::InvalidCondition(format!(
            "{key} must hold an array of conditions"
        )));
    };
    items.iter().map(HasuraCondition::from_json).collect()
}
