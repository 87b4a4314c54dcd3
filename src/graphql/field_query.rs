//! Column data declarations: which fields a column reads and how.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, ViewError};
use crate::graphql::ast::is_graphql_name;
use crate::hasura::condition::{FieldCondition, HasuraCondition};

/// One field request of a column.
///
/// JSON form: `{"type": "field", "path": "user.name"}`,
/// `{"type": "queryConfigs", "configs": [...]}` or
/// `{"type": "fieldAlias", "alias": "x", "query": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FieldQuery {
    /// Dotted path; every segment becomes one selection level.
    Field {
        /// Dotted field path.
        path: String,
    },
    /// Chain of hops, each a selection level with its own arguments.
    QueryConfigs {
        /// Hops from the root outward.
        configs: Vec<QueryConfig>,
    },
    /// Renames the result of `query`.
    FieldAlias {
        /// Response key to use.
        alias: String,
        /// Aliased request.
        query: Box<FieldQuery>,
    },
}

impl FieldQuery {
    /// `field` request for a dotted path.
    pub fn field(path: impl Into<String>) -> Self {
        FieldQuery::Field { path: path.into() }
    }

    /// `queryConfigs` request.
    pub fn configs(configs: Vec<QueryConfig>) -> Self {
        FieldQuery::QueryConfigs { configs }
    }

    /// Single-hop collection request with arguments, e.g. a relationship
    /// filtered by `where` and capped by `limit`.
    pub fn array(config: QueryConfig) -> Self {
        FieldQuery::QueryConfigs {
            configs: vec![config],
        }
    }

    /// Aliases `query` as `alias`.
    pub fn alias(alias: impl Into<String>, query: FieldQuery) -> Self {
        FieldQuery::FieldAlias {
            alias: alias.into(),
            query: Box::new(query),
        }
    }

    /// Key the backend returns at row level when no alias applies.
    pub fn root_key(&self) -> Option<&str> {
        match self {
            FieldQuery::Field { path } => path.split('.').next(),
            FieldQuery::QueryConfigs { configs } => configs.first().map(|c| c.field.as_str()),
            FieldQuery::FieldAlias { query, .. } => query.root_key(),
        }
    }
}

/// One hop of a `queryConfigs` chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    /// Field selected at this level.
    pub field: String,
    /// JSON path argument for JSON columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Ordering of an array relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderBy>>,
    /// Row cap of an array relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Rows skipped before `limit` applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Columns to deduplicate on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_on: Option<Vec<String>>,
    /// Filter of an array relationship.
    #[serde(
        default,
        rename = "where",
        deserialize_with = "inline_condition",
        skip_serializing_if = "Option::is_none"
    )]
    pub where_: Option<HasuraCondition>,
}

impl QueryConfig {
    /// Hop selecting `field` without arguments.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            path: None,
            order_by: None,
            limit: None,
            offset: None,
            distinct_on: None,
            where_: None,
        }
    }

    /// Sets the JSON path argument.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the ordering.
    pub fn order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Sets the row cap.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the distinct columns.
    pub fn distinct_on<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct_on = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the filter.
    pub fn filter(mut self, condition: HasuraCondition) -> Self {
        self.where_ = Some(condition);
        self
    }
}

/// Sort direction, rendered as an uppercase enum value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    /// `ASC`
    Asc,
    /// `DESC`
    Desc,
    /// `ASC_NULLS_FIRST`
    AscNullsFirst,
    /// `ASC_NULLS_LAST`
    AscNullsLast,
    /// `DESC_NULLS_FIRST`
    DescNullsFirst,
    /// `DESC_NULLS_LAST`
    DescNullsLast,
}

impl OrderDirection {
    /// Enum value as sent to the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
            OrderDirection::AscNullsFirst => "ASC_NULLS_FIRST",
            OrderDirection::AscNullsLast => "ASC_NULLS_LAST",
            OrderDirection::DescNullsFirst => "DESC_NULLS_FIRST",
            OrderDirection::DescNullsLast => "DESC_NULLS_LAST",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderDirection {
    type Err = ViewError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "ASC" => Ok(OrderDirection::Asc),
            "DESC" => Ok(OrderDirection::Desc),
            "ASC_NULLS_FIRST" => Ok(OrderDirection::AscNullsFirst),
            "ASC_NULLS_LAST" => Ok(OrderDirection::AscNullsLast),
            "DESC_NULLS_FIRST" => Ok(OrderDirection::DescNullsFirst),
            "DESC_NULLS_LAST" => Ok(OrderDirection::DescNullsLast),
            _ => Err(ViewError::InvalidFieldQuery(format!(
                "unknown order direction '{raw}'"
            ))),
        }
    }
}

/// Ordering over a (possibly dotted) field.
///
/// JSON form nests dotted paths: `user.name DESC` is `{"user": {"name": "DESC"}}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    /// Dotted field path.
    pub field: String,
    /// Direction.
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates an ordering.
    pub fn new(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Nested JSON form.
    pub fn to_json(&self) -> Value {
        let mut current = Value::String(self.direction.as_str().to_owned());
        for segment in self.field.rsplit('.') {
            let mut map = Map::with_capacity(1);
            map.insert(segment.to_owned(), current);
            current = Value::Object(map);
        }
        current
    }

    /// Reads the nested JSON form.
    pub fn from_json(value: &Value) -> Result<Self> {
        let mut segments = Vec::new();
        let mut current = value;
        loop {
            match current {
                Value::Object(map) if map.len() == 1 => {
                    let Some((key, inner)) = map.iter().next() else {
                        break;
                    };
                    segments.push(key.as_str());
                    current = inner;
                }
                Value::String(direction) if !segments.is_empty() => {
                    return Ok(OrderBy::new(segments.join("."), direction.parse()?));
                }
                _ => break,
            }
        }
        Err(ViewError::InvalidFieldQuery(format!(
            "ordering must be a single-key object ending in a direction, got {value}"
        )))
    }
}

impl Serialize for OrderBy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OrderBy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        OrderBy::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

/// `where` renders inline in the document, so operand object keys must be
/// GraphQL names.
fn inline_condition<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<HasuraCondition>, D::Error>
where
    D: Deserializer<'de>,
{
    let condition = Option::<HasuraCondition>::deserialize(deserializer)?;
    if let Some(cond) = &condition {
        check_inline_condition(cond).map_err(serde::de::Error::custom)?;
    }
    Ok(condition)
}

fn check_inline_condition(cond: &HasuraCondition) -> Result<()> {
    match cond {
        HasuraCondition::And(items) | HasuraCondition::Or(items) => {
            items.iter().try_for_each(check_inline_condition)
        }
        HasuraCondition::Not(inner) => check_inline_condition(inner),
        HasuraCondition::Fields(fields) => fields.values().try_for_each(|field| match field {
            FieldCondition::Operator(op) => check_inline_operand(&op.value),
            FieldCondition::Operators(ops) | FieldCondition::OperatorSet(ops) => {
                ops.iter().try_for_each(|op| check_inline_operand(&op.value))
            }
            FieldCondition::Nested(inner) => check_inline_condition(inner),
        }),
    }
}

fn check_inline_operand(value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => items.iter().try_for_each(check_inline_operand),
        Value::Object(map) => map.iter().try_for_each(|(key, item)| {
            if !is_graphql_name(key) {
                return Err(ViewError::InvalidFieldQuery(format!(
                    "where operand key '{key}' is not a GraphQL name"
                )));
            }
            check_inline_operand(item)
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_query_json_forms() {
        let queries: Vec<FieldQuery> = serde_json::from_value(json!([
            { "type": "field", "path": "user.name" },
            { "type": "fieldAlias", "alias": "recent", "query": {
                "type": "queryConfigs",
                "configs": [{ "field": "tasks", "limit": 5, "orderBy": [{ "created_at": "desc" }] }]
            } }
        ]))
        .expect("valid field queries");
        assert_eq!(queries[0], FieldQuery::field("user.name"));
        assert_eq!(
            queries[1],
            FieldQuery::alias(
                "recent",
                FieldQuery::array(
                    QueryConfig::new("tasks")
                        .limit(5)
                        .order_by(vec![OrderBy::new("created_at", OrderDirection::Desc)])
                )
            )
        );
        assert_eq!(queries[0].root_key(), Some("user"));
        assert_eq!(queries[1].root_key(), Some("tasks"));
    }

    #[test]
    fn order_by_nests_dotted_fields() {
        let order = OrderBy::new("author.profile.name", OrderDirection::AscNullsLast);
        let json = serde_json::to_value(&order).expect("serialize");
        assert_eq!(json, json!({ "author": { "profile": { "name": "ASC_NULLS_LAST" } } }));
        let back: OrderBy = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, order);
    }

    #[test]
    fn order_by_rejects_malformed_json() {
        assert!(OrderBy::from_json(&json!({ "a": 1 })).is_err());
        assert!(OrderBy::from_json(&json!({ "a": "up" })).is_err());
        assert!(OrderBy::from_json(&json!({ "a": "asc", "b": "desc" })).is_err());
        assert!(OrderBy::from_json(&json!("asc")).is_err());
    }

    #[test]
    fn query_config_where_is_a_condition() {
        let config: QueryConfig = serde_json::from_value(json!({
            "field": "tasks",
            "distinctOn": ["user_id"],
            "where": { "done": { "_eq": false } }
        }))
        .expect("valid config");
        assert_eq!(config.distinct_on, Some(vec!["user_id".to_owned()]));
        assert_eq!(
            config.where_.map(|c| c.to_json()),
            Some(json!({ "done": { "_eq": false } }))
        );
    }

    #[test]
    fn query_config_where_rejects_unrenderable_operand_keys() {
        let err = serde_json::from_value::<QueryConfig>(json!({
            "field": "tasks",
            "where": { "meta": { "_contains": { "bad key}": 1 } } }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("bad key}"), "{err}");

        let config: QueryConfig = serde_json::from_value(json!({
            "field": "tasks",
            "where": { "meta": { "_contains": { "priority": [{ "level": 2 }] } } }
        }))
        .expect("name keys are accepted");
        assert!(config.where_.is_some());
    }
}
