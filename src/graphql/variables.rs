//! Variables sent alongside the view query.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::filter::state::FilterState;
use crate::graphql::field_query::{OrderBy, OrderDirection};
use crate::hasura::compile::{build_hasura_conditions, nest_path};
use crate::hasura::condition::{FieldCondition, HasuraCondition, HasuraOperator, OperatorKey};
use crate::view::View;

/// `{conditions, paginationCondition, rowLimit, orderBy}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariables {
    /// User filters and-ed with the view's static conditions.
    pub conditions: HasuraCondition,
    /// Cursor filter, `{}` on the first page.
    pub pagination_condition: HasuraCondition,
    /// Page size.
    pub row_limit: u64,
    /// Pagination key descending, then the view's static ordering.
    pub order_by: Vec<OrderBy>,
}

/// Keyset condition selecting rows strictly after `cursor` in descending
/// order. `{}` when there is no cursor.
pub fn pagination_condition(pagination_key: &str, cursor: Option<&Value>) -> HasuraCondition {
    match cursor {
        Some(value) if !value.is_null() => nest_path(
            pagination_key,
            FieldCondition::Operator(HasuraOperator::new(OperatorKey::Lt, value.clone())),
        ),
        _ => HasuraCondition::empty(),
    }
}

/// Builds the variables for one page of `view`.
///
/// Static conditions always produce an `_and`, even when no user filter is
/// active, so the variable keeps a stable shape.
pub fn build_graphql_query_variables(
    view: &View,
    state: &FilterState,
    row_limit: u64,
    cursor: Option<&Value>,
) -> Result<QueryVariables> {
    let user = build_hasura_conditions(state, &view.filter_schema)?;
    let conditions = if view.static_conditions.is_empty() {
        user
    } else {
        let mut parts = Vec::with_capacity(view.static_conditions.len() + 1);
        parts.push(user);
        parts.extend(view.static_conditions.iter().cloned());
        HasuraCondition::And(parts)
    };
    let mut order_by = Vec::with_capacity(view.static_ordering.len() + 1);
    order_by.push(OrderBy::new(view.pagination_key.clone(), OrderDirection::Desc));
    order_by.extend(view.static_ordering.iter().cloned());
    Ok(QueryVariables {
        conditions,
        pagination_condition: pagination_condition(&view.pagination_key, cursor),
        row_limit,
        order_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cursor_condition_nests_dotted_keys() {
        assert!(pagination_condition("id", None).is_empty());
        assert!(pagination_condition("id", Some(&Value::Null)).is_empty());
        assert_eq!(
            pagination_condition("meta.created_at", Some(&json!("2024-01-01"))).to_json(),
            json!({ "meta": { "created_at": { "_lt": "2024-01-01" } } })
        );
    }
}
