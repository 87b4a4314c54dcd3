//! Shapes raw response rows into per-column cell data.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::graphql::field_query::FieldQuery;
use crate::view::ColumnDefinition;

/// Cell data per column id.
pub type FlattenedDataRow = BTreeMap<String, Map<String, Value>>;

/// Copies the root keys `column` reads from `row`.
///
/// Nested values are copied whole. Aliased requests use the alias key when
/// the row carries it and fall back to the underlying field key otherwise.
pub fn flatten_column_fields(row: &Map<String, Value>, column: &ColumnDefinition) -> Map<String, Value> {
    let mut out = Map::new();
    for query in &column.data {
        copy_query(row, query, &mut out);
    }
    out
}

fn copy_query(row: &Map<String, Value>, query: &FieldQuery, out: &mut Map<String, Value>) {
    if let FieldQuery::FieldAlias { alias, query } = query {
        match row.get(alias) {
            Some(value) => {
                out.insert(alias.clone(), value.clone());
            }
            None => copy_query(row, query, out),
        }
        return;
    }
    let Some(key) = query.root_key() else {
        return;
    };
    if let Some(value) = row.get(key) {
        out.insert(key.to_owned(), value.clone());
    }
}

/// Flattens every row for every column.
///
/// Rows that are not objects yield empty cell data.
pub fn flatten_rows(rows: &[Value], columns: &[ColumnDefinition]) -> Vec<FlattenedDataRow> {
    let empty = Map::new();
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let fields = match row {
                Value::Object(fields) => fields,
                other => {
                    trace!(index, row = %other, "data.flatten.non_object_row");
                    &empty
                }
            };
            columns
                .iter()
                .map(|column| (column.id.clone(), flatten_column_fields(fields, column)))
                .collect()
        })
        .collect()
}

/// Value at dotted `path` inside `row`.
pub fn value_at_path<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::field_query::QueryConfig;
    use serde_json::json;

    fn column(id: &str, data: Vec<FieldQuery>) -> ColumnDefinition {
        ColumnDefinition {
            id: id.into(),
            header: None,
            data,
        }
    }

    #[test]
    fn copies_root_keys_per_column() {
        let rows = [json!({
            "id": 7,
            "name": "Ann",
            "author": { "name": "Bob", "email": "b@x" },
            "tasks": [{ "title": "t1" }]
        })];
        let columns = [
            column("author", vec![FieldQuery::field("author.name")]),
            column(
                "summary",
                vec![
                    FieldQuery::field("name"),
                    FieldQuery::array(QueryConfig::new("tasks").limit(3)),
                ],
            ),
        ];
        let flat = flatten_rows(&rows, &columns);
        assert_eq!(
            Value::Object(flat[0]["author"].clone()),
            json!({ "author": { "name": "Bob", "email": "b@x" } })
        );
        assert_eq!(
            Value::Object(flat[0]["summary"].clone()),
            json!({ "name": "Ann", "tasks": [{ "title": "t1" }] })
        );
    }

    #[test]
    fn alias_prefers_row_alias_key() {
        let aliased = column(
            "open",
            vec![FieldQuery::alias("openTasks", FieldQuery::array(QueryConfig::new("tasks")))],
        );
        let with_alias = json!({ "openTasks": [1], "tasks": [1, 2] });
        let without_alias = json!({ "tasks": [1, 2] });
        let flat = flatten_rows(&[with_alias, without_alias, json!(null)], &[aliased]);
        assert_eq!(Value::Object(flat[0]["open"].clone()), json!({ "openTasks": [1] }));
        assert_eq!(Value::Object(flat[1]["open"].clone()), json!({ "tasks": [1, 2] }));
        assert!(flat[2]["open"].is_empty());
    }

    #[test]
    fn dotted_lookup() {
        let row = json!({ "meta": { "created_at": "2024" } });
        assert_eq!(value_at_path(&row, "meta.created_at"), Some(&json!("2024")));
        assert_eq!(value_at_path(&row, "meta.missing"), None);
    }
}
