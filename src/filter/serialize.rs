//! Persistable form of [`FilterState`] with date normalization.
//!
//! Date leaves are written as ISO-8601 UTC strings with millisecond
//! precision (`2024-01-15T10:30:00.000Z`). Which leaves count as dates is
//! decided by a schema scan collecting the field paths of `date` controls.

use std::collections::HashSet;

use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::warn;

use crate::error::{Result, ViewError};
use crate::filter::expr::{FilterControl, FilterExpr, FilterLeaf, FilterSchemasAndGroups};
use crate::filter::state::{is_empty_value, FilterFormState, FilterState};
use crate::filter::traverse::{traverse_filter_schema_and_state, SchemaStateVisitor};

/// Field paths whose leaves collect dates.
pub fn date_field_names(schemas: &FilterSchemasAndGroups) -> HashSet<String> {
    schemas
        .filters
        .iter()
        .flat_map(|schema| schema.expression.field_nodes())
        .filter(|leaf| leaf.value.is_date())
        .flat_map(|leaf| leaf.field.paths().iter().cloned())
        .collect()
}

/// Converts `state` to JSON, canonicalizing date leaves.
///
/// Date values that cannot be read are written unchanged.
pub fn serialize_filter_form_state_map(
    state: &FilterState,
    schemas: &FilterSchemasAndGroups,
) -> Result<Value> {
    let date_fields = date_field_names(schemas);
    let mut normalizer = DateNormalizer {
        date_fields: &date_fields,
        strict: false,
    };
    let mut out = FilterState::new();
    for (id, root) in state {
        let normalized = match schemas.schema(id) {
            Some(schema) => traverse_filter_schema_and_state(&schema.expression, root, &mut normalizer)?,
            None => root.clone(),
        };
        out.insert(id.clone(), normalized);
    }
    Ok(serde_json::to_value(out)?)
}

/// Reads a persisted state map, canonicalizing date leaves.
///
/// Fails with [`ViewError::InvalidDate`] when a date leaf holds an unreadable
/// value, and with a structural error when a state does not fit its schema.
pub fn parse_filter_form_state(
    json: &Value,
    schemas: &FilterSchemasAndGroups,
) -> Result<FilterState> {
    let raw: FilterState = serde_json::from_value(json.clone())?;
    let date_fields = date_field_names(schemas);
    let mut normalizer = DateNormalizer {
        date_fields: &date_fields,
        strict: true,
    };
    let mut out = FilterState::new();
    for (id, root) in raw {
        let normalized = match schemas.schema(&id) {
            Some(schema) => traverse_filter_schema_and_state(&schema.expression, &root, &mut normalizer)?,
            None => root,
        };
        out.insert(id, normalized);
    }
    Ok(out)
}

/// Canonical ISO string for an RFC 3339 string, a `YYYY-MM-DD` string or an
/// epoch-millisecond number. `None` when the value is not a date.
pub fn normalize_date_value(value: &Value) -> Option<Value> {
    let instant = match value {
        Value::String(raw) => parse_date(raw)?,
        Value::Number(num) => {
            let millis = match num.as_i64() {
                Some(ms) => i128::from(ms),
                None => num.as_f64()?.round() as i128,
            };
            OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()?
        }
        _ => return None,
    };
    instant
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .ok()
        .map(Value::String)
}

fn parse_date(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(instant);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

struct DateNormalizer<'a> {
    date_fields: &'a HashSet<String>,
    strict: bool,
}

impl DateNormalizer<'_> {
    fn normalize(&self, field: &str, value: &Value) -> Result<Value> {
        if is_empty_value(value) {
            return Ok(value.clone());
        }
        if let Value::Array(items) = value {
            return items
                .iter()
                .map(|item| self.normalize(field, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array);
        }
        match normalize_date_value(value) {
            Some(iso) => Ok(iso),
            None if self.strict => Err(ViewError::InvalidDate {
                field: field.to_owned(),
                value: value.to_string(),
            }),
            None => {
                warn!(field, value = %value, "filters.serialize.unreadable_date");
                Ok(value.clone())
            }
        }
    }
}

impl SchemaStateVisitor for DateNormalizer<'_> {
    type Output = FilterFormState;

    fn leaf(&mut self, schema: &FilterLeaf, value: &Value) -> Result<FilterFormState> {
        let Some(field) = schema
            .field
            .paths()
            .iter()
            .find(|path| self.date_fields.contains(*path))
        else {
            return Ok(FilterFormState::leaf(value.clone()));
        };
        let normalized = match (&schema.value, value) {
            (FilterControl::CustomOperator { .. }, Value::Object(pair)) => {
                let inner = pair.get("value").cloned().unwrap_or(Value::Null);
                json!({
                    "operator": pair.get("operator").cloned().unwrap_or(Value::Null),
                    "value": self.normalize(field, &inner)?,
                })
            }
            _ => self.normalize(field, value)?,
        };
        Ok(FilterFormState::leaf(normalized))
    }

    fn and(
        &mut self,
        _: &[FilterExpr],
        _: &[FilterFormState],
        children: Vec<FilterFormState>,
    ) -> Result<FilterFormState> {
        Ok(FilterFormState::And { children })
    }

    fn or(
        &mut self,
        _: &[FilterExpr],
        _: &[FilterFormState],
        children: Vec<FilterFormState>,
    ) -> Result<FilterFormState> {
        Ok(FilterFormState::Or { children })
    }

    fn not(
        &mut self,
        _: &FilterExpr,
        _: &FilterFormState,
        child: FilterFormState,
    ) -> Result<FilterFormState> {
        Ok(FilterFormState::Not {
            child: Box::new(child),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::expr::{FilterOperator, FilterSchema, SelectOption};

    fn schemas() -> FilterSchemasAndGroups {
        FilterSchemasAndGroups {
            groups: Vec::new(),
            filters: vec![
                FilterSchema {
                    id: "created".into(),
                    label: "Created".into(),
                    expression: FilterExpr::And(vec![
                        FilterExpr::leaf(
                            FilterOperator::GreaterThanOrEqual,
                            "created_at",
                            FilterControl::date(),
                        ),
                        FilterExpr::leaf(FilterOperator::Equals, "title", FilterControl::text()),
                    ]),
                    group: None,
                    ai_generated: false,
                },
                FilterSchema {
                    id: "due".into(),
                    label: "Due".into(),
                    expression: FilterExpr::leaf(
                        FilterOperator::Equals,
                        "due_at",
                        FilterControl::custom_operator(
                            vec![SelectOption::new("before", "_lt")],
                            FilterControl::date(),
                        ),
                    ),
                    group: None,
                    ai_generated: false,
                },
            ],
        }
    }

    #[test]
    fn scan_collects_date_fields() {
        let names = date_field_names(&schemas());
        assert!(names.contains("created_at"));
        assert!(names.contains("due_at"));
        assert!(!names.contains("title"));
    }

    #[test]
    fn normalizes_supported_inputs() {
        assert_eq!(
            normalize_date_value(&json!("2024-01-15T12:30:00+02:00")),
            Some(json!("2024-01-15T10:30:00.000Z"))
        );
        assert_eq!(
            normalize_date_value(&json!("2024-01-15")),
            Some(json!("2024-01-15T00:00:00.000Z"))
        );
        assert_eq!(
            normalize_date_value(&json!(0)),
            Some(json!("1970-01-01T00:00:00.000Z"))
        );
        assert_eq!(normalize_date_value(&json!("soon")), None);
        assert_eq!(normalize_date_value(&json!(true)), None);
    }

    #[test]
    fn out_of_range_epoch_numbers_are_not_dates() {
        assert_eq!(normalize_date_value(&json!(1e33)), None);
        assert_eq!(normalize_date_value(&json!(-1e300)), None);
        assert_eq!(normalize_date_value(&json!(i64::MAX)), None);

        let err = parse_filter_form_state(
            &json!({ "created": { "type": "and", "children": [
                { "type": "leaf", "value": 1e33 },
                { "type": "leaf", "value": "" }
            ] } }),
            &schemas(),
        )
        .unwrap_err();
        assert!(matches!(err, ViewError::InvalidDate { ref field, .. } if field == "created_at"));
    }

    #[test]
    fn serialize_rewrites_only_date_leaves() {
        let mut state = FilterState::new();
        state.insert(
            "created".into(),
            FilterFormState::And {
                children: vec![
                    FilterFormState::leaf("2024-03-01"),
                    FilterFormState::leaf("2024-03-01"),
                ],
            },
        );
        state.insert(
            "due".into(),
            FilterFormState::leaf(json!({ "operator": "_lt", "value": 1_700_000_000_000i64 })),
        );
        let out = serialize_filter_form_state_map(&state, &schemas()).expect("serialize");
        assert_eq!(
            out,
            json!({
                "created": { "type": "and", "children": [
                    { "type": "leaf", "value": "2024-03-01T00:00:00.000Z" },
                    { "type": "leaf", "value": "2024-03-01" }
                ] },
                "due": { "type": "leaf", "value": {
                    "operator": "_lt",
                    "value": "2023-11-14T22:13:20.000Z"
                } }
            })
        );
    }

    #[test]
    fn parse_rejects_unreadable_dates() {
        let err = parse_filter_form_state(
            &json!({ "created": { "type": "and", "children": [
                { "type": "leaf", "value": "yesterday" },
                { "type": "leaf", "value": "" }
            ] } }),
            &schemas(),
        )
        .unwrap_err();
        assert!(matches!(err, ViewError::InvalidDate { ref field, .. } if field == "created_at"));
    }

    #[test]
    fn parse_keeps_empty_and_unknown_entries() {
        let state = parse_filter_form_state(
            &json!({
                "created": { "type": "and", "children": [
                    { "type": "leaf", "value": "" },
                    { "type": "leaf", "value": "x" }
                ] },
                "orphan": { "type": "leaf", "value": "kept" }
            }),
            &schemas(),
        )
        .expect("parse");
        assert_eq!(state["orphan"], FilterFormState::leaf("kept"));
        assert_eq!(
            state["created"],
            FilterFormState::And {
                children: vec![FilterFormState::leaf(""), FilterFormState::leaf("x")]
            }
        );
    }
}
