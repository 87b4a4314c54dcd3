#![allow(missing_docs)]

use std::fs;

use serde_json::json;
use tempfile::TempDir;
use viewgrid::{
    filter::{
        build_initial_filter_state, merge_filter_state, parse_filter_form_state,
        serialize_filter_form_state_map, FilterFormState, StateMode,
    },
    hasura::build_hasura_conditions,
    View,
};

fn events_view() -> View {
    View::from_value(json!({
        "collectionName": "events",
        "boolExpType": "events_bool_exp",
        "orderByType": "[events_order_by!]",
        "paginationKey": "starts_at",
        "columnDefinitions": [{ "id": "name", "data": [{ "type": "field", "path": "name" }] }],
        "filterSchema": { "filters": [
            {
                "id": "window",
                "label": "Window",
                "expression": { "type": "and", "filters": [
                    { "type": "greaterThanOrEqual", "field": "starts_at", "value": { "type": "date" } },
                    { "type": "lessThan", "field": "starts_at", "value": { "type": "date" } }
                ] }
            },
            {
                "id": "venue",
                "label": "Venue",
                "expression": { "type": "equals", "field": "venue.city", "value": { "type": "text" } }
            }
        ] }
    }))
    .expect("valid view")
}

#[test]
fn saved_state_reloads_with_canonical_dates() {
    let view = events_view();
    let mut state = build_initial_filter_state(&view.filter_schema, StateMode::Empty);
    state.insert(
        "window".into(),
        FilterFormState::And {
            children: vec![
                FilterFormState::leaf("2024-06-01"),
                FilterFormState::leaf(1_719_792_000_000i64),
            ],
        },
    );
    state.insert("venue".into(), FilterFormState::leaf("Lisbon"));

    let saved = serialize_filter_form_state_map(&state, &view.filter_schema).expect("serialize");
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("state.json");
    fs::write(&path, serde_json::to_string_pretty(&saved).expect("json")).expect("write");

    let raw = serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse json");
    let restored = parse_filter_form_state(&raw, &view.filter_schema).expect("parse state");
    assert_eq!(
        restored["window"],
        FilterFormState::And {
            children: vec![
                FilterFormState::leaf("2024-06-01T00:00:00.000Z"),
                FilterFormState::leaf("2024-07-01T00:00:00.000Z"),
            ],
        }
    );
    assert_eq!(restored["venue"], FilterFormState::leaf("Lisbon"));

    let condition = build_hasura_conditions(&restored, &view.filter_schema).expect("compile");
    assert_eq!(
        condition.to_json(),
        json!({ "_and": [
            { "venue": { "city": { "_eq": "Lisbon" } } },
            { "_and": [
                { "starts_at": { "_gte": "2024-06-01T00:00:00.000Z" } },
                { "starts_at": { "_lt": "2024-07-01T00:00:00.000Z" } }
            ] }
        ] })
    );
}

#[test]
fn merged_suggestions_persist_like_user_input() {
    let view = events_view();
    let current = build_initial_filter_state(&view.filter_schema, StateMode::Empty);
    let merged = merge_filter_state(
        &current,
        &json!({
            "window": { "type": "and", "children": [
                { "type": "leaf", "value": "2024-06-01T09:00:00+02:00" },
                { "type": "leaf", "value": "" }
            ] },
            "venue": { "type": "or", "children": [] }
        }),
        &view.filter_schema,
    );
    assert_eq!(merged["venue"], current["venue"]);

    let saved = serialize_filter_form_state_map(&merged, &view.filter_schema).expect("serialize");
    assert_eq!(
        saved["window"],
        json!({ "type": "and", "children": [
            { "type": "leaf", "value": "2024-06-01T07:00:00.000Z" },
            { "type": "leaf", "value": "" }
        ] })
    );
}

#[test]
fn unreadable_saved_date_fails_to_load() {
    let view = events_view();
    let err = parse_filter_form_state(
        &json!({ "window": { "type": "and", "children": [
            { "type": "leaf", "value": "next tuesday" },
            { "type": "leaf", "value": "" }
        ] } }),
        &view.filter_schema,
    )
    .unwrap_err();
    assert_eq!(err.code(), "InvalidDate");
}
