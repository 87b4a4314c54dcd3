#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    view: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let view = dir.path().join("orders.json");
        write_json(
            &view,
            &json!({
                "collectionName": "orders",
                "boolExpType": "orders_bool_exp",
                "orderByType": "[orders_order_by!]",
                "paginationKey": "id",
                "columnDefinitions": [
                    { "id": "customer", "data": [{ "type": "field", "path": "customer.name" }] },
                    { "id": "total", "data": [{ "type": "field", "path": "total" }] }
                ],
                "filterSchema": { "filters": [
                    {
                        "id": "customer",
                        "label": "Customer",
                        "expression": {
                            "type": "iLike",
                            "field": "customer.name",
                            "value": { "type": "text", "initialValue": "acme" },
                            "transform": "wildcard"
                        }
                    },
                    {
                        "id": "placed",
                        "label": "Placed after",
                        "expression": {
                            "type": "greaterThan",
                            "field": "placed_at",
                            "value": { "type": "date" }
                        }
                    }
                ] }
            }),
        );
        Self { dir, view }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Value {
        let output = cargo_bin_cmd!("viewgrid")
            .env("VIEWGRID_CONFIG", self.path("missing.toml"))
            .env_remove("RUST_LOG")
            .arg("--format")
            .arg("json")
            .args(args)
            .output()
            .expect("run viewgrid");
        assert!(
            output.status.success(),
            "viewgrid {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("json output")
    }

    fn view_arg(&self) -> &str {
        self.view.to_str().expect("utf-8 path")
    }
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).expect("json")).expect("write fixture");
}

#[test]
fn init_state_honors_empty_flag() {
    let fixture = Fixture::new();
    let seeded = fixture.run(&["init-state", fixture.view_arg()]);
    assert_eq!(seeded["customer"], json!({ "type": "leaf", "value": "acme" }));
    assert_eq!(seeded["placed"], json!({ "type": "leaf", "value": "" }));

    let empty = fixture.run(&["init-state", fixture.view_arg(), "--empty"]);
    assert_eq!(empty["customer"], json!({ "type": "leaf", "value": "" }));
}

#[test]
fn conditions_apply_transforms_and_saved_state() {
    let fixture = Fixture::new();
    let defaults = fixture.run(&["conditions", fixture.view_arg()]);
    assert_eq!(defaults, json!({ "customer": { "name": { "_ilike": "%acme%" } } }));

    let state = fixture.path("state.json");
    write_json(
        &state,
        &json!({
            "customer": { "type": "leaf", "value": "" },
            "placed": { "type": "leaf", "value": "2024-02-01" }
        }),
    );
    let saved = fixture.run(&[
        "conditions",
        fixture.view_arg(),
        "--state",
        state.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(
        saved,
        json!({ "placed_at": { "_gt": "2024-02-01T00:00:00.000Z" } })
    );
}

#[test]
fn query_and_variables_for_a_page() {
    let fixture = Fixture::new();
    let query = fixture.run(&["query", fixture.view_arg()]);
    let document = query["query"].as_str().expect("document");
    assert!(document.starts_with("query ViewQuery($conditions: orders_bool_exp!"));
    assert!(document.contains("    customer {\n      name\n    }\n    total\n    id\n"));

    let variables = fixture.run(&[
        "variables",
        fixture.view_arg(),
        "--row-limit",
        "20",
        "--cursor",
        "41",
    ]);
    assert_eq!(variables["rowLimit"], json!(20));
    assert_eq!(variables["paginationCondition"], json!({ "id": { "_lt": 41 } }));
    assert_eq!(variables["orderBy"], json!([{ "id": "DESC" }]));
}

#[test]
fn merge_keeps_rejected_entries() {
    let fixture = Fixture::new();
    let incoming = fixture.path("suggested.json");
    write_json(
        &incoming,
        &json!({
            "customer": { "type": "or", "children": [] },
            "placed": { "type": "leaf", "value": "2024-03-05T10:00:00Z" }
        }),
    );
    let merged = fixture.run(&[
        "merge",
        fixture.view_arg(),
        "--incoming",
        incoming.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(merged["customer"], json!({ "type": "leaf", "value": "acme" }));
    assert_eq!(
        merged["placed"],
        json!({ "type": "leaf", "value": "2024-03-05T10:00:00.000Z" })
    );
}

#[test]
fn flatten_reports_next_cursor_for_full_pages() {
    let fixture = Fixture::new();
    let response = fixture.path("response.json");
    write_json(
        &response,
        &json!({ "data": { "orders": [
            { "id": 9, "total": 12.5, "customer": { "name": "Acme" } },
            { "id": 7, "total": 3, "customer": null }
        ] } }),
    );
    let page = fixture.run(&[
        "flatten",
        fixture.view_arg(),
        "--response",
        response.to_str().expect("utf-8 path"),
        "--row-limit",
        "2",
    ]);
    assert_eq!(page["nextCursor"], json!(7));
    assert_eq!(page["rows"][0]["customer"], json!({ "customer": { "name": "Acme" } }));
    assert_eq!(page["rows"][1]["total"], json!({ "total": 3 }));
}

#[test]
fn profile_supplies_view_and_row_limit() {
    let fixture = Fixture::new();
    let config = fixture.path("cli.toml");
    fs::write(
        &config,
        format!(
            "default_profile = \"orders\"\n\n[profiles.orders]\nview = {:?}\nrow_limit = 7\n",
            fixture.view_arg()
        ),
    )
    .expect("write config");
    let output = cargo_bin_cmd!("viewgrid")
        .env("VIEWGRID_CONFIG", &config)
        .args(["--format", "json", "variables"])
        .output()
        .expect("run viewgrid");
    assert!(output.status.success());
    let variables: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(variables["rowLimit"], json!(7));
}

#[test]
fn missing_view_fails_with_message() {
    let fixture = Fixture::new();
    let output = cargo_bin_cmd!("viewgrid")
        .env("VIEWGRID_CONFIG", fixture.path("missing.toml"))
        .args(["query", fixture.path("nope.json").to_str().expect("utf-8 path")])
        .output()
        .expect("run viewgrid");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: failed to read"), "stderr: {stderr}");
}

#[test]
fn text_output_lists_filter_state() {
    let fixture = Fixture::new();
    let output = cargo_bin_cmd!("viewgrid")
        .env("VIEWGRID_CONFIG", fixture.path("missing.toml"))
        .args(["--theme", "plain", "init-state", fixture.view_arg()])
        .output()
        .expect("run viewgrid");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Filter state"), "stdout: {stdout}");
    assert!(stdout.contains("customer: {\"type\":\"leaf\",\"value\":\"acme\"}"), "stdout: {stdout}");
}
