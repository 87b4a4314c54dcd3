//! Fetch orchestration around a transport the caller owns.
//!
//! The crate never performs I/O. [`FetchPlanner`] prepares the document and
//! variables for a page, and turns the raw response back into flattened rows
//! plus the cursor for the next page. A [`RequestGeneration`] counter makes
//! the last-issued request win: responses to older tickets are discarded.
//!
//! ```
//! use serde_json::json;
//! use viewgrid::fetch::{Fetched, FetchPlanner};
//! use viewgrid::filter::FilterState;
//! use viewgrid::view::View;
//!
//! let view = View::from_value(json!({
//!     "collectionName": "users",
//!     "boolExpType": "users_bool_exp",
//!     "orderByType": "[users_order_by!]",
//!     "paginationKey": "id",
//!     "columnDefinitions": [{ "id": "name", "data": [{ "type": "field", "path": "name" }] }]
//! }))
//! .unwrap();
//! let planner = FetchPlanner::new(&view, 2);
//! let first = planner.prepare(&FilterState::new(), None).unwrap();
//! let second = planner.prepare(&FilterState::new(), None).unwrap();
//!
//! let response = json!({ "data": { "users": [{ "id": 9, "name": "a" }, { "id": 8, "name": "b" }] } });
//! assert!(matches!(planner.receive(&first.ticket, &response), Fetched::Superseded));
//! let Fetched::Current(page) = planner.receive(&second.ticket, &response) else {
//!     panic!("latest request must be current");
//! };
//! assert_eq!(page.next_cursor, Some(json!(8)));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::data::{flatten_rows, value_at_path, FlattenedDataRow};
use crate::error::Result;
use crate::filter::state::FilterState;
use crate::graphql::ast::generate_graphql_query;
use crate::graphql::variables::{build_graphql_query_variables, QueryVariables};
use crate::view::View;

/// Identifies one issued request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    /// Generation number of the request.
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Outcome of settling a response against the latest request.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<T> {
    /// No newer request was issued.
    Current(T),
    /// A newer request started first; the response is stale.
    Superseded,
}

impl<T> Fetched<T> {
    /// The value, if current.
    pub fn current(self) -> Option<T> {
        match self {
            Fetched::Current(value) => Some(value),
            Fetched::Superseded => None,
        }
    }
}

/// Monotonic request counter.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    /// Counter with no request issued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket newer than every earlier one.
    pub fn begin(&self) -> RequestTicket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(generation, "fetch.begin");
        RequestTicket(generation)
    }

    /// Whether `ticket` is the latest issued.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Keeps `value` only if `ticket` is still the latest.
    pub fn settle<T>(&self, ticket: &RequestTicket, value: T) -> Fetched<T> {
        if self.is_current(ticket) {
            Fetched::Current(value)
        } else {
            debug!(
                generation = ticket.0,
                latest = self.latest.load(Ordering::SeqCst),
                "fetch.superseded"
            );
            Fetched::Superseded
        }
    }
}

/// Everything the transport needs for one request.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    /// Ticket to settle the response with.
    pub ticket: RequestTicket,
    /// Query document.
    pub query: String,
    /// Query variables.
    pub variables: QueryVariables,
}

/// One settled page.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchPage {
    /// Cell data per row.
    pub rows: Vec<FlattenedDataRow>,
    /// Rows as returned by the backend.
    pub raw_rows: Vec<Value>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<Value>,
}

/// Prepares requests for a view and interprets their responses.
#[derive(Debug)]
pub struct FetchPlanner<'a> {
    view: &'a View,
    row_limit: u64,
    query: String,
    generation: RequestGeneration,
}

impl<'a> FetchPlanner<'a> {
    /// Planner fetching `row_limit` rows per page.
    pub fn new(view: &'a View, row_limit: u64) -> Self {
        Self {
            view,
            row_limit,
            query: generate_graphql_query(view),
            generation: RequestGeneration::new(),
        }
    }

    /// Query document shared by every page.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Page size.
    pub fn row_limit(&self) -> u64 {
        self.row_limit
    }

    /// Issues a ticket and builds the variables for the page after `cursor`.
    pub fn prepare(&self, state: &FilterState, cursor: Option<&Value>) -> Result<PreparedRequest> {
        let variables = build_graphql_query_variables(self.view, state, self.row_limit, cursor)?;
        Ok(PreparedRequest {
            ticket: self.generation.begin(),
            query: self.query.clone(),
            variables,
        })
    }

    /// Settles `response` for `ticket` and shapes it into a page.
    pub fn receive(&self, ticket: &RequestTicket, response: &Value) -> Fetched<FetchPage> {
        match self.generation.settle(ticket, response) {
            Fetched::Current(response) => Fetched::Current(self.page(response)),
            Fetched::Superseded => Fetched::Superseded,
        }
    }

    /// Shapes a response without supersession checks.
    pub fn page(&self, response: &Value) -> FetchPage {
        let raw_rows = extract_rows(response, &self.view.collection_name);
        let next_cursor = next_cursor(&raw_rows, &self.view.pagination_key, self.row_limit);
        FetchPage {
            rows: flatten_rows(&raw_rows, &self.view.column_definitions),
            raw_rows,
            next_cursor,
        }
    }
}

/// Rows under `data.<collection>` or a top-level `<collection>`.
pub fn extract_rows(response: &Value, collection: &str) -> Vec<Value> {
    let rows = response
        .get("data")
        .and_then(|data| data.get(collection))
        .or_else(|| response.get(collection));
    match rows {
        Some(Value::Array(rows)) => rows.clone(),
        Some(other) => {
            warn!(collection, value = %other, "fetch.response.not_a_list");
            Vec::new()
        }
        None => {
            warn!(collection, "fetch.response.missing_collection");
            Vec::new()
        }
    }
}

/// Pagination-key value of the last row when the page is full.
pub fn next_cursor(rows: &[Value], pagination_key: &str, row_limit: u64) -> Option<Value> {
    if rows.is_empty() || (rows.len() as u64) < row_limit {
        return None;
    }
    rows.last()
        .and_then(|row| value_at_path(row, pagination_key))
        .filter(|value| !value.is_null())
        .cloned()
}
