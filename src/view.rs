//! View descriptor: collection, columns, filters and pagination.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ViewError};
use crate::filter::expr::FilterSchemasAndGroups;
use crate::graphql::field_query::{FieldQuery, OrderBy};
use crate::hasura::condition::HasuraCondition;

/// One grid column and the fields it reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column id; keys the column's cell data.
    pub id: String,
    /// Display header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Field requests.
    #[serde(default)]
    pub data: Vec<FieldQuery>,
}

/// Complete description of a filterable, paginated grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Root collection field.
    pub collection_name: String,
    /// Columns in display order.
    pub column_definitions: Vec<ColumnDefinition>,
    /// Filters offered for the view.
    #[serde(default)]
    pub filter_schema: FilterSchemasAndGroups,
    /// Boolean-expression input type of the collection.
    pub bool_exp_type: String,
    /// Type of the root `orderBy` variable.
    pub order_by_type: String,
    /// Keyset pagination field, possibly dotted.
    pub pagination_key: String,
    /// Conditions always and-ed with the user filters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_conditions: Vec<HasuraCondition>,
    /// Orderings applied after the pagination key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_ordering: Vec<OrderBy>,
}

impl View {
    /// Reads a view from its JSON form.
    pub fn from_value(value: Value) -> Result<Self> {
        let view: View = serde_json::from_value(value)?;
        view.validate()?;
        Ok(view)
    }

    /// Parses a view from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let view: View = serde_json::from_str(raw)?;
        view.validate()?;
        Ok(view)
    }

    /// Loads a view from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ViewError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Looks up a column by id.
    pub fn column(&self, id: &str) -> Option<&ColumnDefinition> {
        self.column_definitions.iter().find(|column| column.id == id)
    }

    fn validate(&self) -> Result<()> {
        if self.collection_name.is_empty() {
            return Err(ViewError::Invalid("view collectionName must not be empty"));
        }
        if self.pagination_key.is_empty() || self.pagination_key.split('.').any(str::is_empty) {
            return Err(ViewError::Invalid("view paginationKey must be a dotted field path"));
        }
        Ok(())
    }
}
