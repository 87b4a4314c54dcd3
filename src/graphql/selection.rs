//! Selection-set tree built from column declarations.

use std::mem;

use tracing::{debug, trace};

use crate::graphql::field_query::{FieldQuery, OrderBy, QueryConfig};
use crate::hasura::condition::HasuraCondition;
use crate::hasura::equality::conditions_are_equal;
use crate::view::ColumnDefinition;

/// One requested field with its arguments and sub-selections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionSetItem {
    /// Field name.
    pub field: String,
    /// Response key override.
    pub alias: Option<String>,
    /// JSON path argument.
    pub path: Option<String>,
    /// Filter argument.
    pub where_: Option<HasuraCondition>,
    /// Ordering argument.
    pub order_by: Option<Vec<OrderBy>>,
    /// Row cap argument.
    pub limit: Option<u64>,
    /// Offset argument.
    pub offset: Option<u64>,
    /// Distinct columns argument.
    pub distinct_on: Option<Vec<String>>,
    /// Nested fields; empty for scalars.
    pub selections: Vec<SelectionSetItem>,
}

impl SelectionSetItem {
    /// Scalar selection of `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    fn from_config(config: &QueryConfig) -> Self {
        Self {
            field: config.field.clone(),
            path: config.path.clone(),
            where_: config.where_.clone(),
            order_by: config.order_by.clone(),
            limit: config.limit,
            offset: config.offset,
            distinct_on: config.distinct_on.clone(),
            ..Self::default()
        }
    }

    /// Key the backend uses for this item in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }

    /// Whether any argument is set.
    pub fn has_arguments(&self) -> bool {
        self.where_.is_some()
            || self.order_by.is_some()
            || self.distinct_on.is_some()
            || self.limit.is_some()
            || self.offset.is_some()
            || self.path.is_some()
    }

    /// Two items denote the same request when field, alias, path and filter
    /// agree. Filters compare order-insensitively.
    fn same_target(&self, other: &SelectionSetItem) -> bool {
        self.field == other.field
            && self.alias == other.alias
            && self.path == other.path
            && match (&self.where_, &other.where_) {
                (None, None) => true,
                (Some(left), Some(right)) => conditions_are_equal(left, right),
                _ => false,
            }
    }

    fn absorb(&mut self, other: SelectionSetItem) {
        if other.order_by.is_some() {
            self.order_by = other.order_by;
        }
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        if other.offset.is_some() {
            self.offset = other.offset;
        }
        if other.distinct_on.is_some() {
            self.distinct_on = other.distinct_on;
        }
        let mut combined = mem::take(&mut self.selections);
        combined.extend(other.selections);
        self.selections = merge_selection_sets(combined);
    }
}

/// Builds the selection tree for one declaration. `None` for an empty
/// `queryConfigs` chain.
pub fn selection_from_field_query(query: &FieldQuery) -> Option<SelectionSetItem> {
    match query {
        FieldQuery::Field { path } => chain(path.split('.').map(SelectionSetItem::new)),
        FieldQuery::QueryConfigs { configs } => {
            chain(configs.iter().map(SelectionSetItem::from_config))
        }
        FieldQuery::FieldAlias { alias, query } => {
            let mut item = selection_from_field_query(query)?;
            if aliases_leaf(query) {
                deepest_mut(&mut item).alias = Some(alias.clone());
            } else {
                item.alias = Some(alias.clone());
            }
            Some(item)
        }
    }
}

/// `field` chains take the alias on their last segment; `queryConfigs`
/// chains on their first hop.
fn aliases_leaf(query: &FieldQuery) -> bool {
    match query {
        FieldQuery::Field { .. } => true,
        FieldQuery::QueryConfigs { .. } => false,
        FieldQuery::FieldAlias { query, .. } => aliases_leaf(query),
    }
}

fn chain<I>(levels: I) -> Option<SelectionSetItem>
where
    I: DoubleEndedIterator<Item = SelectionSetItem>,
{
    let mut levels = levels.rev();
    let mut current = levels.next()?;
    for mut parent in levels {
        parent.selections.push(current);
        current = parent;
    }
    Some(current)
}

fn deepest_mut(item: &mut SelectionSetItem) -> &mut SelectionSetItem {
    if item.selections.is_empty() {
        return item;
    }
    let last = item.selections.len() - 1;
    deepest_mut(&mut item.selections[last])
}

/// Builds the merged selection set requested by `columns`.
pub fn generate_selection_set_from_columns(columns: &[ColumnDefinition]) -> Vec<SelectionSetItem> {
    let items = columns
        .iter()
        .flat_map(|column| {
            column.data.iter().filter_map(move |query| {
                let item = selection_from_field_query(query);
                if item.is_none() {
                    trace!(column = %column.id, "graphql.selection.empty_query");
                }
                item
            })
        })
        .collect();
    merge_selection_sets(items)
}

/// Deduplicates `items`, merging sub-selections of matching entries.
///
/// The first occurrence keeps its position. Arguments set on a later match
/// replace the earlier ones.
pub fn merge_selection_sets(items: Vec<SelectionSetItem>) -> Vec<SelectionSetItem> {
    let mut merged: Vec<SelectionSetItem> = Vec::with_capacity(items.len());
    for mut item in items {
        match merged.iter_mut().find(|existing| existing.same_target(&item)) {
            Some(existing) => existing.absorb(item),
            None => {
                item.selections = merge_selection_sets(mem::take(&mut item.selections));
                merged.push(item);
            }
        }
    }
    merged
}

/// Whether an unaliased, argument-free chain for dotted `path` is selected.
pub fn contains_path(items: &[SelectionSetItem], path: &str) -> bool {
    let mut level = items;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(found) = level
            .iter()
            .find(|item| item.alias.is_none() && item.field == segment && !item.has_arguments())
        else {
            return false;
        };
        if segments.peek().is_none() {
            return true;
        }
        level = &found.selections;
    }
    false
}

/// Adds the dotted `path` to `items` unless already selected.
pub fn ensure_selected(items: &mut Vec<SelectionSetItem>, path: &str) {
    if contains_path(items, path) {
        return;
    }
    let Some(added) = selection_from_field_query(&FieldQuery::field(path)) else {
        return;
    };
    debug!(path, "graphql.selection.pagination_key_added");
    let mut combined = mem::take(items);
    combined.push(added);
    *items = merge_selection_sets(combined);
}
