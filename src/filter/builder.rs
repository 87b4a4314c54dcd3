//! Fluent construction of [`FilterExpr`] trees from code.

use crate::error::{Result, ViewError};
use crate::filter::expr::{FilterControl, FilterExpr, FilterField, FilterLeaf, FilterOperator};

#[derive(Clone, Copy, Debug)]
enum GroupMode {
    And,
    Or,
}

/// Collects leaves and groups, combining them with `and` (top level and
/// `and_group`/`not_group`) or `or` (`or_group`).
///
/// ```
/// use viewgrid::filter::{FilterControl, FilterExprBuilder};
///
/// let mut builder = FilterExprBuilder::new();
/// builder
///     .ilike("name", FilterControl::text())
///     .or_group(|g| {
///         g.equals("status", FilterControl::text())
///             .is_null("archived_at", FilterControl::text());
///     });
/// let expr = builder.finish().unwrap();
/// assert_eq!(expr.field_nodes().len(), 3);
/// ```
pub struct FilterExprBuilder {
    mode: GroupMode,
    exprs: Vec<FilterExpr>,
    error: Option<ViewError>,
}

impl Default for FilterExprBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterExprBuilder {
    /// Creates a builder whose top-level entries are and-ed.
    pub fn new() -> Self {
        Self::with_mode(GroupMode::And)
    }

    fn with_mode(mode: GroupMode) -> Self {
        Self {
            mode,
            exprs: Vec::new(),
            error: None,
        }
    }

    fn push(&mut self, expr: FilterExpr) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        self.exprs.push(expr);
        self
    }

    fn push_leaf<F>(&mut self, op: FilterOperator, field: F, control: FilterControl) -> &mut Self
    where
        F: Into<FilterField>,
    {
        self.push(FilterExpr::leaf(op, field, control))
    }

    fn record_error(&mut self, err: ViewError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn build_group<F>(mode: GroupMode, build: F) -> Result<FilterExpr>
    where
        F: FnOnce(&mut FilterExprBuilder),
    {
        let mut nested = FilterExprBuilder::with_mode(mode);
        build(&mut nested);
        nested.finish_with("filter group must contain at least one filter")
    }

    fn push_group<F>(&mut self, mode: GroupMode, negate: bool, build: F) -> &mut Self
    where
        F: FnOnce(&mut FilterExprBuilder),
    {
        match Self::build_group(mode, build) {
            Ok(expr) if negate => self.push(FilterExpr::not(expr)),
            Ok(expr) => self.push(expr),
            Err(err) => {
                self.record_error(err);
                self
            }
        }
    }

    fn finish_with(mut self, empty_message: &'static str) -> Result<FilterExpr> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.exprs.len() {
            0 => Err(ViewError::Invalid(empty_message)),
            1 => Ok(self.exprs.remove(0)),
            _ => Ok(match self.mode {
                GroupMode::And => FilterExpr::And(self.exprs),
                GroupMode::Or => FilterExpr::Or(self.exprs),
            }),
        }
    }

    /// Adds a fully specified leaf (e.g. one carrying a transform).
    pub fn leaf(&mut self, leaf: FilterLeaf) -> &mut Self {
        self.push(FilterExpr::Leaf(leaf))
    }

    /// Adds an `equals` leaf.
    pub fn equals<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::Equals, field, control)
    }

    /// Adds a `notEquals` leaf.
    pub fn not_equals<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::NotEquals, field, control)
    }

    /// Adds a `greaterThan` leaf.
    pub fn greater_than<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::GreaterThan, field, control)
    }

    /// Adds a `lessThan` leaf.
    pub fn less_than<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::LessThan, field, control)
    }

    /// Adds a `greaterThanOrEqual` leaf.
    pub fn greater_than_or_equal<F: Into<FilterField>>(
        &mut self,
        field: F,
        control: FilterControl,
    ) -> &mut Self {
        self.push_leaf(FilterOperator::GreaterThanOrEqual, field, control)
    }

    /// Adds a `lessThanOrEqual` leaf.
    pub fn less_than_or_equal<F: Into<FilterField>>(
        &mut self,
        field: F,
        control: FilterControl,
    ) -> &mut Self {
        self.push_leaf(FilterOperator::LessThanOrEqual, field, control)
    }

    /// Adds an `in` leaf.
    pub fn in_list<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::In, field, control)
    }

    /// Adds a `notIn` leaf.
    pub fn not_in<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::NotIn, field, control)
    }

    /// Adds a `like` leaf.
    pub fn like<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::Like, field, control)
    }

    /// Adds an `iLike` leaf.
    pub fn ilike<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::ILike, field, control)
    }

    /// Adds an `isNull` leaf.
    pub fn is_null<F: Into<FilterField>>(&mut self, field: F, control: FilterControl) -> &mut Self {
        self.push_leaf(FilterOperator::IsNull, field, control)
    }

    /// Nests filters combined with logical AND.
    pub fn and_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut FilterExprBuilder),
    {
        self.push_group(GroupMode::And, false, build)
    }

    /// Nests filters combined with logical OR.
    pub fn or_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut FilterExprBuilder),
    {
        self.push_group(GroupMode::Or, false, build)
    }

    /// Nests and-ed filters and negates the result.
    pub fn not_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut FilterExprBuilder),
    {
        self.push_group(GroupMode::And, true, build)
    }

    /// Returns the built expression.
    pub fn finish(self) -> Result<FilterExpr> {
        self.finish_with("filter builder requires at least one filter")
    }
}
