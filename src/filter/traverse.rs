//! Lockstep fold over a filter schema and its form state.
//!
//! Dispatch follows the *state* node's type. Composite schema nodes must
//! carry the same type, and `and`/`or` children are paired by index with
//! `state.children[i]` driving the iteration. Every consumer that needs both
//! trees implements [`SchemaStateVisitor`] instead of recursing on its own.

use serde_json::Value;

use crate::error::{NodeKind, Result, ViewError};
use crate::filter::expr::{FilterExpr, FilterLeaf};
use crate::filter::state::FilterFormState;

/// Handlers invoked by [`traverse_filter_schema_and_state`].
///
/// Children are visited left to right before their parent handler runs.
pub trait SchemaStateVisitor {
    /// Aggregated result type.
    type Output;

    /// Handles a comparison leaf and its raw form value.
    fn leaf(&mut self, schema: &FilterLeaf, value: &Value) -> Result<Self::Output>;

    /// Handles an `and` node once its children are folded.
    fn and(
        &mut self,
        schema: &[FilterExpr],
        state: &[FilterFormState],
        children: Vec<Self::Output>,
    ) -> Result<Self::Output>;

    /// Handles an `or` node once its children are folded.
    fn or(
        &mut self,
        schema: &[FilterExpr],
        state: &[FilterFormState],
        children: Vec<Self::Output>,
    ) -> Result<Self::Output>;

    /// Handles a `not` node once its child is folded.
    fn not(
        &mut self,
        schema: &FilterExpr,
        state: &FilterFormState,
        child: Self::Output,
    ) -> Result<Self::Output>;
}

/// Walks `schema` and `state` together and returns the visitor's result.
///
/// Fails with [`ViewError::SchemaMismatch`] when node types disagree and with
/// [`ViewError::MissingChildSchema`] when the state has more children than
/// the schema. Both mean the state was built from another schema.
pub fn traverse_filter_schema_and_state<V>(
    schema: &FilterExpr,
    state: &FilterFormState,
    visitor: &mut V,
) -> Result<V::Output>
where
    V: SchemaStateVisitor + ?Sized,
{
    match state {
        FilterFormState::Leaf { value } => match schema {
            FilterExpr::Leaf(leaf) => visitor.leaf(leaf, value),
            other => Err(ViewError::mismatch(NodeKind::Leaf, other.kind())),
        },
        FilterFormState::And { children } => {
            let FilterExpr::And(filters) = schema else {
                return Err(ViewError::mismatch(NodeKind::And, schema.kind()));
            };
            let results = fold_children(filters, children, visitor)?;
            visitor.and(filters, children, results)
        }
        FilterFormState::Or { children } => {
            let FilterExpr::Or(filters) = schema else {
                return Err(ViewError::mismatch(NodeKind::Or, schema.kind()));
            };
            let results = fold_children(filters, children, visitor)?;
            visitor.or(filters, children, results)
        }
        FilterFormState::Not { child } => {
            let FilterExpr::Not(filter) = schema else {
                return Err(ViewError::mismatch(NodeKind::Not, schema.kind()));
            };
            let result = traverse_filter_schema_and_state(filter, child, visitor)?;
            visitor.not(filter, child, result)
        }
    }
}

fn fold_children<V>(
    filters: &[FilterExpr],
    children: &[FilterFormState],
    visitor: &mut V,
) -> Result<Vec<V::Output>>
where
    V: SchemaStateVisitor + ?Sized,
{
    let mut results = Vec::with_capacity(children.len());
    for (index, child) in children.iter().enumerate() {
        let schema = filters
            .get(index)
            .ok_or(ViewError::MissingChildSchema { index })?;
        results.push(traverse_filter_schema_and_state(schema, child, visitor)?);
    }
    Ok(results)
}

/// Visitor that only checks structural parity.
pub struct ShapeCheck;

impl SchemaStateVisitor for ShapeCheck {
    type Output = ();

    fn leaf(&mut self, _schema: &FilterLeaf, _value: &Value) -> Result<()> {
        Ok(())
    }

    fn and(&mut self, _: &[FilterExpr], _: &[FilterFormState], _: Vec<()>) -> Result<()> {
        Ok(())
    }

    fn or(&mut self, _: &[FilterExpr], _: &[FilterFormState], _: Vec<()>) -> Result<()> {
        Ok(())
    }

    fn not(&mut self, _: &FilterExpr, _: &FilterFormState, _: ()) -> Result<()> {
        Ok(())
    }
}

/// Returns `Ok(())` when `state` can be folded against `schema`.
pub fn check_shape(schema: &FilterExpr, state: &FilterFormState) -> Result<()> {
    traverse_filter_schema_and_state(schema, state, &mut ShapeCheck)
}
