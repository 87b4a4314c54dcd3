#![forbid(unsafe_code)]

//! Filter schemas, their form state and the machinery pairing the two.

/// Fluent schema construction.
pub mod builder;

/// Schema tree and leaf controls.
pub mod expr;

/// Assistant suggestion merging.
pub mod merge;

/// Persistence with date normalization.
pub mod serialize;

/// Form state tree and initial-state builders.
pub mod state;

/// Lockstep schema/state fold.
pub mod traverse;

pub use builder::FilterExprBuilder;
pub use expr::{
    FilterControl, FilterExpr, FilterField, FilterFieldGroup, FilterId, FilterLeaf,
    FilterOperator, FilterSchema, FilterSchemasAndGroups, FilterTransform, SelectOption,
    TransformOutcome,
};
pub use merge::merge_filter_state;
pub use serialize::{
    date_field_names, normalize_date_value, parse_filter_form_state,
    serialize_filter_form_state_map,
};
pub use state::{
    build_initial_filter_state, build_initial_form_state, is_empty_value, FilterFormState,
    FilterState, StateMode,
};
pub use traverse::{check_shape, traverse_filter_schema_and_state, SchemaStateVisitor, ShapeCheck};
