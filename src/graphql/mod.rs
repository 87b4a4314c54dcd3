#![forbid(unsafe_code)]

//! Query document generation: column declarations, selection sets, the
//! operation AST, its rendering and the accompanying variables.

/// Operation AST and argument values.
pub mod ast;

/// Column field declarations.
pub mod field_query;

/// Document rendering.
pub mod render;

/// Selection-set generation and merging.
pub mod selection;

/// Query variables and keyset pagination.
pub mod variables;

pub use ast::{
    generate_graphql_query, generate_graphql_query_ast, Argument, GqlValue, GraphQLQueryAst,
    RootField, VariableDefinition,
};
pub use field_query::{FieldQuery, OrderBy, OrderDirection, QueryConfig};
pub use render::render_graphql_query;
pub use selection::{generate_selection_set_from_columns, merge_selection_sets, SelectionSetItem};
pub use variables::{build_graphql_query_variables, pagination_condition, QueryVariables};
