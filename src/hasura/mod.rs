#![forbid(unsafe_code)]

//! Backend boolean conditions: the tree type, its compiler and equality.

/// Condition tree and its JSON wire form.
pub mod condition;

/// Filter state to condition compiler.
pub mod compile;

/// Order-insensitive structural equality.
pub mod equality;

pub use compile::{build_conditions_recursive, build_hasura_conditions, build_nested_key};
pub use condition::{FieldCondition, HasuraCondition, HasuraOperator, OperatorKey};
pub use equality::{conditions_are_equal, operators_are_equal};
