//! Declarative data-grid views over a Hasura-style GraphQL backend.
//!
//! A [`View`] names a collection, its columns and the filters offered for
//! it. Filter schemas ([`filter::FilterExpr`]) drive a parallel form-state
//! tree ([`filter::FilterFormState`]); the pair compiles into a boolean
//! condition ([`hasura::HasuraCondition`]) that travels as a query variable
//! next to a document generated from the column declarations.

#![warn(missing_docs)]

pub mod data;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod graphql;
pub mod hasura;
pub mod registry;
pub mod view;

pub use error::{Result, ViewError};
pub use registry::Capabilities;
pub use view::{ColumnDefinition, View};
