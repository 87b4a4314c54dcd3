#![forbid(unsafe_code)]

//! Error type shared by every layer of the crate.

use std::fmt;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Node kind reported by schema/state mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Comparison leaf.
    Leaf,
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
    /// Negation.
    Not,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Leaf => write!(f, "leaf"),
            NodeKind::And => write!(f, "and"),
            NodeKind::Or => write!(f, "or"),
            NodeKind::Not => write!(f, "not"),
        }
    }
}

/// Structured errors emitted by the filter, condition and query layers.
///
/// Schema/state mismatches mean the state tree was built against a different
/// schema. They are surfaced to the caller and never recovered locally.
#[derive(Debug, Error)]
pub enum ViewError {
    /// State node type differs from the schema node it was paired with.
    #[error("filter schema mismatch: expected {expected} node, found {found}")]
    SchemaMismatch {
        /// Type carried by the state node.
        expected: NodeKind,
        /// Type carried by the schema node.
        found: NodeKind,
    },
    /// State composite has more children than the schema composite.
    #[error("missing schema for child at index {index}")]
    MissingChildSchema {
        /// Index of the unmatched state child.
        index: usize,
    },
    /// JSON value could not be read as a boolean condition.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),
    /// JSON value could not be read as a field query or ordering.
    #[error("invalid field query: {0}")]
    InvalidFieldQuery(String),
    /// Builder misuse or otherwise invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// A runtime reference was not registered.
    #[error("unknown {kind} '{key}'")]
    UnknownCapability {
        /// Capability family, e.g. `transform`.
        kind: &'static str,
        /// Unresolved reference.
        key: String,
    },
    /// A date-typed leaf held a value that is not a recognizable date.
    #[error("invalid date '{value}' for field '{field}'")]
    InvalidDate {
        /// Date field path.
        field: String,
        /// Offending value as JSON text.
        value: String,
    },
    /// A descriptor or state file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// Serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ViewError {
    /// Builds a [`ViewError::SchemaMismatch`].
    pub fn mismatch(expected: NodeKind, found: NodeKind) -> Self {
        ViewError::SchemaMismatch { expected, found }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ViewError::SchemaMismatch { .. } => "SchemaMismatch",
            ViewError::MissingChildSchema { .. } => "MissingChildSchema",
            ViewError::InvalidCondition(_) => "InvalidCondition",
            ViewError::InvalidFieldQuery(_) => "InvalidFieldQuery",
            ViewError::Invalid(_) => "Invalid",
            ViewError::UnknownCapability { .. } => "UnknownCapability",
            ViewError::InvalidDate { .. } => "InvalidDate",
            ViewError::Io { .. } => "Io",
            ViewError::Json(_) => "Json",
        }
    }
}

/// Formats errors with their codes, e.g. `[SchemaMismatch] ...`.
pub struct ViewErrorWithCode<'a>(pub &'a ViewError);

impl fmt::Display for ViewErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_both_types() {
        let err = ViewError::mismatch(NodeKind::And, NodeKind::Or);
        assert_eq!(
            err.to_string(),
            "filter schema mismatch: expected and node, found or"
        );
        assert_eq!(
            ViewErrorWithCode(&err).to_string(),
            "[SchemaMismatch] filter schema mismatch: expected and node, found or"
        );
    }

    #[test]
    fn missing_child_names_index() {
        let err = ViewError::MissingChildSchema { index: 2 };
        assert_eq!(err.to_string(), "missing schema for child at index 2");
        assert_eq!(err.code(), "MissingChildSchema");
    }
}
