//! Error taxonomy for stored query execution.
//!
//! Root-not-found is deliberately absent: it is a successful, empty outcome
//! and never travels as an error.

use std::fmt;

use registry_state::StorageError;
use serde::Serialize;

/// What was wrong with a request's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationErrorKind {
    MissingRequired,
    MutuallyExclusive,
    CardinalityMismatch,
    TypeMismatch,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationErrorKind::MissingRequired => "missing required parameter",
            ValidationErrorKind::MutuallyExclusive => "mutually exclusive parameters",
            ValidationErrorKind::CardinalityMismatch => "cardinality mismatch",
            ValidationErrorKind::TypeMismatch => "type mismatch",
        })
    }
}

/// A parameter-set rule violation. Names every offending parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} ({}): {detail}", .parameters.join(", "))]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub parameters: Vec<String>,
    pub detail: String,
}

impl ValidationError {
    pub fn new<I, S>(kind: ValidationErrorKind, parameters: I, detail: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            parameters: parameters.into_iter().map(Into::into).collect(),
            detail: detail.into(),
        }
    }

    /// The first offending parameter.
    pub fn parameter(&self) -> &str {
        self.parameters.first().map(String::as_str).unwrap_or("")
    }
}

/// Errors produced while reading request slot text into raw parameter values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamParseError {
    #[error("parameter {name} has an empty value")]
    Empty { name: String },

    #[error("parameter {name}: unterminated value in {text:?}")]
    Unterminated { name: String, text: String },

    #[error("parameter {name}: unexpected {found:?} in {text:?}")]
    Unexpected {
        name: String,
        found: char,
        text: String,
    },

    #[error("parameter {name}: {text:?} is not an integer")]
    InvalidNumber { name: String, text: String },
}

/// Coarse grouping used by callers that map errors onto a wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    /// The request itself is malformed; fix and resend.
    Request,
    /// The registry store failed or holds inconsistent data.
    Backend,
    /// The engine broke one of its own invariants.
    Defect,
}

/// Stored query failures.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unknown stored query: {query_id}")]
    UnknownQuery { query_id: String },

    #[error("invalid parameters for {query_id}: {source}")]
    Validation {
        query_id: String,
        #[source]
        source: ValidationError,
    },

    #[error("backend failure in {query_id}: {cause}")]
    Backend {
        query_id: String,
        #[source]
        cause: StorageError,
    },

    #[error("association closure for {query_id} did not converge within {max_rounds} rounds")]
    ClosureDidNotConverge { query_id: String, max_rounds: usize },

    #[error("association {association_id} in {query_id} result references missing {missing_id}")]
    Inconsistency {
        query_id: String,
        association_id: String,
        missing_id: String,
    },
}

impl QueryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::UnknownQuery { .. } | QueryError::Validation { .. } => {
                ErrorCategory::Request
            }
            QueryError::Backend { .. } | QueryError::ClosureDidNotConverge { .. } => {
                ErrorCategory::Backend
            }
            QueryError::Inconsistency { .. } => ErrorCategory::Defect,
        }
    }

    pub fn validation_kind(&self) -> Option<ValidationErrorKind> {
        match self {
            QueryError::Validation { source, .. } => Some(source.kind),
            _ => None,
        }
    }

    pub fn query_id(&self) -> &str {
        match self {
            QueryError::UnknownQuery { query_id }
            | QueryError::Validation { query_id, .. }
            | QueryError::Backend { query_id, .. }
            | QueryError::ClosureDidNotConverge { query_id, .. }
            | QueryError::Inconsistency { query_id, .. } => query_id,
        }
    }
}

/// Result type for stored query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
