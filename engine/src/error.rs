//! Error types for the mockbase engine.

use crate::{RecordId, ResourceName};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// All possible errors from the mockbase engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceName),

    #[error("{resource} record not found: {id}")]
    RecordNotFound { resource: ResourceName, id: RecordId },

    // Request errors
    #[error("validation failed: {}", join_messages(.0))]
    Validation(Vec<FieldViolation>),

    #[error("not allowed to modify {resource} record {id}")]
    Forbidden { resource: ResourceName, id: RecordId },

    // State errors
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Violations carried by a validation error, empty for every other kind.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Error::Validation(violations) => violations,
            _ => &[],
        }
    }

    /// Whether the error means "nothing there" to a caller.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::UnknownResource(_) | Error::RecordNotFound { .. }
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong with a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    MissingField,
    TypeMismatch,
    OutOfRange,
    ReadOnlyFieldViolation,
    UnknownField,
}

/// One violated rule, reported against the field that broke it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldViolation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn join_messages(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
