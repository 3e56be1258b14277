use thiserror::Error;

use crate::models::TaskId;

/// Raised when a label does not name any value of one of the task enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Contract violations detected by the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("task {id} is malformed: {reason}")]
    InvalidTask { id: TaskId, reason: String },

    #[error("{year}-{month:02} is not a calendar month")]
    InvalidMonth { year: i32, month: u32 },
}

/// Errors surfaced by a task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {id} not found")]
    NotFound { id: TaskId },

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("user '{0}' already exists")]
    UserExists(String),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("stored {column} value '{value}' could not be read")]
    Corrupt { column: &'static str, value: String },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn not_found(id: TaskId) -> Self {
        Self::NotFound { id }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
