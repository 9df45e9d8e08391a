//! Error types for Tabula

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for table engine operations
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Index {index} out of range for {len} rows")]
    IndexOutOfRange { index: i64, len: u64 },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("{message}")]
    Fetch { message: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Tabula operations
pub type Result<T> = std::result::Result<T, TabulaError>;

/// A failed fetch as recorded on a table: a user-facing message plus the
/// collaborator's raw reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub message: String,
    pub reason: String,
}

impl FetchFailure {
    pub fn new(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reason: reason.into(),
        }
    }
}

impl From<&TabulaError> for FetchFailure {
    fn from(err: &TabulaError) -> Self {
        match err {
            TabulaError::Fetch { message, reason } => FetchFailure::new(message, reason),
            other => FetchFailure::new(other.to_string(), other.to_string()),
        }
    }
}
