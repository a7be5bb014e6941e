//! Error handling for the terminology system
//!
//! This module provides idiomatic Rust error types using thiserror. The
//! taxonomy mirrors how the system degrades: storage failures are swallowed
//! (and logged) on the read path but surfaced on the write path, missing
//! data is a `NotFound`, and malformed input is rejected before any I/O.

use thiserror::Error;

/// Main error type for terminology operations
#[derive(Error, Debug)]
pub enum TerminologyError {
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input validation errors, rejected before any I/O
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Empty terminology key")]
    EmptyKey,

    #[error("Malformed terminology key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("Override behavior is required for {level}-level entries (key '{key}')")]
    MissingOverrideBehavior { level: String, key: String },

    #[error("{count} invalid record(s): {first}")]
    Batch { count: usize, first: String },
}

impl TerminologyError {
    pub fn storage(message: impl Into<String>) -> Self {
        TerminologyError::Storage {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        TerminologyError::NotFound { what: what.into() }
    }

    /// True when the error is a backend failure rather than bad input or
    /// missing data. Callers use this to decide whether to degrade to
    /// defaults instead of propagating.
    pub fn is_storage(&self) -> bool {
        matches!(self, TerminologyError::Storage { .. })
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for TerminologyError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => TerminologyError::not_found("row"),
            other => TerminologyError::storage(other.to_string()),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TerminologyError>;
