//! Error taxonomy for the explainer library.
//!
//! Storage and request failures carry enough detail (scope, HTTP status, server
//! message) for a user to diagnose a bad endpoint, a bad key, or a full quota.

use thiserror::Error;

use crate::blob::BlobError;

#[derive(Error, Debug)]
pub enum ExplainerError {
    /// A Blob Store read or write failed. The original cause is kept as the source.
    #[error("storage failure: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: BlobError,
    },

    /// The persisted history image could not be decoded.
    #[error("corrupt persisted state: {0}")]
    CorruptState(String),

    /// The LLM endpoint returned a non-success status or could not be reached.
    #[error("request failed: {message}")]
    Request { status: Option<u16>, message: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExplainerError {
    pub(crate) fn storage(context: impl Into<String>, source: BlobError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// HTTP status attached to a request failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type for explainer operations.
pub type Result<T> = std::result::Result<T, ExplainerError>;
