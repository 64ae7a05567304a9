//! Error types for pattern sync.
//!
//! A missing snapshot is not an error (see [`crate::SyncOutcome`]), and a
//! failed storage read only ever resolves a baseline to "absent", so neither
//! appears here.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid pattern identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: &'static str },

    #[error("Malformed pattern snapshot: {message}")]
    MalformedSnapshot { message: String },

    #[error("Failed to write pattern {id} to {path:?}: {source}")]
    StorageWrite {
        id: String,
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Storage operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::MalformedSnapshot {
            message: err.to_string(),
        }
    }
}

impl SyncError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SyncError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// HTTP status code the transport should answer with.
    ///
    /// - 400: the request itself is unusable (bad identifier, bad snapshot)
    /// - 500: storage failed or timed out
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::InvalidIdentifier { .. } | SyncError::MalformedSnapshot { .. } => 400,
            SyncError::StorageWrite { .. }
            | SyncError::Io { .. }
            | SyncError::Timeout(_) => 500,
        }
    }

    /// Whether the same request could succeed if the client sends it again.
    ///
    /// The engine never retries on its own; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::StorageWrite { .. }
                | SyncError::Io { .. }
                | SyncError::Timeout(_)
        )
    }
}
