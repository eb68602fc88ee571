//! Error types for tree reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors: hashing, snapshot persistence and filesystem access
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to hash {path:?}: {source}")]
    HashFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot record at line {line}: {reason}")]
    MalformedSnapshot { line: usize, reason: String },

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Run-level errors. These abort a run before any filesystem mutation.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "No baseline snapshot found at {snapshot:?}. Provide the original installation sub-path \
         or make sure the snapshot file is in your backup folder."
    )]
    MissingBaseline { snapshot: PathBuf },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for RunError {
    fn from(err: config::ConfigError) -> Self {
        RunError::ConfigError(err.to_string())
    }
}
