//! Error types for the record store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur reading or writing local records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be parsed after every retry.
    #[error("could not load record from {path} after {attempts} attempts")]
    LoadFailed { path: PathBuf, attempts: u32 },
}
