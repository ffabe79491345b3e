//! Error types for the storage seams.

use thiserror::Error;

/// Result type for store and cache operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a storage or cache backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend-specific failure (database driver, network, lock poisoning).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes could not be interpreted.
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}
