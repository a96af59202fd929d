//! Error types for the entitlement store.

use thiserror::Error;

/// Entitlement and key-value storage errors.
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// The backing store could not be read.
    #[error("storage read failed: {0}")]
    StorageReadFailed(String),

    /// The backing store could not be written.
    #[error("storage write failed: {0}")]
    StorageWriteFailed(String),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for entitlement operations.
pub type EntitlementResult<T> = Result<T, EntitlementError>;
