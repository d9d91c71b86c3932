//! Error types for the lakhash-store crate

use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during chunk storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Container record not found
    #[error("container not found: {0}")]
    NotFound(String),

    /// Container id is not a 1-64 character alphanumeric string
    #[error("invalid container id: {0:?}")]
    InvalidId(String),

    /// Reassembled ciphertext does not have the recorded shape
    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// A transport chunk is not valid hex
    #[error("malformed chunk: {0}")]
    MalformedChunk(#[from] hex::FromHexError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
