//! Client error types

use lakhash_crypto::CryptoError;
use lakhash_store::StoreError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Encryption error
    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),

    /// Chunk store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Empty files are never uploaded
    #[error("File is empty")]
    EmptyFile,

    /// File exceeds the configured upload limit
    #[error("File too large: {size} bytes (limit {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// No container record with this id
    #[error("Container not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking crypto worker panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ClientError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Store(StoreError::NotFound(_)))
    }
}
