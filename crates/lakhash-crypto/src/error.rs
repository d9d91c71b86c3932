//! Error types for the lakhash-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Fatal errors raised by the cryptographic core.
///
/// Padding and integrity problems are not errors: they are reported as
/// [`Verdict`](crate::pipeline::Verdict) flags next to the recovered data.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Argon2id rejected its parameters or failed to run
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key format or length
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Ciphertext is structurally impossible (too short, not block aligned)
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Invalid master secret length
    #[error("master secret must be {expected} bytes, got {actual}")]
    InvalidMasterSecret { expected: usize, actual: usize },

    /// Hex decode error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
