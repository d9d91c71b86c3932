//! Vault configuration

use crate::{ClientError, Result};
use lakhash_crypto::{max_envelope_len, PaddingPolicy};
use lakhash_store::Chunker;
use serde::{Deserialize, Serialize};

/// Description stored when the user gives none
pub const DEFAULT_DESCRIPTION: &str = "No description.";

/// Largest file accepted for upload (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Vault client configuration.
///
/// The transport chunk size is part of the stored format and is not
/// configurable: every vault uses [`lakhash_store::DEFAULT_CHUNK_SIZE`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Upload limit in plaintext bytes
    pub max_file_size: u64,
    /// Chunks written concurrently per upload batch
    pub upload_batch_size: usize,
    /// Chunks deleted per batch
    pub delete_batch_size: usize,
    /// CBC padding policy for new envelopes
    pub padding_policy: PaddingPolicy,
    /// Text used for a missing or blank description
    pub default_description: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            upload_batch_size: 8,
            delete_batch_size: 10,
            padding_policy: PaddingPolicy::default(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

impl VaultConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upload limit
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Set the upload batch size
    pub fn with_upload_batch_size(mut self, batch_size: usize) -> Self {
        self.upload_batch_size = batch_size;
        self
    }

    /// Set the delete batch size
    pub fn with_delete_batch_size(mut self, batch_size: usize) -> Self {
        self.delete_batch_size = batch_size;
        self
    }

    /// Set the padding policy
    pub fn with_padding_policy(mut self, padding_policy: PaddingPolicy) -> Self {
        self.padding_policy = padding_policy;
        self
    }

    /// Set the default description
    pub fn with_default_description(mut self, description: impl Into<String>) -> Self {
        self.default_description = description.into();
        self
    }

    /// Check every field and build the transport chunker
    pub fn chunker(&self) -> Result<Chunker> {
        if self.max_file_size == 0 {
            return Err(ClientError::Config("max_file_size must be positive".into()));
        }
        if self.upload_batch_size == 0 || self.delete_batch_size == 0 {
            return Err(ClientError::Config("batch sizes must be positive".into()));
        }
        if self.default_description.trim().is_empty() {
            return Err(ClientError::Config("default description must not be blank".into()));
        }
        Ok(Chunker::new())
    }

    /// Largest ciphertext an upload under this configuration can produce.
    ///
    /// Recorded lengths above this are not trusted.
    pub fn max_encrypted_length(&self) -> u64 {
        max_envelope_len(self.max_file_size)
    }

    /// Hex form under which the default description is stored unencrypted
    pub fn default_description_hex(&self) -> String {
        hex::encode(self.default_description.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.delete_batch_size, 10);
        assert_eq!(config.padding_policy, PaddingPolicy::AlwaysPad);
        assert_eq!(
            config.default_description_hex(),
            "4e6f206465736372697074696f6e2e"
        );
        assert_eq!(config.chunker().unwrap().chunk_size(), 16384);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(VaultConfig::new().with_max_file_size(0).chunker().is_err());
        assert!(VaultConfig::new().with_delete_batch_size(0).chunker().is_err());
        assert!(VaultConfig::new().with_default_description("  ").chunker().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: VaultConfig =
            serde_json::from_str(r#"{"padding_policy":"legacy","upload_batch_size":2}"#).unwrap();
        assert_eq!(config.padding_policy, PaddingPolicy::Legacy);
        assert_eq!(config.upload_batch_size, 2);
        assert_eq!(config.delete_batch_size, 10);
    }

    #[test]
    fn test_chunk_size_is_fixed_by_the_format() {
        // A stale config file naming a chunk size must not change the layout
        let config: VaultConfig = serde_json::from_str(r#"{"chunk_size":1024}"#).unwrap();
        assert_eq!(config.chunker().unwrap().chunk_size(), 16384);
    }

    #[test]
    fn test_max_encrypted_length() {
        // Salt, encrypted IV, then tag plus 5 MiB padded up to a whole block
        let config = VaultConfig::default();
        assert_eq!(config.max_encrypted_length(), 32 + 16 + 5 * 1024 * 1024 + 64 + 16);
        assert_eq!(
            config.with_max_file_size(10).max_encrypted_length(),
            32 + 16 + 80
        );
    }
}
