//! # Lakhash Store
//!
//! Chunk storage layer for Lakhash vaults.
//!
//! This crate provides:
//! - **Transport codec**: Split ciphertext into 16 KiB hex chunks and join them back
//! - **Container records**: Serde model of the per-file metadata document
//! - **Chunk stores**: Async key-value backends addressed by container id and chunk index
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              VaultClient                │
//! ├─────────────────────────────────────────┤
//! │           ChunkStore Trait              │
//! ├────────────────────┬────────────────────┤
//! │  MemoryChunkStore  │    FsChunkStore    │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! The store only ever sees hex strings and ciphertext lengths. It gives no
//! guarantee stronger than per-document atomicity.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lakhash_store::{Chunker, ChunkStore, MemoryChunkStore};
//!
//! let store = MemoryChunkStore::new();
//! for (index, chunk) in Chunker::new().split(&ciphertext).into_iter().enumerate() {
//!     store.put_chunk("Ab3dE6gH9j", index as u32, chunk).await?;
//! }
//! ```

pub mod chunker;
pub mod error;
pub mod fs;
pub mod memory;
pub mod record;

pub use chunker::{calculate_chunk_count, decode_chunk, Chunker, ChunkerConfig};
pub use error::{Result, StoreError};
pub use fs::FsChunkStore;
pub use memory::MemoryChunkStore;
pub use record::ContainerRecord;

use async_trait::async_trait;

/// Default transport chunk size (16 KiB of ciphertext, 32 KiB of hex)
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Maximum transport chunk size (512 KiB)
pub const MAX_CHUNK_SIZE: usize = 512 * 1024;

/// Longest accepted container id
pub const MAX_ID_LEN: usize = 64;

/// Trait for chunk storage backends
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Store one hex chunk, replacing any previous value
    async fn put_chunk(&self, container: &str, index: u32, chunk: String) -> Result<()>;

    /// Retrieve one hex chunk, `None` when absent
    async fn get_chunk(&self, container: &str, index: u32) -> Result<Option<String>>;

    /// Delete one chunk. Deleting an absent chunk succeeds.
    async fn delete_chunk(&self, container: &str, index: u32) -> Result<()>;

    /// Indices currently stored for a container, ascending
    async fn chunk_indices(&self, container: &str) -> Result<Vec<u32>>;

    /// Store a container record under `record.id`
    async fn put_metadata(&self, record: &ContainerRecord) -> Result<()>;

    /// Retrieve a container record
    async fn get_metadata(&self, id: &str) -> Result<Option<ContainerRecord>>;

    /// All container records
    async fn list_metadata(&self) -> Result<Vec<ContainerRecord>>;

    /// Delete a container record. Deleting an absent record succeeds.
    async fn delete_metadata(&self, id: &str) -> Result<()>;

    /// Check if a container record exists
    async fn container_exists(&self, id: &str) -> Result<bool> {
        Ok(self.get_metadata(id).await?.is_some())
    }
}

/// Reject ids that are empty, too long or not ASCII alphanumeric
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_ID_LEN || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}
