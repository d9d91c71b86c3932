//! # Lakhash Client
//!
//! Encrypted file vault on top of a [`lakhash_store::ChunkStore`].
//!
//! ## Features
//!
//! - **Upload**: file, name and description sealed under the session's master
//!   secret, ciphertext split into hex chunks, a record tag binding all three
//! - **List**: titles and descriptions decrypted with independent checks
//! - **Download**: chunks reassembled and decrypted, every check reported
//!   separately in an [`IntegrityReport`]
//! - **Delete**: batched chunk deletion followed by the record
//!
//! Damaged records degrade to `"Broken Metadata"` and probing instead of
//! failing the whole operation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lakhash_client::{VaultClient, VaultConfig};
//! use lakhash_crypto::blind;
//! use lakhash_store::MemoryChunkStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = blind("alice", "correct horse")?.into_session("alice");
//!     let vault = VaultClient::new(
//!         Arc::new(MemoryChunkStore::new()),
//!         Arc::new(session),
//!         VaultConfig::default(),
//!     )?;
//!
//!     let uploaded = vault.upload("notes.txt", b"Hello, World!", None).await?;
//!     let file = vault.download(&uploaded.id).await?;
//!     assert!(file.report.is_clean());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod types;
mod vault;

pub use config::{VaultConfig, DEFAULT_DESCRIPTION, DEFAULT_MAX_FILE_SIZE};
pub use error::{ClientError, Result};
pub use types::*;
pub use vault::{generate_container_id, VaultClient, CONTAINER_ID_LEN};

// Re-export the types callers need to build a session and follow progress
pub use lakhash_crypto::{PaddingPolicy, Progress, ProgressCallback, SessionContext, Stage};
