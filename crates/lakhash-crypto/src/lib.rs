//! # Lakhash Crypto
//!
//! The authenticated encryption engine behind Lakhash vaults.
//!
//! This crate provides:
//! - **Key derivation**: Argon2id (v0x13, 512 KiB, one lane) with positional key bundles
//! - **Stream layer**: ChaCha20 with a 64-bit nonce, re-keyed every 256 KiB by a
//!   one-way Whirlpool/SHA-512 ratchet
//! - **Block layer**: Serpent-256 CBC with an encrypted IV
//! - **Tags**: HMAC-SHA-512 over the plaintext, and a record tag binding a file's
//!   tag to its name and description
//! - **Credential blinding**: deterministic backend credentials and master secret
//!   derived from an identity and passphrase
//!
//! ## Envelope
//!
//! ```text
//! Salt(32) ‖ EncIV(16) ‖ CBC( ChaCha20*( Tag(64) ‖ plaintext ) )
//! ```
//!
//! Padding and integrity failures never abort decryption. They are returned as
//! a [`Verdict`] so a caller can still inspect what was recovered.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lakhash_crypto::{blinding, Pipeline};
//!
//! let credentials = blinding::blind("alice", "correct horse battery staple")?;
//! let session = credentials.into_session("alice");
//!
//! let pipeline = Pipeline::new();
//! let sealed = pipeline.encrypt_file(&session, b"Hello, World!")?;
//! let opened = pipeline.decrypt_file(&session, &sealed.envelope)?;
//! assert!(opened.verdict.is_clean());
//! ```

pub mod blinding;
pub mod block;
pub mod bundle;
pub mod error;
pub mod kdf;
pub mod pipeline;
pub mod progress;
pub mod ratchet;
pub mod session;
pub mod stream;
pub mod tagging;

pub use blinding::{blind, BlindedCredentials, BlindingParams};
pub use block::PaddingPolicy;
pub use bundle::{BundleLayout, KeyBundle, RecordKey};
pub use error::{CryptoError, Result};
pub use pipeline::{max_envelope_len, OpenedFile, OpenedMetadata, Pipeline, SealedFile, Verdict};
pub use progress::{Progress, ProgressCallback, Reporter, Stage};
pub use session::{MasterSecret, SessionContext};
pub use tagging::TAG_SIZE;
