//! # Lakhash CLI
//!
//! Command-line front end for Lakhash vaults stored on the local filesystem.
//!
//! ```text
//! lakhash --identity alice credentials   blinded backend username and password
//! lakhash --identity alice fingerprint   master secret fingerprint
//! lakhash --identity alice upload FILE   encrypt and store a file
//! lakhash --identity alice list          decrypted titles and descriptions
//! lakhash --identity alice download ID   fetch, decrypt and verify a file
//! lakhash --identity alice delete ID     remove chunks, then the record
//! ```
//!
//! The passphrase is read from `--passphrase` or `LAKHASH_PASSPHRASE`.

pub mod commands;
pub mod config;

pub use config::{CliConfig, DEFAULT_STORE_DIR};
