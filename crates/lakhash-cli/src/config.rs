//! CLI configuration

use lakhash_client::VaultConfig;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Default directory holding one vault per blinded user
pub const DEFAULT_STORE_DIR: &str = ".lakhash";

/// Resolved command-line configuration
#[derive(Clone)]
pub struct CliConfig {
    /// Directory holding the vaults
    pub store_dir: PathBuf,
    /// Account identity
    pub identity: String,
    /// Account passphrase
    pub passphrase: Zeroizing<String>,
    /// Vault client settings
    pub vault: VaultConfig,
}

impl CliConfig {
    /// Create a config with default vault settings
    pub fn new(
        store_dir: impl Into<PathBuf>,
        identity: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            store_dir: store_dir.into(),
            identity: identity.into(),
            passphrase: Zeroizing::new(passphrase.into()),
            vault: VaultConfig::default(),
        }
    }

    /// Override the vault settings
    pub fn with_vault(mut self, vault: VaultConfig) -> Self {
        self.vault = vault;
        self
    }

    /// Vault directory of a blinded user.
    ///
    /// Only the local part of the blinded username is used; it is a run of
    /// lowercase letters and safe as a directory name.
    pub fn vault_dir(&self, username: &str) -> PathBuf {
        vault_dir(&self.store_dir, username)
    }
}

/// Vault directory for `username` under `store_dir`
pub fn vault_dir(store_dir: &Path, username: &str) -> PathBuf {
    let local = username.split('@').next().unwrap_or(username);
    store_dir.join(local)
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_DIR, String::new(), String::new())
    }
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("store_dir", &self.store_dir)
            .field("identity", &self.identity)
            .field("passphrase", &"[REDACTED]")
            .field("vault", &self.vault)
            .finish()
    }
}
