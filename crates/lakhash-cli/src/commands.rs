//! Command implementations
//!
//! Each command returns plain data or a printable string so that `main`
//! only parses arguments and prints.

use crate::config::CliConfig;
use anyhow::{bail, Context};
use lakhash_client::{DownloadedFile, FileEntry, ProgressCallback, UploadedFile, VaultClient};
use lakhash_crypto::{blind, BlindedCredentials};
use lakhash_store::FsChunkStore;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use zeroize::Zeroizing;

/// Blind identity and passphrase on a worker thread
pub async fn blind_credentials(config: &CliConfig) -> anyhow::Result<BlindedCredentials> {
    if config.identity.is_empty() || config.passphrase.is_empty() {
        bail!("identity and passphrase are both required");
    }
    let identity = config.identity.clone();
    let passphrase = Zeroizing::new(config.passphrase.as_str().to_string());
    info!("blinding credentials, this may take a while");
    let credentials =
        tokio::task::spawn_blocking(move || blind(&identity, &passphrase)).await??;
    Ok(credentials)
}

/// Open the filesystem vault of the configured user
pub async fn open_vault(
    config: &CliConfig,
    progress: Option<ProgressCallback>,
) -> anyhow::Result<VaultClient> {
    let credentials = blind_credentials(config).await?;
    let root = config.vault_dir(credentials.username());
    let store = FsChunkStore::open(&root)
        .await
        .with_context(|| format!("opening vault at {}", root.display()))?;
    info!(root = %root.display(), fingerprint = %credentials.fingerprint(), "vault opened");

    let session = credentials.into_session(config.identity.clone());
    let vault = VaultClient::new(Arc::new(store), Arc::new(session), config.vault.clone())?;
    Ok(match progress {
        Some(callback) => vault.with_progress(callback),
        None => vault,
    })
}

/// Backend credentials in printable form
pub fn format_credentials(credentials: &BlindedCredentials) -> String {
    format!(
        "username: {}\npassword: {}\nfingerprint: {}",
        credentials.username(),
        credentials.password(),
        credentials.fingerprint()
    )
}

/// Upload the file at `path`, named after its file name unless `name` is given
pub async fn upload(
    vault: &VaultClient,
    path: &Path,
    name: Option<&str>,
    description: Option<&str>,
) -> anyhow::Result<UploadedFile> {
    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?,
    };
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(vault.upload(&name, &data, description).await?)
}

/// One line per file, flagged when its metadata failed verification
pub fn format_listing(entries: &[FileEntry]) -> String {
    if entries.is_empty() {
        return "no files".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let size = entry
            .file_size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let flag = if entry.metadata_integrity() { "" } else { "  [metadata issues]" };
        let _ = writeln!(out, "{}  {:>10}  {}{}", entry.id, size, entry.title, flag);
        let _ = writeln!(out, "            {}", entry.description);
    }
    out.trim_end().to_string()
}

/// Output file name for a download: the base name of the decrypted title,
/// or the container id when the title is unusable
pub fn output_name(file: &DownloadedFile) -> String {
    if !file.report.title_integrity {
        return file.id.clone();
    }
    Path::new(&file.filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| file.id.clone())
}

/// Download a file into `output_dir`, or to `output` when given
pub async fn download(
    vault: &VaultClient,
    id: &str,
    output_dir: &Path,
    output: Option<PathBuf>,
) -> anyhow::Result<(DownloadedFile, PathBuf)> {
    let file = vault.download(id).await?;
    let target = output.unwrap_or_else(|| output_dir.join(output_name(&file)));
    tokio::fs::write(&target, &file.data)
        .await
        .with_context(|| format!("writing {}", target.display()))?;
    Ok((file, target))
}

/// Report lines of a download
pub fn format_report(file: &DownloadedFile, target: &Path) -> String {
    let mut lines: Vec<String> = file.report.messages().into_iter().map(String::from).collect();
    if file.report.broken_metadata {
        lines.push("Broken metadata: chunks were located by probing".to_string());
    }
    if !file.report.transport_complete {
        lines.push("Some file chunks were missing or malformed".to_string());
    }
    lines.push(format!("saved to {}", target.display()));
    lines.join("\n")
}
