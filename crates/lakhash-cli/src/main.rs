//! Lakhash - encrypted file vault CLI

use clap::{Parser, Subcommand};
use lakhash_cli::{commands, CliConfig, DEFAULT_STORE_DIR};
use lakhash_client::{PaddingPolicy, Progress, ProgressCallback, VaultConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lakhash")]
#[command(about = "Encrypted file vault with layered ratcheted encryption")]
#[command(version)]
struct Args {
    /// Account identity (e-mail or user name)
    #[arg(short, long, env = "LAKHASH_IDENTITY")]
    identity: String,

    /// Account passphrase
    #[arg(short, long, env = "LAKHASH_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    /// Directory holding the vaults
    #[arg(short, long, default_value = DEFAULT_STORE_DIR, env = "LAKHASH_STORE_DIR")]
    store_dir: PathBuf,

    /// Write envelopes without a padding block for block-aligned data
    #[arg(long, env = "LAKHASH_LEGACY_PADDING")]
    legacy_padding: bool,

    /// Enable debug logging
    #[arg(short, long, env = "LAKHASH_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the blinded backend credentials
    Credentials,
    /// Print the master secret fingerprint
    Fingerprint,
    /// Encrypt and upload a file
    Upload {
        /// File to upload
        path: PathBuf,
        /// Stored file name (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
        /// Description stored with the file
        #[arg(long)]
        description: Option<String>,
    },
    /// List stored files
    List,
    /// Download, decrypt and verify a file
    Download {
        /// Container id
        id: String,
        /// Output path (defaults to the decrypted file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a file
    Delete {
        /// Container id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("lakhash={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let padding_policy = if args.legacy_padding {
        tracing::warn!("legacy padding: block-aligned files will not decrypt cleanly");
        PaddingPolicy::Legacy
    } else {
        PaddingPolicy::AlwaysPad
    };
    let config = CliConfig::new(args.store_dir, args.identity, args.passphrase)
        .with_vault(VaultConfig::default().with_padding_policy(padding_policy));

    let progress: ProgressCallback = Arc::new(|progress: Progress| {
        tracing::debug!(
            stage = progress.stage.label(),
            percent = progress.percentage(),
            "progress"
        );
    });

    match args.command {
        Command::Credentials => {
            let credentials = commands::blind_credentials(&config).await?;
            println!("{}", commands::format_credentials(&credentials));
        }
        Command::Fingerprint => {
            let credentials = commands::blind_credentials(&config).await?;
            println!("{}", credentials.fingerprint());
        }
        Command::Upload {
            path,
            name,
            description,
        } => {
            let vault = commands::open_vault(&config, Some(progress)).await?;
            let uploaded =
                commands::upload(&vault, &path, name.as_deref(), description.as_deref()).await?;
            println!("{}", uploaded.id);
        }
        Command::List => {
            let vault = commands::open_vault(&config, None).await?;
            println!("{}", commands::format_listing(&vault.list().await?));
        }
        Command::Download { id, output } => {
            let vault = commands::open_vault(&config, Some(progress)).await?;
            let (file, target) =
                commands::download(&vault, &id, &std::env::current_dir()?, output).await?;
            println!("{}", commands::format_report(&file, &target));
        }
        Command::Delete { id } => {
            let vault = commands::open_vault(&config, Some(progress)).await?;
            let deleted = vault.delete(&id).await?;
            println!(
                "deleted {} ({} chunks, {} failed)",
                deleted.id, deleted.chunks_deleted, deleted.chunks_failed
            );
        }
    }

    Ok(())
}
