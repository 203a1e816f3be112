//! tarqim operations binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs one administrative command against it. The chat-facing
//! service embeds [`tarqim_ingest`] as a library; this binary covers the
//! review-queue chores that do not need the transport.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tarqim_core::ids::IngestionId;
use tarqim_core::store::ArchiveStore as _;
use tarqim_ingest::IngestConfig;
use tarqim_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "tarqim archive operations")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List ingestion requests still waiting for a reviewer.
  Pending,

  /// Show one ingestion request and its material.
  Show {
    /// Ingestion id.
    id: i64,
  },

  /// Drop pending requests older than the configured age.
  Purge {
    /// Override the age threshold in hours.
    #[arg(long)]
    hours: Option<u64>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config: IngestConfig = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TARQIM"))
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("invalid configuration")?;

  let store = SqliteStore::open(expand_tilde(&config.store_path))
    .await
    .context("failed to open the archive store")?;

  match cli.command {
    Command::Pending => {
      let pending = store.list_pending().await?;
      println!("{}", serde_json::to_string_pretty(&pending)?);
    }
    Command::Show { id } => {
      let id = IngestionId(id);
      let Some(request) = store.get_ingestion(id).await? else {
        anyhow::bail!("no ingestion {id}");
      };
      let material = store.get_material(request.material).await?;
      let view = json!({ "request": request, "material": material });
      println!("{}", serde_json::to_string_pretty(&view)?);
    }
    Command::Purge { hours } => {
      let hours = hours.unwrap_or(config.pending_max_age_hours);
      let cutoff = Utc::now() - Duration::hours(hours as i64);
      let purged = store.purge_stale_pending(cutoff).await?;
      tracing::info!(purged, hours, "purged stale pending requests");
      println!("purged {purged} stale pending requests");
    }
  }

  Ok(())
}

/// Expands a leading `~/` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
