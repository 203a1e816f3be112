//! Runtime configuration for the ingestion service and the `tarqim` CLI.

use std::path::PathBuf;

use serde::Deserialize;
use tarqim_core::ids::ChatId;

/// Service configuration, deserialised from `config.toml` plus `TARQIM_*`
/// environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
  /// SQLite database path (`:memory:` for tests).
  pub store_path:      PathBuf,
  /// Channel that receives the archived copies.
  pub archive_chat_id: ChatId,

  /// Follow-chain window; each chained submission extends it.
  #[serde(default = "default_follow_ttl")]
  pub follow_ttl_secs: u64,

  /// How long a replace-or-cancel prompt stays answerable.
  #[serde(default = "default_confirm_ttl")]
  pub confirm_ttl_secs: u64,

  /// Age at which pending ingestions become purgeable.
  #[serde(default = "default_pending_max_age")]
  pub pending_max_age_hours: u64,

  /// Extra keywords for the sensitivity screen, on top of the built-ins.
  #[serde(default)]
  pub extra_sensitive_keywords: Vec<String>,
}

fn default_follow_ttl() -> u64 { 600 }

fn default_confirm_ttl() -> u64 { 300 }

fn default_pending_max_age() -> u64 { 24 }
