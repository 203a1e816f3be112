//! Reviewer decisions and the terminal transition.
//!
//! A decision travels as a compact string (`appr:{id}` / `rej:{id}`), parses
//! back into a [`DecisionCommand`], and is applied as a compare-and-swap in
//! the store. The loser of a two-reviewer race, and any repeated decision on
//! an already-terminal request, gets [`Outcome::NoLongerValid`] with no
//! state change.

use std::fmt;

use tarqim_core::ids::{AdminId, ChatId, IngestionId, UserId};
use tarqim_core::ingestion::{
  Closed, Decision, IngestionAction, IngestionRequest, IngestionStatus,
};
use tarqim_core::store::ArchiveStore;

use crate::error::{Error, Result};
use crate::pipeline::{Ingestor, Outcome};
use crate::vault::{AccessPolicy, MessageVault};

// ─── Decision encoding ───────────────────────────────────────────────────────

/// A reviewer decision in its wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionCommand {
  pub decision: Decision,
  pub id:       IngestionId,
}

impl DecisionCommand {
  /// Parse `appr:{id}` / `rej:{id}`. Anything else is not a decision.
  pub fn parse(text: &str) -> Option<Self> {
    let (word, id) = text.trim().split_once(':')?;
    let decision = match word {
      "appr" => Decision::Approve,
      "rej" => Decision::Reject,
      _ => return None,
    };
    let id = id.parse::<i64>().ok()?;
    Some(Self { decision, id: IngestionId(id) })
  }
}

impl fmt::Display for DecisionCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let word = match self.decision {
      Decision::Approve => "appr",
      Decision::Reject => "rej",
    };
    write!(f, "{word}:{}", self.id)
  }
}

/// Button label for the approve action. Replace requests are visually
/// distinguished so a reviewer cannot mistake them for plain adds.
pub fn approve_label(action: IngestionAction) -> &'static str {
  match action {
    IngestionAction::Add => "Approve",
    IngestionAction::Replace => "Approve استبدال",
  }
}

// ─── Applying decisions ──────────────────────────────────────────────────────

impl<S, V, P> Ingestor<S, V, P>
where
  S: ArchiveStore,
  V: MessageVault,
  P: AccessPolicy,
{
  /// Apply a reviewer decision.
  pub async fn decide(
    &self,
    chat: ChatId,
    reviewer: UserId,
    command: DecisionCommand,
  ) -> Result<Outcome> {
    let Some(admin) = self.access.admin_for(chat, reviewer).await else {
      return Ok(Outcome::Ignored);
    };
    let Some(request) = self
      .store
      .get_ingestion(command.id)
      .await
      .map_err(Error::store)?
    else {
      return Ok(Outcome::NoLongerValid);
    };
    if request.status.is_terminal() {
      return Ok(Outcome::NoLongerValid);
    }

    match command.decision {
      Decision::Approve => self.approve(admin, request).await,
      Decision::Reject => self.reject(admin, request).await,
    }
  }

  async fn approve(
    &self,
    admin: AdminId,
    request: IngestionRequest,
  ) -> Result<Outcome> {
    // Copy into the archive channel before any state changes; losing the
    // race below costs one orphan copy, never a half-approved record.
    let copy = self
      .vault
      .copy_to_archive(request.origin, self.config.archive_chat_id)
      .await
      .map_err(Error::vault)?;

    let closed = self
      .store
      .close_ingestion(request.id, IngestionStatus::Approved)
      .await
      .map_err(Error::store)?;
    let closed = match closed {
      Closed::Applied(closed) => closed,
      Closed::Stale(_) => {
        if let Err(err) = self.vault.discard(copy.storage).await {
          tracing::warn!(error = %err, "failed to discard an orphan archive copy");
        }
        return Ok(Outcome::NoLongerValid);
      }
    };

    let previous = match closed.action {
      IngestionAction::Replace => self
        .store
        .get_material(closed.material)
        .await
        .map_err(Error::store)?
        .and_then(|material| material.storage),
      IngestionAction::Add => None,
    };
    self
      .store
      .update_material_storage(closed.material, copy.storage, copy.file_uid)
      .await
      .map_err(Error::store)?;
    if let Some(old) = previous
      && let Err(err) = self.vault.discard(old).await
    {
      tracing::warn!(
        material = %closed.material,
        error = %err,
        "failed to delete the superseded archive copy"
      );
    }

    tracing::info!(
      ingestion = %closed.id,
      admin = admin.0,
      action = %closed.action,
      "ingestion approved"
    );
    Ok(Outcome::Applied(closed))
  }

  async fn reject(
    &self,
    admin: AdminId,
    request: IngestionRequest,
  ) -> Result<Outcome> {
    let closed = self
      .store
      .close_ingestion(request.id, IngestionStatus::Rejected)
      .await
      .map_err(Error::store)?;
    let closed = match closed {
      Closed::Applied(closed) => closed,
      Closed::Stale(_) => return Ok(Outcome::NoLongerValid),
    };

    // A rejected add never became visible; drop the provisional record so
    // its identity key frees up. A rejected replace touches nothing.
    if closed.action == IngestionAction::Add {
      self
        .store
        .delete_material(closed.material)
        .await
        .map_err(Error::store)?;
    }

    tracing::info!(
      ingestion = %closed.id,
      admin = admin.0,
      action = %closed.action,
      "ingestion rejected"
    );
    Ok(Outcome::Applied(closed))
  }
}
