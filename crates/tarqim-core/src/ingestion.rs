//! Ingestion requests — the review units of the approval state machine.
//!
//! A request is born `pending` and transitions exactly once to `approved` or
//! `rejected`. Terminal rows are kept, not deleted, so a repeated reviewer
//! decision can be recognized as stale instead of failing. The terminal
//! transition is a compare-and-swap in the store; the loser of a two-reviewer
//! race observes [`Closed::Stale`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  ids::{AdminId, IngestionId, MaterialId},
  material::{MaterialRecord, SourceRef},
};

// ─── Status and action ───────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IngestionStatus {
  Pending,
  Approved,
  Rejected,
}

impl IngestionStatus {
  pub fn is_terminal(&self) -> bool { !matches!(self, Self::Pending) }
}

/// What approving this request does: archive a brand-new material (`Add`) or
/// swap the stored file of an existing one (`Replace`).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IngestionAction {
  Add,
  Replace,
}

/// A reviewer's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
  Approve,
  Reject,
}

// ─── Request rows ────────────────────────────────────────────────────────────

/// Input to [`crate::store::ArchiveStore::open_ingestion`].
/// `created_at` is set by the store; the request always opens `pending`.
#[derive(Debug, Clone)]
pub struct NewIngestion {
  pub material:     MaterialId,
  pub action:       IngestionAction,
  pub origin:       SourceRef,
  pub submitted_by: AdminId,
  /// Follow-chain membership, if a chain was active at submission time.
  pub chain:        Option<Uuid>,
  /// The previous ingestion in the chain, if any.
  pub parent:       Option<IngestionId>,
}

/// A review unit: links exactly one material (the new one for `add`, the
/// existing one being superseded for `replace`) to the originating message
/// and the submitting admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRequest {
  pub id:           IngestionId,
  pub material:     MaterialId,
  pub action:       IngestionAction,
  pub status:       IngestionStatus,
  pub origin:       SourceRef,
  pub submitted_by: AdminId,
  pub chain:        Option<Uuid>,
  pub parent:       Option<IngestionId>,
  pub created_at:   DateTime<Utc>,
}

// ─── Transition outcome ──────────────────────────────────────────────────────

/// Result of the atomic terminal transition
/// ([`crate::store::ArchiveStore::close_ingestion`]).
#[derive(Debug, Clone)]
pub enum Closed {
  /// The caller won the transition; the returned row carries the new status.
  Applied(IngestionRequest),
  /// The request was already terminal (`Some(status)`) or had been purged
  /// entirely (`None`). Either way the decision is reported as no longer
  /// valid, with no state change.
  Stale(Option<IngestionStatus>),
}

// ─── Reviewer surface ────────────────────────────────────────────────────────

/// A pending request joined with its material, as listed for reviewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
  pub request:  IngestionRequest,
  pub material: MaterialRecord,
}
