//! Material records — the archived items and their identity key.
//!
//! A material is created provisionally on first submission and becomes
//! visible once approval finalizes its storage reference. No two non-deleted
//! materials may share an identity key; the storage layer enforces that
//! itself (see `tarqim-store-sqlite`), because dedup-check-then-insert is a
//! race under concurrent submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  annotation::ContentType,
  ids::{
    AdminId, ChatId, FileUid, LecturerId, MaterialId, MessageId, SubjectId,
    TopicId, YearId,
  },
};

// ─── Section ─────────────────────────────────────────────────────────────────

/// Which part of a subject a chat topic covers. Optional in the identity
/// key: some subjects are bound as a whole, without a section split.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Section {
  Theory,
  Discussion,
  Lab,
}

// ─── Message coordinates ─────────────────────────────────────────────────────

/// Where an archived copy of the file lives: the archive channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRef {
  pub chat:    ChatId,
  pub message: MessageId,
}

/// Where a submission came from: the contributor's original message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
  pub chat:    ChatId,
  pub topic:   Option<TopicId>,
  pub message: MessageId,
}

// ─── Identity key ────────────────────────────────────────────────────────────

/// The tuple that must be unique among non-deleted materials.
///
/// `year` and `lecturer` are genuinely optional components: two materials
/// that differ only in one of them being absent are distinct records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialKey {
  pub subject:      SubjectId,
  pub section:      Option<Section>,
  pub content_type: ContentType,
  pub title:        String,
  pub year:         Option<YearId>,
  pub lecturer:     Option<LecturerId>,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ArchiveStore::insert_material`].
/// `created_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewMaterial {
  pub key:          MaterialKey,
  pub source:       SourceRef,
  pub file_uid:     Option<FileUid>,
  pub submitted_by: AdminId,
}

/// An archived item. `storage` stays `None` while the initial submission is
/// pending; approval finalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
  pub id:           MaterialId,
  pub key:          MaterialKey,
  pub storage:      Option<StorageRef>,
  pub source:       SourceRef,
  pub file_uid:     Option<FileUid>,
  pub submitted_by: AdminId,
  pub created_at:   DateTime<Utc>,
}

/// Outcome of an insert attempt. A unique-index rejection is data, not an
/// error: the pipeline falls back to the replace-confirmation path with the
/// surviving record ("duplicate found late").
#[derive(Debug, Clone)]
pub enum Inserted {
  Created(MaterialRecord),
  Duplicate(MaterialRecord),
}
