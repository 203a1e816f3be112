//! Identifier newtypes.
//!
//! Transport coordinates (chats, messages, topics) and persisted rows
//! (subjects, materials, ingestions) all travel as `i64`; wrapping them keeps
//! a chat id from ever being passed where a message id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Transport coordinates ───────────────────────────────────────────────────

/// A chat (group or channel) in the external transport.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// A transport user account.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// A message within a chat. Only meaningful together with its [`ChatId`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub i64);

/// A forum topic (thread) within a chat.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TopicId(pub i64);

// ─── Taxonomy rows ───────────────────────────────────────────────────────────

/// A course subject.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

/// An academic (Hijri) year row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct YearId(pub i64);

/// A lecturer row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LecturerId(pub i64);

/// An academic term row; chats belong to exactly one term.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TermId(pub i64);

/// A registered contributor admin, as resolved by the access policy.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AdminId(pub i64);

// ─── Archival rows ───────────────────────────────────────────────────────────

/// An archived material row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MaterialId(pub i64);

impl fmt::Display for MaterialId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// An ingestion request row. Rendered bare in reviewer decision strings,
/// so it keeps a `Display` impl.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IngestionId(pub i64);

impl fmt::Display for IngestionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── External storage fingerprint ────────────────────────────────────────────

/// The transport's stable per-file fingerprint (survives message copies).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileUid(pub String);
