//! Annotation types — the structured result of parsing a caption.
//!
//! An annotation is produced once per caption and never mutated afterwards.
//! The caption grammar itself (aliases, ordering rules) lives in
//! `tarqim-tags`; this crate only defines the vocabulary and the parsed
//! shape so stores and services can agree on them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ─── Content vocabulary ──────────────────────────────────────────────────────

/// What kind of archived item a submission declares itself to be.
/// The strum string form (snake_case) doubles as the database discriminant.
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
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentType {
  /// The lecture recording itself.
  Lecture,

  // ── Lecture attachments ──────────────────────────────────────────────────
  BoardImages,
  Slides,
  Audio,
  Video,
  MindMap,
  Transcript,
  Related,

  // ── Standalone items ─────────────────────────────────────────────────────
  ExamMid,
  ExamFinal,
  Syllabus,
  Attendance,
}

impl ContentType {
  /// Attachments ride alongside a lecture rather than being the lecture
  /// file itself; they share its session numbering and title.
  pub fn is_lecture_attachment(&self) -> bool {
    matches!(
      self,
      Self::BoardImages
        | Self::Slides
        | Self::Audio
        | Self::Video
        | Self::MindMap
        | Self::Transcript
        | Self::Related
    )
  }

  /// Whether the caption grammar demands a session marker for this type.
  pub fn requires_session(&self) -> bool {
    matches!(self, Self::Lecture) || self.is_lecture_attachment()
  }
}

// ─── Parsed annotation ───────────────────────────────────────────────────────

/// The structured result of a successful caption parse.
///
/// Immutable after construction; owned by whoever invoked the parser.
/// `raw_tags` preserves the tag lines as typed (post-normalization), in
/// order, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAnnotation {
  pub content_type: ContentType,
  /// Session (lecture) number; present iff the grammar required one.
  pub session_no:   Option<u32>,
  /// Title embedded in the session tag, if any.
  pub title:        Option<String>,
  /// Hijri year, already range-checked (1300-1600) by the classifier.
  pub year:         Option<u16>,
  /// Lecturer display name with the honorific prefix stripped.
  pub lecturer:     Option<String>,
  pub raw_tags:     Vec<String>,
}
