//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, enums as their snake_case
//! strum form, chain ids as hyphenated lowercase UUIDs. Everything else is
//! the raw integer or text.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use tarqim_core::{
  annotation::ContentType,
  ids::{
    AdminId, ChatId, FileUid, IngestionId, LecturerId, MaterialId, MessageId,
    SubjectId, TopicId, YearId,
  },
  ingestion::{IngestionAction, IngestionRequest, IngestionStatus},
  material::{MaterialKey, MaterialRecord, Section, SourceRef, StorageRef},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalar codecs ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn unknown(kind: &'static str, value: &str) -> Error {
  Error::Core(tarqim_core::Error::UnknownDiscriminant {
    kind,
    value: value.to_owned(),
  })
}

pub fn decode_content_type(s: &str) -> Result<ContentType> {
  ContentType::from_str(s).map_err(|_| unknown("content type", s))
}

pub fn decode_section(s: &str) -> Result<Section> {
  Section::from_str(s).map_err(|_| unknown("section", s))
}

pub fn decode_status(s: &str) -> Result<IngestionStatus> {
  IngestionStatus::from_str(s).map_err(|_| unknown("ingestion status", s))
}

pub fn decode_action(s: &str) -> Result<IngestionAction> {
  IngestionAction::from_str(s).map_err(|_| unknown("ingestion action", s))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns read directly from a `materials` row.
pub struct RawMaterial {
  pub material_id:     i64,
  pub subject_id:      i64,
  pub section:         Option<String>,
  pub content_type:    String,
  pub title:           String,
  pub year_id:         Option<i64>,
  pub lecturer_id:     Option<i64>,
  pub storage_chat:    Option<i64>,
  pub storage_message: Option<i64>,
  pub source_chat:     i64,
  pub source_topic:    Option<i64>,
  pub source_message:  i64,
  pub file_uid:        Option<String>,
  pub submitted_by:    i64,
  pub created_at:      String,
}

/// Shared SELECT column list matching [`RawMaterial::from_row`].
pub const MATERIAL_COLUMNS: &str = "material_id, subject_id, section, \
   content_type, title, year_id, lecturer_id, storage_chat, storage_message, \
   source_chat, source_topic, source_message, file_uid, submitted_by, \
   created_at";

impl RawMaterial {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Self::from_row_at(row, 0)
  }

  /// Read the material columns starting at index `base` — for joined
  /// queries where they follow another table's columns.
  pub fn from_row_at(
    row: &rusqlite::Row<'_>,
    base: usize,
  ) -> rusqlite::Result<Self> {
    Ok(Self {
      material_id:     row.get(base)?,
      subject_id:      row.get(base + 1)?,
      section:         row.get(base + 2)?,
      content_type:    row.get(base + 3)?,
      title:           row.get(base + 4)?,
      year_id:         row.get(base + 5)?,
      lecturer_id:     row.get(base + 6)?,
      storage_chat:    row.get(base + 7)?,
      storage_message: row.get(base + 8)?,
      source_chat:     row.get(base + 9)?,
      source_topic:    row.get(base + 10)?,
      source_message:  row.get(base + 11)?,
      file_uid:        row.get(base + 12)?,
      submitted_by:    row.get(base + 13)?,
      created_at:      row.get(base + 14)?,
    })
  }

  pub fn into_record(self) -> Result<MaterialRecord> {
    let storage = match (self.storage_chat, self.storage_message) {
      (Some(chat), Some(message)) => Some(StorageRef {
        chat:    ChatId(chat),
        message: MessageId(message),
      }),
      (None, None) => None,
      _ => {
        return Err(Error::Decode(format!(
          "material {} has a half-set storage reference",
          self.material_id
        )));
      }
    };

    Ok(MaterialRecord {
      id:           MaterialId(self.material_id),
      key:          MaterialKey {
        subject:      SubjectId(self.subject_id),
        section:      self
          .section
          .as_deref()
          .map(decode_section)
          .transpose()?,
        content_type: decode_content_type(&self.content_type)?,
        title:        self.title,
        year:         self.year_id.map(YearId),
        lecturer:     self.lecturer_id.map(LecturerId),
      },
      storage,
      source:       SourceRef {
        chat:    ChatId(self.source_chat),
        topic:   self.source_topic.map(TopicId),
        message: MessageId(self.source_message),
      },
      file_uid:     self.file_uid.map(FileUid),
      submitted_by: AdminId(self.submitted_by),
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw columns read directly from an `ingestions` row.
pub struct RawIngestion {
  pub ingestion_id:   i64,
  pub material_id:    i64,
  pub action:         String,
  pub status:         String,
  pub origin_chat:    i64,
  pub origin_topic:   Option<i64>,
  pub origin_message: i64,
  pub submitted_by:   i64,
  pub chain_id:       Option<String>,
  pub parent_id:      Option<i64>,
  pub created_at:     String,
}

/// Shared SELECT column list matching [`RawIngestion::from_row`].
pub const INGESTION_COLUMNS: &str = "ingestion_id, material_id, action, \
   status, origin_chat, origin_topic, origin_message, submitted_by, \
   chain_id, parent_id, created_at";

impl RawIngestion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ingestion_id:   row.get(0)?,
      material_id:    row.get(1)?,
      action:         row.get(2)?,
      status:         row.get(3)?,
      origin_chat:    row.get(4)?,
      origin_topic:   row.get(5)?,
      origin_message: row.get(6)?,
      submitted_by:   row.get(7)?,
      chain_id:       row.get(8)?,
      parent_id:      row.get(9)?,
      created_at:     row.get(10)?,
    })
  }

  pub fn into_request(self) -> Result<IngestionRequest> {
    Ok(IngestionRequest {
      id:           IngestionId(self.ingestion_id),
      material:     MaterialId(self.material_id),
      action:       decode_action(&self.action)?,
      status:       decode_status(&self.status)?,
      origin:       SourceRef {
        chat:    ChatId(self.origin_chat),
        topic:   self.origin_topic.map(TopicId),
        message: MessageId(self.origin_message),
      },
      submitted_by: AdminId(self.submitted_by),
      chain:        self
        .chain_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      parent:       self.parent_id.map(IngestionId),
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
