//! [`SqliteStore`] — the SQLite implementation of [`ArchiveStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tarqim_core::{
  annotation::ContentType,
  ids::{
    ChatId, FileUid, IngestionId, LecturerId, MaterialId, MessageId,
    SubjectId, TermId, TopicId, YearId,
  },
  ingestion::{
    Closed, IngestionRequest, IngestionStatus, NewIngestion, PendingReview,
  },
  material::{
    Inserted, MaterialKey, MaterialRecord, NewMaterial, SourceRef, StorageRef,
  },
  store::{ArchiveStore, ContextTarget, TopicBinding},
};

use crate::{
  Error, Result,
  encode::{
    INGESTION_COLUMNS, MATERIAL_COLUMNS, RawIngestion, RawMaterial,
    decode_content_type, decode_section, decode_status, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tarqim archive store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// statements run serialized on its dedicated thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Identity-key match, written against the same expressions as the unique
/// index so the optional components compare NULL-folded.
const IDENTITY_WHERE: &str = "subject_id = ?1 \
   AND ifnull(section, '') = ifnull(?2, '') \
   AND content_type = ?3 \
   AND title = ?4 \
   AND ifnull(year_id, -1) = ifnull(?5, -1) \
   AND ifnull(lecturer_id, -1) = ifnull(?6, -1)";

enum RawInserted {
  Created(RawMaterial),
  Duplicate(RawMaterial),
}

enum RawClosed {
  Applied(RawIngestion),
  Stale(Option<String>),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Administration ────────────────────────────────────────────────────────
  //
  // Setup writes used by registration tooling and tests. Not part of
  // [`ArchiveStore`]: the ingestion pipeline only ever reads this data.

  /// Create a subject. Names are unique.
  pub async fn add_subject(&self, name: &str) -> Result<SubjectId> {
    let name = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(SubjectId(id))
  }

  /// Create an academic term. Names are unique.
  pub async fn register_term(&self, name: &str) -> Result<TermId> {
    let name = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO terms (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(TermId(id))
  }

  /// Register (or re-home) a source chat under a term.
  pub async fn register_group(&self, chat: ChatId, term: TermId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO groups (chat_id, term_id) VALUES (?1, ?2)",
          rusqlite::params![chat.0, term.0],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Bind (or re-bind) a forum topic to a subject and optional section.
  pub async fn bind_topic(
    &self,
    chat: ChatId,
    topic: TopicId,
    binding: TopicBinding,
  ) -> Result<()> {
    let section = binding.section.map(|s| s.to_string());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO topic_bindings
             (chat_id, topic_id, subject_id, section)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![chat.0, topic.0, binding.subject.0, section],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Register an in-text context tag. `alias` must already be in normalized
  /// key form.
  pub async fn register_context_alias(
    &self,
    alias: &str,
    target: ContextTarget,
  ) -> Result<()> {
    let alias = alias.to_owned();
    let (subject, section) = match target {
      ContextTarget::Subject(id) => (Some(id.0), None),
      ContextTarget::Section(s) => (None, Some(s.to_string())),
    };
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO context_aliases (alias, subject_id, section)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![alias, subject, section],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// All recorded resources for a term, oldest first.
  pub async fn term_resources(
    &self,
    term: TermId,
  ) -> Result<Vec<(ContentType, SourceRef)>> {
    let rows: Vec<(String, i64, Option<i64>, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT kind, chat_id, topic_id, message_id FROM term_resources
           WHERE term_id = ?1 ORDER BY resource_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![term.0], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(kind, chat, topic, message)| {
        Ok((decode_content_type(&kind)?, SourceRef {
          chat:    ChatId(chat),
          topic:   topic.map(TopicId),
          message: MessageId(message),
        }))
      })
      .collect()
  }

  /// Fetch one material row by id inside a running closure.
  fn material_row(
    conn: &rusqlite::Connection,
    id: i64,
  ) -> rusqlite::Result<Option<RawMaterial>> {
    conn
      .query_row(
        &format!(
          "SELECT {MATERIAL_COLUMNS} FROM materials WHERE material_id = ?1"
        ),
        rusqlite::params![id],
        RawMaterial::from_row,
      )
      .optional()
  }

  fn ingestion_row(
    conn: &rusqlite::Connection,
    id: i64,
  ) -> rusqlite::Result<Option<RawIngestion>> {
    conn
      .query_row(
        &format!(
          "SELECT {INGESTION_COLUMNS} FROM ingestions WHERE ingestion_id = ?1"
        ),
        rusqlite::params![id],
        RawIngestion::from_row,
      )
      .optional()
  }
}

// ─── ArchiveStore impl ───────────────────────────────────────────────────────

impl ArchiveStore for SqliteStore {
  type Error = Error;

  // ── Taxonomy ──────────────────────────────────────────────────────────────

  async fn ensure_year(&self, display: &str) -> Result<YearId> {
    let display = display.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO years (display) VALUES (?1)",
          rusqlite::params![display],
        )?;
        let id: i64 = conn.query_row(
          "SELECT year_id FROM years WHERE display = ?1",
          rusqlite::params![display],
          |r| r.get(0),
        )?;
        Ok(id)
      })
      .await?;
    Ok(YearId(id))
  }

  async fn ensure_lecturer(&self, name: &str) -> Result<LecturerId> {
    let name = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO lecturers (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        let id: i64 = conn.query_row(
          "SELECT lecturer_id FROM lecturers WHERE name = ?1",
          rusqlite::params![name],
          |r| r.get(0),
        )?;
        Ok(id)
      })
      .await?;
    Ok(LecturerId(id))
  }

  async fn topic_binding(
    &self,
    chat: ChatId,
    topic: TopicId,
  ) -> Result<Option<TopicBinding>> {
    let raw: Option<(i64, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, section FROM topic_bindings
               WHERE chat_id = ?1 AND topic_id = ?2",
              rusqlite::params![chat.0, topic.0],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(subject, section)| {
        Ok(TopicBinding {
          subject: SubjectId(subject),
          section: section.as_deref().map(decode_section).transpose()?,
        })
      })
      .transpose()
  }

  async fn resolve_context_alias(
    &self,
    alias: &str,
  ) -> Result<Option<ContextTarget>> {
    let alias = alias.to_owned();
    let raw: Option<(Option<i64>, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, section FROM context_aliases
               WHERE alias = ?1",
              rusqlite::params![alias],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|row| match row {
        (Some(subject), _) => Ok(ContextTarget::Subject(SubjectId(subject))),
        (None, Some(section)) => {
          Ok(ContextTarget::Section(decode_section(&section)?))
        }
        (None, None) => {
          Err(Error::Decode("context alias with no target".into()))
        }
      })
      .transpose()
  }

  async fn group_term(&self, chat: ChatId) -> Result<Option<TermId>> {
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT term_id FROM groups WHERE chat_id = ?1",
              rusqlite::params![chat.0],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(id.map(TermId))
  }

  async fn record_term_resource(
    &self,
    term: TermId,
    kind: ContentType,
    source: SourceRef,
  ) -> Result<()> {
    let kind_str = kind.to_string();
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO term_resources
             (term_id, kind, chat_id, topic_id, message_id, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            term.0,
            kind_str,
            source.chat.0,
            source.topic.map(|t| t.0),
            source.message.0,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Materials ─────────────────────────────────────────────────────────────

  async fn insert_material(&self, input: NewMaterial) -> Result<Inserted> {
    let section_str  = input.key.section.map(|s| s.to_string());
    let type_str     = input.key.content_type.to_string();
    let title        = input.key.title.clone();
    let subject      = input.key.subject.0;
    let year         = input.key.year.map(|y| y.0);
    let lecturer     = input.key.lecturer.map(|l| l.0);
    let file_uid     = input.file_uid.map(|f| f.0);
    let submitted_by = input.submitted_by.0;
    let source       = input.source;
    let at_str       = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let insert = conn.execute(
          "INSERT INTO materials (
             subject_id, section, content_type, title, year_id, lecturer_id,
             source_chat, source_topic, source_message, file_uid,
             submitted_by, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            subject,
            section_str,
            type_str,
            title,
            year,
            lecturer,
            source.chat.0,
            source.topic.map(|t| t.0),
            source.message.0,
            file_uid,
            submitted_by,
            at_str,
          ],
        );

        match insert {
          Ok(_) => {
            let id = conn.last_insert_rowid();
            let row = SqliteStore::material_row(conn, id)?
              .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            Ok(RawInserted::Created(row))
          }
          Err(rusqlite::Error::SqliteFailure(e, msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            // The identity index fired: surface the surviving row. Any
            // other constraint leaves this lookup empty and the original
            // error propagates.
            let survivor = conn
              .query_row(
                &format!(
                  "SELECT {MATERIAL_COLUMNS} FROM materials
                   WHERE {IDENTITY_WHERE}"
                ),
                rusqlite::params![
                  subject,
                  section_str,
                  type_str,
                  title,
                  year,
                  lecturer,
                ],
                RawMaterial::from_row,
              )
              .optional()?;
            match survivor {
              Some(row) => Ok(RawInserted::Duplicate(row)),
              None => Err(rusqlite::Error::SqliteFailure(e, msg).into()),
            }
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match raw {
      RawInserted::Created(row) => Ok(Inserted::Created(row.into_record()?)),
      RawInserted::Duplicate(row) => {
        Ok(Inserted::Duplicate(row.into_record()?))
      }
    }
  }

  async fn get_material(
    &self,
    id: MaterialId,
  ) -> Result<Option<MaterialRecord>> {
    let raw = self
      .conn
      .call(move |conn| Ok(SqliteStore::material_row(conn, id.0)?))
      .await?;
    raw.map(RawMaterial::into_record).transpose()
  }

  async fn find_material(
    &self,
    key: &MaterialKey,
    alt_title: Option<&str>,
  ) -> Result<Option<MaterialRecord>> {
    let section_str = key.section.map(|s| s.to_string());
    let type_str    = key.content_type.to_string();
    let title       = key.title.clone();
    let subject     = key.subject.0;
    let year        = key.year.map(|y| y.0);
    let lecturer    = key.lecturer.map(|l| l.0);
    let alt_title   = alt_title.map(str::to_owned);

    let raw = self
      .conn
      .call(move |conn| {
        let lookup = |conn: &rusqlite::Connection, title: &str| {
          conn
            .query_row(
              &format!(
                "SELECT {MATERIAL_COLUMNS} FROM materials
                 WHERE {IDENTITY_WHERE}"
              ),
              rusqlite::params![
                subject,
                section_str,
                type_str,
                title,
                year,
                lecturer,
              ],
              RawMaterial::from_row,
            )
            .optional()
        };

        if let Some(row) = lookup(conn, &title)? {
          return Ok(Some(row));
        }
        match alt_title {
          Some(alt) => Ok(lookup(conn, &alt)?),
          None => Ok(None),
        }
      })
      .await?;

    raw.map(RawMaterial::into_record).transpose()
  }

  async fn update_material_storage(
    &self,
    id: MaterialId,
    storage: StorageRef,
    file_uid: Option<FileUid>,
  ) -> Result<()> {
    let uid = file_uid.map(|f| f.0);
    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE materials
           SET storage_chat = ?2, storage_message = ?3,
               file_uid = coalesce(?4, file_uid)
           WHERE material_id = ?1",
          rusqlite::params![id.0, storage.chat.0, storage.message.0, uid],
        )?)
      })
      .await?;

    if rows == 0 {
      return Err(tarqim_core::Error::MaterialNotFound(id).into());
    }
    Ok(())
  }

  async fn delete_material(&self, id: MaterialId) -> Result<()> {
    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM materials WHERE material_id = ?1",
          rusqlite::params![id.0],
        )?)
      })
      .await?;

    if rows == 0 {
      return Err(tarqim_core::Error::MaterialNotFound(id).into());
    }
    Ok(())
  }

  // ── Ingestions ────────────────────────────────────────────────────────────

  async fn open_ingestion(
    &self,
    input: NewIngestion,
  ) -> Result<IngestionRequest> {
    let action_str = input.action.to_string();
    let chain_str  = input.chain.map(encode_uuid);
    let at_str     = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ingestions (
             material_id, action, status, origin_chat, origin_topic,
             origin_message, submitted_by, chain_id, parent_id, created_at
           ) VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            input.material.0,
            action_str,
            input.origin.chat.0,
            input.origin.topic.map(|t| t.0),
            input.origin.message.0,
            input.submitted_by.0,
            chain_str,
            input.parent.map(|p| p.0),
            at_str,
          ],
        )?;
        let id = conn.last_insert_rowid();
        let row = SqliteStore::ingestion_row(conn, id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(row)
      })
      .await?;

    raw.into_request()
  }

  async fn get_ingestion(
    &self,
    id: IngestionId,
  ) -> Result<Option<IngestionRequest>> {
    let raw = self
      .conn
      .call(move |conn| Ok(SqliteStore::ingestion_row(conn, id.0)?))
      .await?;
    raw.map(RawIngestion::into_request).transpose()
  }

  async fn list_pending(&self) -> Result<Vec<PendingReview>> {
    let raws: Vec<(RawIngestion, RawMaterial)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT
             i.ingestion_id, i.material_id, i.action, i.status,
             i.origin_chat, i.origin_topic, i.origin_message,
             i.submitted_by, i.chain_id, i.parent_id, i.created_at,
             m.material_id, m.subject_id, m.section, m.content_type,
             m.title, m.year_id, m.lecturer_id, m.storage_chat,
             m.storage_message, m.source_chat, m.source_topic,
             m.source_message, m.file_uid, m.submitted_by, m.created_at
           FROM ingestions i
           JOIN materials m ON m.material_id = i.material_id
           WHERE i.status = 'pending'
           ORDER BY i.created_at, i.ingestion_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              RawIngestion::from_row(row)?,
              RawMaterial::from_row_at(row, 11)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(req, mat)| {
        Ok(PendingReview {
          request:  req.into_request()?,
          material: mat.into_record()?,
        })
      })
      .collect()
  }

  async fn close_ingestion(
    &self,
    id: IngestionId,
    status: IngestionStatus,
  ) -> Result<Closed> {
    let status_str = status.to_string();

    let raw = self
      .conn
      .call(move |conn| {
        let rows = conn.execute(
          "UPDATE ingestions SET status = ?2
           WHERE ingestion_id = ?1 AND status = 'pending'",
          rusqlite::params![id.0, status_str],
        )?;

        if rows == 1 {
          let row = SqliteStore::ingestion_row(conn, id.0)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
          return Ok(RawClosed::Applied(row));
        }

        let current: Option<String> = conn
          .query_row(
            "SELECT status FROM ingestions WHERE ingestion_id = ?1",
            rusqlite::params![id.0],
            |r| r.get(0),
          )
          .optional()?;
        Ok(RawClosed::Stale(current))
      })
      .await?;

    match raw {
      RawClosed::Applied(row) => Ok(Closed::Applied(row.into_request()?)),
      RawClosed::Stale(current) => Ok(Closed::Stale(
        current.as_deref().map(decode_status).transpose()?,
      )),
    }
  }

  async fn purge_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64> {
    let cutoff_str = encode_dt(cutoff);
    let purged = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Provisional materials of stale `add` requests go with them;
        // `replace` requests point at already-archived materials, which
        // stay.
        tx.execute(
          "DELETE FROM materials
           WHERE storage_message IS NULL
             AND material_id IN (
               SELECT material_id FROM ingestions
               WHERE status = 'pending'
                 AND action = 'add'
                 AND created_at < ?1
             )",
          rusqlite::params![cutoff_str],
        )?;
        let purged = tx.execute(
          "DELETE FROM ingestions
           WHERE status = 'pending' AND created_at < ?1",
          rusqlite::params![cutoff_str],
        )?;
        tx.commit()?;
        Ok(purged as u64)
      })
      .await?;
    Ok(purged)
  }
}
