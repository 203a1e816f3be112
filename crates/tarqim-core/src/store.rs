//! The `ArchiveStore` trait and supporting context types.
//!
//! The trait is implemented by storage backends (e.g. `tarqim-store-sqlite`).
//! Higher layers (`tarqim-ingest`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  annotation::ContentType,
  ids::{
    ChatId, FileUid, IngestionId, LecturerId, MaterialId, SubjectId, TermId,
    TopicId, YearId,
  },
  ingestion::{
    Closed, IngestionRequest, IngestionStatus, NewIngestion, PendingReview,
  },
  material::{
    Inserted, MaterialKey, MaterialRecord, NewMaterial, Section, SourceRef,
    StorageRef,
  },
};

// ─── Context types ───────────────────────────────────────────────────────────

/// What a chat topic is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicBinding {
  pub subject: SubjectId,
  pub section: Option<Section>,
}

/// What an in-text context tag resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextTarget {
  Subject(SubjectId),
  Section(Section),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an archive storage backend.
///
/// Inserts and terminal transitions carry the concurrency contract: the
/// backend itself enforces identity-key uniqueness (reporting a collision as
/// [`Inserted::Duplicate`]) and applies [`ArchiveStore::close_ingestion`] as
/// a single atomic compare-and-swap.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait ArchiveStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Taxonomy ──────────────────────────────────────────────────────────

  /// Look up a year row by display form, creating it on first use.
  fn ensure_year<'a>(
    &'a self,
    display: &'a str,
  ) -> impl Future<Output = Result<YearId, Self::Error>> + Send + 'a;

  /// Look up a lecturer row by display name, creating it on first use.
  fn ensure_lecturer<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<LecturerId, Self::Error>> + Send + 'a;

  /// The subject/section a chat topic is bound to, if any.
  fn topic_binding(
    &self,
    chat: ChatId,
    topic: TopicId,
  ) -> impl Future<Output = Result<Option<TopicBinding>, Self::Error>> + Send + '_;

  /// Resolve a normalized in-text tag to a subject or section.
  fn resolve_context_alias<'a>(
    &'a self,
    alias: &'a str,
  ) -> impl Future<Output = Result<Option<ContextTarget>, Self::Error>> + Send + 'a;

  /// The academic term a chat belongs to, if the chat is registered.
  fn group_term(
    &self,
    chat: ChatId,
  ) -> impl Future<Output = Result<Option<TermId>, Self::Error>> + Send + '_;

  /// Record a term-level notice (e.g. an attendance sheet) for a term.
  fn record_term_resource(
    &self,
    term: TermId,
    kind: ContentType,
    source: SourceRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Materials ─────────────────────────────────────────────────────────

  /// Insert a provisional material. A unique-index collision on the
  /// identity key yields [`Inserted::Duplicate`] with the surviving record,
  /// never a raw constraint error.
  fn insert_material(
    &self,
    input: NewMaterial,
  ) -> impl Future<Output = Result<Inserted, Self::Error>> + Send + '_;

  /// Retrieve a material by id. Returns `None` if not found.
  fn get_material(
    &self,
    id: MaterialId,
  ) -> impl Future<Output = Result<Option<MaterialRecord>, Self::Error>> + Send + '_;

  /// Exact identity-key lookup, NULL-aware on the optional components.
  ///
  /// `alt_title` is the legacy-title compatibility fallback: when the
  /// primary title misses, the same key is retried with this title. It is
  /// not part of the uniqueness invariant.
  fn find_material<'a>(
    &'a self,
    key: &'a MaterialKey,
    alt_title: Option<&'a str>,
  ) -> impl Future<Output = Result<Option<MaterialRecord>, Self::Error>> + Send + 'a;

  /// Finalize (or swap) a material's archived copy.
  fn update_material_storage(
    &self,
    id: MaterialId,
    storage: StorageRef,
    file_uid: Option<FileUid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a material row entirely (rejected initial submissions).
  fn delete_material(
    &self,
    id: MaterialId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Ingestions ────────────────────────────────────────────────────────

  /// Open a `pending` request and return the persisted row.
  fn open_ingestion(
    &self,
    input: NewIngestion,
  ) -> impl Future<Output = Result<IngestionRequest, Self::Error>> + Send + '_;

  /// Retrieve a request by id. Returns `None` if not found.
  fn get_ingestion(
    &self,
    id: IngestionId,
  ) -> impl Future<Output = Result<Option<IngestionRequest>, Self::Error>> + Send + '_;

  /// All pending requests, oldest first, each joined with its material.
  fn list_pending(
    &self,
  ) -> impl Future<Output = Result<Vec<PendingReview>, Self::Error>> + Send + '_;

  /// Atomically transition a request out of `pending`.
  ///
  /// `status` must be terminal. The update applies only if the row is still
  /// `pending`; otherwise the current (terminal or missing) state comes back
  /// as [`Closed::Stale`] and nothing changes.
  fn close_ingestion(
    &self,
    id: IngestionId,
    status: IngestionStatus,
  ) -> impl Future<Output = Result<Closed, Self::Error>> + Send + '_;

  /// Delete pending requests created before `cutoff`, together with the
  /// provisional materials of `add` requests. Returns how many requests
  /// were removed.
  fn purge_stale_pending(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
