//! The submission pipeline.
//!
//! One call to [`Ingestor::submit`] takes a caption-annotated file event
//! through the whole front half of the system: capability check, sensitivity
//! screen, tag parsing, context resolution, dedup, and finally either a
//! provisional material with a pending ingestion request or a structured
//! refusal. The back half — reviewer decisions — lives in
//! [`crate::approval`].
//!
//! `submit` and its siblings return `Result<Outcome, Error>`: `Err` is
//! reserved for infrastructure failures and leaves persisted state
//! unchanged; everything a user can cause is an [`Outcome`] value.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tarqim_core::annotation::ContentType;
use tarqim_core::ids::{ChatId, FileUid, MessageId, TopicId, UserId};
use tarqim_core::ingestion::{
  IngestionAction, IngestionRequest, NewIngestion, PendingReview,
};
use tarqim_core::material::{Inserted, MaterialRecord, NewMaterial, SourceRef};
use tarqim_core::store::{ArchiveStore, ContextTarget};
use tarqim_tags::{TagKind, alias_key, classify, clean};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::context;
use crate::dedup;
use crate::error::{Error, Result};
use crate::sensitivity::SensitivityPolicy;
use crate::sessions::{FollowSignal, ReplacePrompt, SessionBook};
use crate::vault::{AccessPolicy, MessageVault};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// One caption-annotated file event, as the embedder received it. `now` is
/// passed in rather than sampled so TTL behaviour stays deterministic.
#[derive(Debug, Clone)]
pub struct Submission {
  pub chat:      ChatId,
  pub topic:     Option<TopicId>,
  pub message:   MessageId,
  pub user:      UserId,
  pub caption:   String,
  pub file_name: Option<String>,
  pub file_uid:  Option<FileUid>,
  pub now:       DateTime<Utc>,
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A user-facing refusal: stable code plus corrective guidance text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
  pub code:     &'static str,
  pub guidance: String,
}

impl From<tarqim_tags::Error> for Refusal {
  fn from(err: tarqim_tags::Error) -> Self {
    Self { code: err.code(), guidance: err.guidance() }
  }
}

/// What the embedder should render back to the actor.
#[derive(Debug, Clone)]
pub enum Outcome {
  /// Validation refused the submission; no state was created.
  Refused(Refusal),
  /// The submission opened an ingestion request and now awaits review.
  AwaitingReview(PendingReview),
  /// A record with the same identity already exists; the submitter must
  /// confirm the replacement or cancel.
  ConfirmReplace { existing: MaterialRecord },
  /// An attendance notice was recorded against the chat's group term.
  TermRecorded,
  /// A follow chain is now open under `chain`.
  ChainOpened { chain: Uuid },
  /// The follow chain was closed.
  ChainClosed,
  /// The submitter cancelled the replace prompt.
  Cancelled,
  /// A reviewer decision was applied; the returned row carries the
  /// terminal status.
  Applied(IngestionRequest),
  /// The decision or confirmation no longer applies: the request already
  /// left `pending`, or the prompt expired.
  NoLongerValid,
  /// The actor holds no admin capability here; nothing happened.
  Ignored,
}

fn refuse(refusal: Refusal) -> Result<Outcome> {
  tracing::info!(code = refusal.code, "submission refused");
  Ok(Outcome::Refused(refusal))
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The ingestion service: the archive store, the chat transport, the
/// capability policy, and the per-conversation session state.
#[derive(Clone)]
pub struct Ingestor<S, V, P> {
  pub(crate) store:    Arc<S>,
  pub(crate) vault:    Arc<V>,
  pub(crate) access:   Arc<P>,
  pub(crate) config:   Arc<IngestConfig>,
  pub(crate) sessions: Arc<SessionBook>,
  screen:              Arc<SensitivityPolicy>,
}

impl<S, V, P> Ingestor<S, V, P>
where
  S: ArchiveStore,
  V: MessageVault,
  P: AccessPolicy,
{
  pub fn new(
    store: S,
    vault: V,
    access: P,
    config: IngestConfig,
  ) -> Result<Self> {
    let screen = SensitivityPolicy::new(&config.extra_sensitive_keywords)?;
    let sessions = SessionBook::new(
      Duration::seconds(config.follow_ttl_secs as i64),
      Duration::seconds(config.confirm_ttl_secs as i64),
    );
    Ok(Self {
      store:    Arc::new(store),
      vault:    Arc::new(vault),
      access:   Arc::new(access),
      config:   Arc::new(config),
      sessions: Arc::new(sessions),
      screen:   Arc::new(screen),
    })
  }

  /// Run a submission through the pipeline.
  pub async fn submit(&self, submission: Submission) -> Result<Outcome> {
    let Some(admin) =
      self.access.admin_for(submission.chat, submission.user).await
    else {
      return Ok(Outcome::Ignored);
    };

    if let Some(refusal) = self
      .screen
      .screen(&submission.caption, submission.file_name.as_deref())
    {
      return refuse(refusal);
    }

    let (caption, hits) = self.strip_context_tags(&submission.caption).await?;
    let annotation = match tarqim_tags::parse(&caption) {
      Ok(annotation) => annotation,
      Err(err) => return refuse(Refusal::from(err)),
    };

    let origin = SourceRef {
      chat:    submission.chat,
      topic:   submission.topic,
      message: submission.message,
    };

    if annotation.content_type == ContentType::Attendance {
      return self.record_attendance(origin, annotation.content_type).await;
    }

    let binding = match submission.topic {
      Some(topic) => self
        .store
        .topic_binding(submission.chat, topic)
        .await
        .map_err(Error::store)?,
      None => None,
    };
    let resolved = match context::merge(binding, &hits) {
      Ok(resolved) => resolved,
      Err(fault) => return refuse(fault.refusal()),
    };

    let key =
      dedup::identity_key(self.store.as_ref(), resolved, &annotation).await?;
    let alt_title = dedup::legacy_title(&annotation);
    if let Some(existing) = self
      .store
      .find_material(&key, alt_title.as_deref())
      .await
      .map_err(Error::store)?
    {
      return self.await_confirmation(&submission, origin, existing);
    }

    let new = NewMaterial {
      key,
      source: origin,
      file_uid: submission.file_uid.clone(),
      submitted_by: admin,
    };
    let record = match self.store.insert_material(new).await.map_err(Error::store)? {
      Inserted::Created(record) => record,
      // A concurrent submission won the insert; same answer as a dedup hit.
      Inserted::Duplicate(existing) => {
        return self.await_confirmation(&submission, origin, existing);
      }
    };

    let (chain, parent) =
      self.sessions.stamp(submission.chat, submission.user, submission.now);
    let request = self
      .store
      .open_ingestion(NewIngestion {
        material: record.id,
        action: IngestionAction::Add,
        origin,
        submitted_by: admin,
        chain,
        parent,
      })
      .await
      .map_err(Error::store)?;
    self.sessions.record_ingestion(
      submission.chat,
      submission.user,
      request.id,
      submission.now,
    );

    tracing::info!(
      ingestion = %request.id,
      material = %record.id,
      "add ingestion opened"
    );
    Ok(Outcome::AwaitingReview(PendingReview { request, material: record }))
  }

  /// The submitter confirmed replacing the existing record their
  /// submission collided with.
  pub async fn confirm_replace(
    &self,
    chat: ChatId,
    user: UserId,
    message: MessageId,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    let Some(admin) = self.access.admin_for(chat, user).await else {
      return Ok(Outcome::Ignored);
    };
    let Some(prompt) = self.sessions.take_confirm(chat, message, now) else {
      return Ok(Outcome::NoLongerValid);
    };
    // The target can vanish between prompt and answer if it was itself a
    // provisional record whose add got rejected meanwhile.
    let Some(material) = self
      .store
      .get_material(prompt.existing)
      .await
      .map_err(Error::store)?
    else {
      return Ok(Outcome::NoLongerValid);
    };

    let (chain, parent) = self.sessions.stamp(chat, user, now);
    let request = self
      .store
      .open_ingestion(NewIngestion {
        material: material.id,
        action: IngestionAction::Replace,
        origin: prompt.origin,
        submitted_by: admin,
        chain,
        parent,
      })
      .await
      .map_err(Error::store)?;
    self.sessions.record_ingestion(chat, user, request.id, now);

    tracing::info!(
      ingestion = %request.id,
      material = %material.id,
      "replace ingestion opened"
    );
    Ok(Outcome::AwaitingReview(PendingReview { request, material }))
  }

  /// The submitter cancelled the replace prompt.
  pub async fn cancel_replace(
    &self,
    chat: ChatId,
    user: UserId,
    message: MessageId,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    if self.access.admin_for(chat, user).await.is_none() {
      return Ok(Outcome::Ignored);
    }
    match self.sessions.take_confirm(chat, message, now) {
      Some(_) => Ok(Outcome::Cancelled),
      None => Ok(Outcome::NoLongerValid),
    }
  }

  /// Handle a follow-chain control signal.
  pub async fn signal(
    &self,
    chat: ChatId,
    user: UserId,
    signal: FollowSignal,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    if self.access.admin_for(chat, user).await.is_none() {
      return Ok(Outcome::Ignored);
    }
    match signal {
      FollowSignal::Open => {
        let chain = self.sessions.open_follow(chat, user, now);
        tracing::info!(%chain, "follow chain opened");
        Ok(Outcome::ChainOpened { chain })
      }
      FollowSignal::Close => {
        self.sessions.close_follow(chat, user);
        tracing::info!("follow chain closed");
        Ok(Outcome::ChainClosed)
      }
    }
  }

  /// Pending requests joined with their materials, oldest first.
  pub async fn pending(&self) -> Result<Vec<PendingReview>> {
    self.store.list_pending().await.map_err(Error::store)
  }

  /// Drop pending requests older than the configured age, together with
  /// their provisional `add` materials.
  pub async fn purge_stale(&self, now: DateTime<Utc>) -> Result<u64> {
    let cutoff =
      now - Duration::hours(self.config.pending_max_age_hours as i64);
    let purged =
      self.store.purge_stale_pending(cutoff).await.map_err(Error::store)?;
    if purged > 0 {
      tracing::info!(purged, "stale pending ingestions purged");
    }
    Ok(purged)
  }

  // ─── Pipeline stages ───────────────────────────────────────────────────────

  async fn record_attendance(
    &self,
    origin: SourceRef,
    kind: ContentType,
  ) -> Result<Outcome> {
    let Some(term) =
      self.store.group_term(origin.chat).await.map_err(Error::store)?
    else {
      return refuse(context::ContextFault::NoContext.refusal());
    };
    self
      .store
      .record_term_resource(term, kind, origin)
      .await
      .map_err(Error::store)?;
    tracing::info!(term = term.0, "term resource recorded");
    Ok(Outcome::TermRecorded)
  }

  /// Pull context-alias tags out of the caption before parsing.
  ///
  /// Only tokens the classifier does not recognise are candidates, so a
  /// context alias can never shadow a grammar tag. Unresolved unknown
  /// tokens stay in the caption and surface as `UNKNOWN-ALIAS` from the
  /// parser.
  async fn strip_context_tags(
    &self,
    caption: &str,
  ) -> Result<(String, Vec<ContextTarget>)> {
    let cleaned = clean(caption);
    let mut hits = Vec::new();
    let mut kept_lines = Vec::new();

    for line in cleaned.lines() {
      let mut kept_words: Vec<&str> = Vec::new();
      let mut stripped_any = false;
      for word in line.split_whitespace() {
        let mut is_alias = false;
        if word.starts_with('#')
          && matches!(classify(word, word), TagKind::Unknown)
        {
          if let Some(target) = self
            .store
            .resolve_context_alias(&alias_key(word))
            .await
            .map_err(Error::store)?
          {
            hits.push(target);
            is_alias = true;
          }
        }
        if is_alias {
          stripped_any = true;
        } else {
          kept_words.push(word);
        }
      }
      if stripped_any {
        kept_lines.push(kept_words.join(" "));
      } else {
        kept_lines.push(line.to_string());
      }
    }

    Ok((kept_lines.join("\n"), hits))
  }

  fn await_confirmation(
    &self,
    submission: &Submission,
    origin: SourceRef,
    existing: MaterialRecord,
  ) -> Result<Outcome> {
    self.sessions.remember_confirm(
      submission.chat,
      submission.message,
      ReplacePrompt { existing: existing.id, origin },
      submission.now,
    );
    tracing::info!(
      material = %existing.id,
      "duplicate identity, awaiting replace confirmation"
    );
    Ok(Outcome::ConfirmReplace { existing })
  }
}
