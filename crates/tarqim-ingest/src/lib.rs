//! Ingestion service for the tarqim archive.
//!
//! Wires the caption parser ([`tarqim_tags`]), an [`ArchiveStore`]
//! implementation, and a chat transport behind [`vault::MessageVault`] into
//! the submission pipeline and the reviewer approval workflow. The embedder
//! supplies the transport and renders [`pipeline::Outcome`] values; this
//! crate owns every state transition in between.
//!
//! [`ArchiveStore`]: tarqim_core::store::ArchiveStore

pub mod approval;
pub mod config;
pub mod context;
pub mod dedup;
pub mod error;
pub mod pipeline;
pub mod sensitivity;
pub mod sessions;
pub mod vault;

pub use config::IngestConfig;
pub use error::{Error, Result};
pub use pipeline::{Ingestor, Outcome, Refusal, Submission};
pub use sessions::FollowSignal;
pub use vault::{AccessPolicy, ArchivedCopy, MessageVault};

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use tarqim_core::annotation::ContentType;
  use tarqim_core::ids::{ChatId, FileUid, MessageId, TopicId, UserId};
  use tarqim_core::ingestion::{
    Decision, IngestionAction, IngestionStatus, PendingReview,
  };
  use tarqim_core::store::{ArchiveStore, ContextTarget, TopicBinding};
  use tarqim_store_sqlite::SqliteStore;

  use crate::approval::DecisionCommand;
  use crate::config::IngestConfig;
  use crate::pipeline::{Ingestor, Outcome, Submission};
  use crate::sessions::FollowSignal;
  use crate::vault::testing::{AllowAll, DenyAll, MockVault};

  const ARCHIVE: ChatId = ChatId(-900);
  const CHAT: ChatId = ChatId(-100);
  const TOPIC: TopicId = TopicId(7);
  const USER: UserId = UserId(42);
  const REVIEWER: UserId = UserId(9);

  fn config() -> IngestConfig {
    IngestConfig {
      store_path:               ":memory:".into(),
      archive_chat_id:          ARCHIVE,
      follow_ttl_secs:          600,
      confirm_ttl_secs:         300,
      pending_max_age_hours:    24,
      extra_sensitive_keywords: Vec::new(),
    }
  }

  async fn bound_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let subject = store.add_subject("التشريح").await.unwrap();
    store
      .bind_topic(CHAT, TOPIC, TopicBinding { subject, section: None })
      .await
      .unwrap();
    store
  }

  fn service(
    store: SqliteStore,
  ) -> (Ingestor<SqliteStore, MockVault, AllowAll>, MockVault) {
    let vault = MockVault::default();
    let ingestor =
      Ingestor::new(store, vault.clone(), AllowAll, config()).unwrap();
    (ingestor, vault)
  }

  fn lecture_caption(n: u32) -> String {
    format!("#محاضرة\n#المحاضرة_{n}: مدخل إلى التشريح\n#1446")
  }

  fn submission(message: i64, caption: &str) -> Submission {
    Submission {
      chat:      CHAT,
      topic:     Some(TOPIC),
      message:   MessageId(message),
      user:      USER,
      caption:   caption.to_string(),
      file_name: Some("lecture.pdf".to_string()),
      file_uid:  Some(FileUid(format!("file-{message}"))),
      now:       Utc::now(),
    }
  }

  fn awaiting(outcome: Outcome) -> PendingReview {
    match outcome {
      Outcome::AwaitingReview(review) => review,
      other => panic!("expected AwaitingReview, got {other:?}"),
    }
  }

  fn refused_code(outcome: Outcome) -> &'static str {
    match outcome {
      Outcome::Refused(refusal) => refusal.code,
      other => panic!("expected Refused, got {other:?}"),
    }
  }

  fn approve(id: tarqim_core::ids::IngestionId) -> DecisionCommand {
    DecisionCommand { decision: Decision::Approve, id }
  }

  fn reject(id: tarqim_core::ids::IngestionId) -> DecisionCommand {
    DecisionCommand { decision: Decision::Reject, id }
  }

  // ── Submission ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn a_new_submission_opens_a_pending_add() {
    let store = bound_store().await;
    let (svc, _) = service(store);

    let review =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());
    assert_eq!(review.request.action, IngestionAction::Add);
    assert_eq!(review.request.status, IngestionStatus::Pending);
    assert_eq!(review.request.chain, None);
    assert!(review.material.storage.is_none());
    assert_eq!(review.material.key.title, "محاضرة 1: مدخل إلى التشريح");

    assert_eq!(svc.pending().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn tag_refusals_carry_code_and_guidance() {
    let store = bound_store().await;
    let (svc, _) = service(store);

    // Year ahead of the session tag.
    let caption = "#محاضرة\n#1446\n#المحاضرة_1: مدخل";
    let outcome = svc.submit(submission(1, caption)).await.unwrap();
    match outcome {
      Outcome::Refused(refusal) => {
        assert_eq!(refusal.code, "ORDER-VIOLATION");
        assert!(refusal.guidance.contains("#محاضرة"), "{}", refusal.guidance);
      }
      other => panic!("expected Refused, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn sensitive_captions_are_refused_before_any_state() {
    let store = bound_store().await;
    let (svc, _) = service(store);

    let caption = format!("رقم الهوية 1023456789\n{}", lecture_caption(1));
    let outcome = svc.submit(submission(1, &caption)).await.unwrap();
    assert_eq!(refused_code(outcome), "SENSITIVITY-BLOCK");
    assert!(svc.pending().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn non_admins_are_ignored() {
    let store = bound_store().await;
    let svc =
      Ingestor::new(store, MockVault::default(), DenyAll, config()).unwrap();

    let outcome = svc.submit(submission(1, &lecture_caption(1))).await.unwrap();
    assert!(matches!(outcome, Outcome::Ignored));

    let outcome = svc
      .signal(CHAT, USER, FollowSignal::Open, Utc::now())
      .await
      .unwrap();
    assert!(matches!(outcome, Outcome::Ignored));
  }

  // ── Context resolution ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn alias_tags_resolve_context_in_unbound_chats() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let subject = store.add_subject("الفسلجة").await.unwrap();
    store
      .register_context_alias("الفسلجة", ContextTarget::Subject(subject))
      .await
      .unwrap();
    let (svc, _) = service(store);

    let caption = format!("#الفسلجة\n{}", lecture_caption(1));
    let mut sub = submission(1, &caption);
    sub.topic = None;
    let review = awaiting(svc.submit(sub).await.unwrap());
    assert_eq!(review.material.key.subject, subject);
  }

  #[tokio::test]
  async fn conflicting_alias_tags_are_refused() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let anatomy = store.add_subject("التشريح").await.unwrap();
    let physiology = store.add_subject("الفسلجة").await.unwrap();
    store
      .register_context_alias("التشريح", ContextTarget::Subject(anatomy))
      .await
      .unwrap();
    store
      .register_context_alias("الفسلجة", ContextTarget::Subject(physiology))
      .await
      .unwrap();
    let (svc, _) = service(store);

    let caption = format!("#التشريح #الفسلجة\n{}", lecture_caption(1));
    let mut sub = submission(1, &caption);
    sub.topic = None;
    let outcome = svc.submit(sub).await.unwrap();
    assert_eq!(refused_code(outcome), "ALIAS-CONFLICT");
  }

  #[tokio::test]
  async fn an_unbound_chat_without_alias_tags_has_no_context() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (svc, _) = service(store);

    let mut sub = submission(1, &lecture_caption(1));
    sub.topic = None;
    let outcome = svc.submit(sub).await.unwrap();
    assert_eq!(refused_code(outcome), "NO-CONTEXT");
  }

  // ── Dedup and replace ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn a_second_identical_submission_asks_to_replace() {
    let store = bound_store().await;
    let (svc, _) = service(store);

    let first =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());

    let outcome = svc.submit(submission(2, &lecture_caption(1))).await.unwrap();
    let existing = match outcome {
      Outcome::ConfirmReplace { existing } => existing,
      other => panic!("expected ConfirmReplace, got {other:?}"),
    };
    assert_eq!(existing.id, first.material.id);

    let review = awaiting(
      svc
        .confirm_replace(CHAT, USER, MessageId(2), Utc::now())
        .await
        .unwrap(),
    );
    assert_eq!(review.request.action, IngestionAction::Replace);
    assert_eq!(review.request.material, first.material.id);
  }

  #[tokio::test]
  async fn an_expired_replace_prompt_no_longer_confirms() {
    let store = bound_store().await;
    let (svc, _) = service(store);
    let t0 = Utc::now();

    let mut first = submission(1, &lecture_caption(1));
    first.now = t0;
    svc.submit(first).await.unwrap();
    let mut second = submission(2, &lecture_caption(1));
    second.now = t0;
    svc.submit(second).await.unwrap();

    let late = t0 + Duration::seconds(301);
    let outcome =
      svc.confirm_replace(CHAT, USER, MessageId(2), late).await.unwrap();
    assert!(matches!(outcome, Outcome::NoLongerValid));
  }

  #[tokio::test]
  async fn cancelling_a_replace_prompt_is_single_shot() {
    let store = bound_store().await;
    let (svc, _) = service(store);

    svc.submit(submission(1, &lecture_caption(1))).await.unwrap();
    svc.submit(submission(2, &lecture_caption(1))).await.unwrap();

    let now = Utc::now();
    let outcome =
      svc.cancel_replace(CHAT, USER, MessageId(2), now).await.unwrap();
    assert!(matches!(outcome, Outcome::Cancelled));
    let outcome =
      svc.cancel_replace(CHAT, USER, MessageId(2), now).await.unwrap();
    assert!(matches!(outcome, Outcome::NoLongerValid));
  }

  // ── Approval ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn approving_an_add_finalizes_the_storage_reference() {
    let store = bound_store().await;
    let (svc, vault) = service(store.clone());

    let review =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());
    let outcome = svc
      .decide(ARCHIVE, REVIEWER, approve(review.request.id))
      .await
      .unwrap();
    let closed = match outcome {
      Outcome::Applied(closed) => closed,
      other => panic!("expected Applied, got {other:?}"),
    };
    assert_eq!(closed.status, IngestionStatus::Approved);

    let material =
      store.get_material(review.material.id).await.unwrap().unwrap();
    let storage = material.storage.unwrap();
    assert_eq!(storage.chat, ARCHIVE);
    assert_eq!(material.file_uid, Some(FileUid("vault-1".to_string())));
    assert_eq!(vault.copied().len(), 1);
    assert!(svc.pending().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn approving_a_replace_swaps_the_archive_copy() {
    let store = bound_store().await;
    let (svc, vault) = service(store.clone());

    let first =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());
    svc
      .decide(ARCHIVE, REVIEWER, approve(first.request.id))
      .await
      .unwrap();
    let old_storage =
      store.get_material(first.material.id).await.unwrap().unwrap().storage;

    svc.submit(submission(2, &lecture_caption(1))).await.unwrap();
    let replace = awaiting(
      svc
        .confirm_replace(CHAT, USER, MessageId(2), Utc::now())
        .await
        .unwrap(),
    );
    let outcome = svc
      .decide(ARCHIVE, REVIEWER, approve(replace.request.id))
      .await
      .unwrap();
    assert!(matches!(outcome, Outcome::Applied(_)));

    let material =
      store.get_material(first.material.id).await.unwrap().unwrap();
    assert_eq!(material.storage.unwrap().message, MessageId(2));
    assert_eq!(material.file_uid, Some(FileUid("vault-2".to_string())));
    assert_eq!(vault.discarded(), vec![old_storage.unwrap()]);
  }

  #[tokio::test]
  async fn a_failing_old_copy_deletion_keeps_the_record_updated() {
    let store = bound_store().await;
    let (svc, vault) = service(store.clone());

    let first =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());
    svc
      .decide(ARCHIVE, REVIEWER, approve(first.request.id))
      .await
      .unwrap();

    svc.submit(submission(2, &lecture_caption(1))).await.unwrap();
    let replace = awaiting(
      svc
        .confirm_replace(CHAT, USER, MessageId(2), Utc::now())
        .await
        .unwrap(),
    );
    vault.fail_discards();
    let outcome = svc
      .decide(ARCHIVE, REVIEWER, approve(replace.request.id))
      .await
      .unwrap();
    assert!(matches!(outcome, Outcome::Applied(_)));

    let material =
      store.get_material(first.material.id).await.unwrap().unwrap();
    assert_eq!(material.storage.unwrap().message, MessageId(2));
    assert!(vault.discarded().is_empty());
  }

  #[tokio::test]
  async fn rejecting_an_add_discards_the_provisional_record() {
    let store = bound_store().await;
    let (svc, _) = service(store.clone());

    let review =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());
    let outcome = svc
      .decide(ARCHIVE, REVIEWER, reject(review.request.id))
      .await
      .unwrap();
    let closed = match outcome {
      Outcome::Applied(closed) => closed,
      other => panic!("expected Applied, got {other:?}"),
    };
    assert_eq!(closed.status, IngestionStatus::Rejected);
    assert!(store.get_material(review.material.id).await.unwrap().is_none());

    // The identity key is free again.
    let again = svc.submit(submission(3, &lecture_caption(1))).await.unwrap();
    assert!(matches!(again, Outcome::AwaitingReview(_)));
  }

  #[tokio::test]
  async fn rejecting_a_replace_leaves_the_record_alone() {
    let store = bound_store().await;
    let (svc, _) = service(store.clone());

    let first =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());
    svc
      .decide(ARCHIVE, REVIEWER, approve(first.request.id))
      .await
      .unwrap();
    let archived =
      store.get_material(first.material.id).await.unwrap().unwrap();

    svc.submit(submission(2, &lecture_caption(1))).await.unwrap();
    let replace = awaiting(
      svc
        .confirm_replace(CHAT, USER, MessageId(2), Utc::now())
        .await
        .unwrap(),
    );
    svc
      .decide(ARCHIVE, REVIEWER, reject(replace.request.id))
      .await
      .unwrap();

    let untouched =
      store.get_material(first.material.id).await.unwrap().unwrap();
    assert_eq!(untouched, archived);
  }

  #[tokio::test]
  async fn a_repeated_decision_is_no_longer_valid() {
    let store = bound_store().await;
    let (svc, _) = service(store.clone());

    let review =
      awaiting(svc.submit(submission(1, &lecture_caption(1))).await.unwrap());
    svc
      .decide(ARCHIVE, REVIEWER, approve(review.request.id))
      .await
      .unwrap();

    let outcome = svc
      .decide(ARCHIVE, REVIEWER, reject(review.request.id))
      .await
      .unwrap();
    assert!(matches!(outcome, Outcome::NoLongerValid));
    // The late reject neither flipped the status nor deleted the material.
    assert!(store.get_material(review.material.id).await.unwrap().is_some());
  }

  // ── Follow chains ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn follow_chains_link_consecutive_submissions() {
    let store = bound_store().await;
    let (svc, _) = service(store);
    let t0 = Utc::now();

    let outcome =
      svc.signal(CHAT, USER, FollowSignal::Open, t0).await.unwrap();
    let chain = match outcome {
      Outcome::ChainOpened { chain } => chain,
      other => panic!("expected ChainOpened, got {other:?}"),
    };

    let mut first = submission(1, &lecture_caption(1));
    first.now = t0 + Duration::seconds(5);
    let r1 = awaiting(svc.submit(first).await.unwrap());
    assert_eq!(r1.request.chain, Some(chain));
    assert_eq!(r1.request.parent, None);

    let mut second = submission(2, &lecture_caption(2));
    second.now = t0 + Duration::seconds(10);
    let r2 = awaiting(svc.submit(second).await.unwrap());
    assert_eq!(r2.request.chain, Some(chain));
    assert_eq!(r2.request.parent, Some(r1.request.id));
  }

  #[tokio::test]
  async fn an_expired_chain_leaves_the_next_submission_unlinked() {
    let store = bound_store().await;
    let (svc, _) = service(store);
    let t0 = Utc::now();

    svc.signal(CHAT, USER, FollowSignal::Open, t0).await.unwrap();

    let mut late = submission(1, &lecture_caption(1));
    late.now = t0 + Duration::seconds(601);
    let review = awaiting(svc.submit(late).await.unwrap());
    assert_eq!(review.request.chain, None);
    assert_eq!(review.request.parent, None);
  }

  #[tokio::test]
  async fn closing_the_chain_unlinks_followups() {
    let store = bound_store().await;
    let (svc, _) = service(store);
    let t0 = Utc::now();

    svc.signal(CHAT, USER, FollowSignal::Open, t0).await.unwrap();
    let outcome =
      svc.signal(CHAT, USER, FollowSignal::Close, t0).await.unwrap();
    assert!(matches!(outcome, Outcome::ChainClosed));

    let mut next = submission(1, &lecture_caption(1));
    next.now = t0 + Duration::seconds(5);
    let review = awaiting(svc.submit(next).await.unwrap());
    assert_eq!(review.request.chain, None);
  }

  // ── Attendance ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn attendance_is_recorded_against_the_group_term() {
    let store = bound_store().await;
    let term = store.register_term("الفصل الأول 1446").await.unwrap();
    store.register_group(CHAT, term).await.unwrap();
    let (svc, _) = service(store.clone());

    let outcome = svc.submit(submission(1, "#التحضير")).await.unwrap();
    assert!(matches!(outcome, Outcome::TermRecorded));

    let resources = store.term_resources(term).await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].0, ContentType::Attendance);
    assert!(svc.pending().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn attendance_in_an_unknown_chat_is_refused() {
    let store = bound_store().await;
    let (svc, _) = service(store);

    let outcome = svc.submit(submission(1, "#التحضير")).await.unwrap();
    assert_eq!(refused_code(outcome), "NO-CONTEXT");
  }

  // ── Housekeeping ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn purge_drops_old_pending_requests() {
    let store = bound_store().await;
    let (svc, _) = service(store.clone());

    svc.submit(submission(1, &lecture_caption(1))).await.unwrap();
    assert_eq!(svc.pending().await.unwrap().len(), 1);

    // Nothing is old enough yet.
    assert_eq!(svc.purge_stale(Utc::now()).await.unwrap(), 0);

    // A day later everything pending is stale.
    let purged =
      svc.purge_stale(Utc::now() + Duration::hours(25)).await.unwrap();
    assert_eq!(purged, 1);
    assert!(svc.pending().await.unwrap().is_empty());
  }
}
