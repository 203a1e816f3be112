//! Transport and authorization seams.
//!
//! The pipeline never talks to a chat platform directly. Archiving a file is
//! copying its message into the archive channel through [`MessageVault`];
//! acting users are resolved to admin identities through [`AccessPolicy`].
//! Rendering prompts and menus stays with the embedder.

use std::future::Future;

use tarqim_core::ids::{AdminId, ChatId, FileUid, UserId};
use tarqim_core::material::{SourceRef, StorageRef};

/// What landed in the archive channel after a copy: the new message
/// coordinates and, when the transport reports one, the file fingerprint of
/// the copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedCopy {
  pub storage:  StorageRef,
  pub file_uid: Option<FileUid>,
}

/// Chat-transport operations the pipeline depends on.
pub trait MessageVault: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Copy the message at `source` into the `archive` chat.
  fn copy_to_archive(
    &self,
    source: SourceRef,
    archive: ChatId,
  ) -> impl Future<Output = Result<ArchivedCopy, Self::Error>> + Send + '_;

  /// Delete a previously archived message.
  fn discard(
    &self,
    stored: StorageRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Capability lookup for acting users.
pub trait AccessPolicy: Send + Sync {
  /// The admin identity `user` acts under in `chat`, or `None` when the
  /// user holds no capability there.
  fn admin_for(
    &self,
    chat: ChatId,
    user: UserId,
  ) -> impl Future<Output = Option<AdminId>> + Send + '_;
}

// ─── Test doubles ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
  use std::sync::{Arc, Mutex};

  use tarqim_core::ids::MessageId;
  use thiserror::Error;

  use super::*;

  #[derive(Debug, Error)]
  #[error("vault unavailable")]
  pub struct VaultDown;

  /// Records transport calls and mints archive coordinates.
  #[derive(Clone, Default)]
  pub struct MockVault {
    inner: Arc<Mutex<Log>>,
  }

  #[derive(Default)]
  struct Log {
    copied:        Vec<(SourceRef, ChatId)>,
    discarded:     Vec<StorageRef>,
    next:          i64,
    fail_discards: bool,
  }

  impl MockVault {
    pub fn fail_discards(&self) {
      self.inner.lock().unwrap().fail_discards = true;
    }

    pub fn copied(&self) -> Vec<(SourceRef, ChatId)> {
      self.inner.lock().unwrap().copied.clone()
    }

    pub fn discarded(&self) -> Vec<StorageRef> {
      self.inner.lock().unwrap().discarded.clone()
    }
  }

  impl MessageVault for MockVault {
    type Error = VaultDown;

    async fn copy_to_archive(
      &self,
      source: SourceRef,
      archive: ChatId,
    ) -> Result<ArchivedCopy, VaultDown> {
      let mut log = self.inner.lock().unwrap();
      log.next += 1;
      log.copied.push((source, archive));
      Ok(ArchivedCopy {
        storage:  StorageRef { chat: archive, message: MessageId(log.next) },
        file_uid: Some(FileUid(format!("vault-{}", log.next))),
      })
    }

    async fn discard(&self, stored: StorageRef) -> Result<(), VaultDown> {
      let mut log = self.inner.lock().unwrap();
      if log.fail_discards {
        return Err(VaultDown);
      }
      log.discarded.push(stored);
      Ok(())
    }
  }

  /// Grants every user an admin identity equal to their user id.
  #[derive(Clone, Copy, Default)]
  pub struct AllowAll;

  impl AccessPolicy for AllowAll {
    async fn admin_for(&self, _chat: ChatId, user: UserId) -> Option<AdminId> {
      Some(AdminId(user.0))
    }
  }

  /// Grants nobody anything.
  #[derive(Clone, Copy, Default)]
  pub struct DenyAll;

  impl AccessPolicy for DenyAll {
    async fn admin_for(&self, _chat: ChatId, _user: UserId) -> Option<AdminId> {
      None
    }
  }
}
