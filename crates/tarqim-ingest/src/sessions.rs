//! Follow-chain and replace-confirmation session state.
//!
//! Everything here is in-memory, owned by one `(chat, user)` or
//! `(chat, message)` pair, and TTL-bounded. Losing an entry degrades to
//! "start a new chain" or "treat as a new submission", never to corruption,
//! so none of it survives a restart. Expiry is checked on every access;
//! nothing runs on a timer.

use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Duration, Utc};
use tarqim_core::ids::{ChatId, IngestionId, MaterialId, MessageId, UserId};
use tarqim_core::material::SourceRef;
use uuid::Uuid;

// ─── Control signals ─────────────────────────────────────────────────────────

/// A follow-chain control command typed by a submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowSignal {
  Open,
  Close,
}

impl FollowSignal {
  /// Recognise `//follow`, `//end` and `//cancel`. Anything else is not a
  /// signal and should be handled as ordinary chat traffic.
  pub fn parse(text: &str) -> Option<Self> {
    let word = text.trim();
    if word.eq_ignore_ascii_case("//follow") {
      Some(Self::Open)
    } else if word.eq_ignore_ascii_case("//end")
      || word.eq_ignore_ascii_case("//cancel")
    {
      Some(Self::Close)
    } else {
      None
    }
  }
}

// ─── Session state ───────────────────────────────────────────────────────────

struct FollowChain {
  chain:   Uuid,
  last:    Option<IngestionId>,
  expires: DateTime<Utc>,
}

/// A duplicate hit waiting for the submitter's replace-or-cancel answer,
/// keyed by the originating message.
#[derive(Debug, Clone)]
pub(crate) struct ReplacePrompt {
  pub existing: MaterialId,
  pub origin:   SourceRef,
}

struct PendingConfirm {
  prompt:  ReplacePrompt,
  expires: DateTime<Utc>,
}

/// All per-conversation ephemeral state, guarded by plain mutexes. Locks are
/// held only for map operations; nothing awaits under them.
pub(crate) struct SessionBook {
  follow_ttl:  Duration,
  confirm_ttl: Duration,
  follows:     Mutex<HashMap<(ChatId, UserId), FollowChain>>,
  confirms:    Mutex<HashMap<(ChatId, MessageId), PendingConfirm>>,
  recent:      Mutex<HashMap<(ChatId, UserId), IngestionId>>,
}

impl SessionBook {
  pub fn new(follow_ttl: Duration, confirm_ttl: Duration) -> Self {
    Self {
      follow_ttl,
      confirm_ttl,
      follows: Mutex::new(HashMap::new()),
      confirms: Mutex::new(HashMap::new()),
      recent: Mutex::new(HashMap::new()),
    }
  }

  /// Mint a chain for `(chat, user)`, anchored at their most recent
  /// ingestion when one is remembered. Replaces any chain already open.
  pub fn open_follow(
    &self,
    chat: ChatId,
    user: UserId,
    now: DateTime<Utc>,
  ) -> Uuid {
    let anchor = self.recent.lock().unwrap().get(&(chat, user)).copied();
    let chain = Uuid::new_v4();
    let mut follows = self.follows.lock().unwrap();
    follows.retain(|_, s| s.expires > now);
    follows.insert((chat, user), FollowChain {
      chain,
      last: anchor,
      expires: now + self.follow_ttl,
    });
    chain
  }

  /// Drop the open chain, if any. Returns whether one was open.
  pub fn close_follow(&self, chat: ChatId, user: UserId) -> bool {
    self.follows.lock().unwrap().remove(&(chat, user)).is_some()
  }

  /// Chain linkage for a submission happening `now`: the chain id and the
  /// previous ingestion in the chain. A live chain has its window extended;
  /// an expired one is dropped and the submission stays unlinked.
  pub fn stamp(
    &self,
    chat: ChatId,
    user: UserId,
    now: DateTime<Utc>,
  ) -> (Option<Uuid>, Option<IngestionId>) {
    let mut follows = self.follows.lock().unwrap();
    match follows.get_mut(&(chat, user)) {
      Some(session) if session.expires > now => {
        session.expires = now + self.follow_ttl;
        (Some(session.chain), session.last)
      }
      Some(_) => {
        follows.remove(&(chat, user));
        (None, None)
      }
      None => (None, None),
    }
  }

  /// Note a freshly opened ingestion as the owner's most recent one, and as
  /// the tail of their live chain.
  pub fn record_ingestion(
    &self,
    chat: ChatId,
    user: UserId,
    id: IngestionId,
    now: DateTime<Utc>,
  ) {
    if let Some(session) = self.follows.lock().unwrap().get_mut(&(chat, user))
      && session.expires > now
    {
      session.last = Some(id);
    }
    self.recent.lock().unwrap().insert((chat, user), id);
  }

  /// Park a replace-or-cancel prompt for the submission at `message`.
  pub fn remember_confirm(
    &self,
    chat: ChatId,
    message: MessageId,
    prompt: ReplacePrompt,
    now: DateTime<Utc>,
  ) {
    let mut confirms = self.confirms.lock().unwrap();
    confirms.retain(|_, c| c.expires > now);
    confirms.insert((chat, message), PendingConfirm {
      prompt,
      expires: now + self.confirm_ttl,
    });
  }

  /// Take the parked prompt for `message`, single-shot. `None` when there
  /// is none or its window elapsed.
  pub fn take_confirm(
    &self,
    chat: ChatId,
    message: MessageId,
    now: DateTime<Utc>,
  ) -> Option<ReplacePrompt> {
    let entry = self.confirms.lock().unwrap().remove(&(chat, message))?;
    (entry.expires > now).then_some(entry.prompt)
  }
}
