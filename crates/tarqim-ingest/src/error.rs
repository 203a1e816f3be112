//! Service error type.
//!
//! User-facing validation failures are values (`Outcome::Refused`), never
//! errors. `Error` covers infrastructure only: the store, the chat
//! transport, and policy construction. Persisted state is unchanged whenever
//! one of these surfaces.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("vault error: {0}")]
  Vault(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("invalid sensitivity pattern: {0}")]
  Pattern(#[from] regex::Error),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub(crate) fn vault<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Vault(Box::new(err))
  }
}
