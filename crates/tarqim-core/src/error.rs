//! Error types for `tarqim-core`.

use thiserror::Error;

use crate::ids::{IngestionId, MaterialId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("material not found: {0}")]
  MaterialNotFound(MaterialId),

  #[error("ingestion not found: {0}")]
  IngestionNotFound(IngestionId),

  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant {
    kind:  &'static str,
    value: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
