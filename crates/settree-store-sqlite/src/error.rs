//! Error type for `settree-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("document not found: {collection}/{id}")]
  DocumentNotFound {
    collection: &'static str,
    id:         uuid::Uuid,
  },

  /// Field names are spliced into JSON paths, so only `[A-Za-z0-9_]` is
  /// accepted.
  #[error("invalid field name: {0:?}")]
  InvalidField(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
