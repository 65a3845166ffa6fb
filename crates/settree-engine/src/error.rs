//! Error type for `settree-engine`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Setting not found: {0}")]
  SettingNotFound(Uuid),

  #[error("History entry not found: {0}")]
  HistoryNotFound(Uuid),

  #[error("No previous version to revert to (history entry {0})")]
  NothingToRevert(Uuid),

  #[error("history entry {history_id} belongs to setting {owner}, not {requested}")]
  HistoryMismatch {
    history_id: Uuid,
    owner:      Uuid,
    requested:  Uuid,
  },

  #[error("inheritance cycle through setting {0}")]
  InheritanceCycle(Uuid),

  #[error("inheritance chain from {start} is longer than {limit} links")]
  InheritanceTooDeep { start: Uuid, limit: usize },

  #[error("core error: {0}")]
  Core(#[from] settree_core::Error),

  /// A backend failure, passed through untouched.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
