//! History entries: the append-only audit trail of setting mutations.
//!
//! Entries are never updated or deleted, not even when their subject node is
//! deleted. `before`/`after` are opaque node snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Result,
  store::{Document, Record, encode_document},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
  Create,
  Update,
  Delete,
  Move,
  Revert,
}

/// A persisted audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  pub id:               Uuid,
  pub setting_id:       Uuid,
  /// The node's path at the time of the action.
  pub setting_path:     String,
  pub action:           HistoryAction,
  pub before:           Option<Value>,
  pub after:            Option<Value>,
  pub modified_by:      String,
  pub modified_by_name: String,
  pub timestamp:        DateTime<Utc>,
}

impl HistoryEntry {
  pub fn from_record(record: Record) -> Result<Self> { record.decode() }

  pub fn to_document(&self) -> Result<Document> { encode_document(self) }
}
