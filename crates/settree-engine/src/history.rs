//! The audit trail: best-effort recording and read-back of history entries.

use chrono::Utc;
use serde_json::Value;
use settree_core::{
  actor::Actor,
  history::{HistoryAction, HistoryEntry},
  store::{Collection, DocumentStore, Filter},
};
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine};

impl<S: DocumentStore> SettingsEngine<S> {
  /// Append a history entry for a mutation that has already committed.
  ///
  /// Never fails: a write error is logged and dropped, because the
  /// mutation it documents cannot be undone by an audit failure.
  pub(crate) async fn record(
    &self,
    setting_id: Uuid,
    setting_path: &str,
    action: HistoryAction,
    before: Option<Value>,
    after: Option<Value>,
    actor: &Actor,
  ) {
    let entry = HistoryEntry {
      id: Uuid::nil(),
      setting_id,
      setting_path: setting_path.to_owned(),
      action,
      before,
      after,
      modified_by: actor.id.clone(),
      modified_by_name: actor.name.clone(),
      timestamp: Utc::now(),
    };

    let written = match entry.to_document() {
      Ok(doc) => self
        .store
        .add(Collection::History, doc)
        .await
        .map_err(Error::store),
      Err(e) => Err(e.into()),
    };

    match written {
      Ok(history_id) => {
        tracing::debug!(%setting_id, %history_id, ?action, "history recorded");
      }
      Err(e) => {
        tracing::warn!(
          %setting_id,
          ?action,
          error = %e,
          "failed to record setting history"
        );
      }
    }
  }

  /// Every history entry for `setting_id`, newest first. Entries outlive
  /// the setting they describe.
  pub async fn history(&self, setting_id: Uuid) -> Result<Vec<HistoryEntry>> {
    let filters = [Filter::eq("settingId", setting_id.to_string())];
    let records = self
      .store
      .query(Collection::History, &filters)
      .await
      .map_err(Error::store)?;

    let mut entries = records
      .into_iter()
      .map(HistoryEntry::from_record)
      .collect::<settree_core::Result<Vec<_>>>()?;
    // Store order is insertion order; reversing first lets later writes win
    // timestamp ties under the stable sort.
    entries.reverse();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(entries)
  }

  pub async fn history_entry(&self, id: Uuid) -> Result<Option<HistoryEntry>> {
    let record = self
      .store
      .get_by_id(Collection::History, id)
      .await
      .map_err(Error::store)?;
    Ok(record.map(HistoryEntry::from_record).transpose()?)
  }
}
