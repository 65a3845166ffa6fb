//! Restoring a node to the state captured by one of its history entries.

use chrono::Utc;
use serde_json::{Value, json};
use settree_core::{
  actor::Actor,
  history::HistoryAction,
  store::{Collection, DocumentStore},
};
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine, nodes::merge_snapshot};

impl<S: DocumentStore> SettingsEngine<S> {
  /// Overwrite `setting_id` with the `before` snapshot of `history_id` and
  /// record a `revert` entry from the replaced state to the restored one.
  ///
  /// Entries without a `before` (e.g. `create`) cannot be reverted. Partial
  /// snapshots, such as the `{order}` of a `move`, restore only the fields
  /// they hold. A snapshot under a different parent takes the next order
  /// there, and a recorded order another sibling now holds is not restored.
  /// Reverting twice to the same entry yields the same state.
  pub async fn revert(&self, setting_id: Uuid, history_id: Uuid, actor: &Actor) -> Result<()> {
    let entry = self
      .history_entry(history_id)
      .await?
      .ok_or(Error::HistoryNotFound(history_id))?;

    if entry.setting_id != setting_id {
      return Err(Error::HistoryMismatch {
        history_id,
        owner: entry.setting_id,
        requested: setting_id,
      });
    }

    let Some(Value::Object(mut restored)) = entry.before else {
      return Err(Error::NothingToRevert(history_id));
    };

    let current = self
      .get(setting_id)
      .await?
      .ok_or(Error::SettingNotFound(setting_id))?;

    restored.remove("id");

    // A full snapshot names a parent. Under a different parent the node goes
    // to the end of that group; under the same one it keeps its recorded
    // order only if no sibling has taken it since.
    let restored_parent = match restored.get("parentId") {
      None => None,
      Some(Value::Null) => Some(None),
      Some(Value::String(s)) => s.parse::<Uuid>().ok().map(Some),
      Some(_) => None,
    };
    let slot_guard = match restored_parent {
      Some(to) => {
        let guard = self.order_locks.lock(to).await;
        let slot = if to != current.parent_id {
          Some(self.next_order(to).await?)
        } else {
          let siblings = self.list_by_parent(to).await?;
          let recorded = restored.get("order").and_then(Value::as_i64);
          match recorded {
            Some(order) if !siblings.iter().any(|n| n.id != setting_id && n.order == order) => None,
            _ => Some(current.order),
          }
        };
        if let Some(order) = slot {
          restored.insert("order".into(), json!(order));
        }
        Some(guard)
      }
      None => None,
    };

    restored.insert("updatedAt".into(), json!(Utc::now()));
    restored.insert("updatedBy".into(), json!(actor.id));

    self
      .store
      .update(Collection::Settings, setting_id, restored.clone())
      .await
      .map_err(Error::store)?;
    drop(slot_guard);

    tracing::info!(%setting_id, %history_id, "setting reverted");

    let before = current.snapshot();
    let after = merge_snapshot(&before, restored);
    self
      .record(setting_id, &current.path, HistoryAction::Revert, Some(before), Some(after), actor)
      .await;
    Ok(())
  }
}
