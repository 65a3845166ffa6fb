//! Path and sibling-order derivation for new nodes.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use serde_json::Value;
use settree_core::{
  path::child_path,
  store::{Collection, DocumentStore, Filter},
};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine};

/// One async lock per sibling group, keyed by `parent_id`.
///
/// Held from the sibling max-scan until the new node is written, so two
/// creations through the same engine cannot pick the same `order`. Writers
/// in other processes are not covered.
#[derive(Default)]
pub(crate) struct OrderLocks {
  groups: Mutex<HashMap<Option<Uuid>, Arc<tokio::sync::Mutex<()>>>>,
}

impl OrderLocks {
  pub(crate) async fn lock(&self, parent_id: Option<Uuid>) -> OwnedMutexGuard<()> {
    let group = {
      let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
      // Groups only the map still references have no holder and no waiter.
      groups.retain(|key, group| *key == parent_id || Arc::strong_count(group) > 1);
      Arc::clone(groups.entry(parent_id).or_default())
    };
    group.lock_owned().await
  }

  #[cfg(test)]
  fn tracked(&self) -> usize {
    self.groups.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

/// The equality filter selecting the children of `parent_id`.
pub(crate) fn parent_filter(parent_id: Option<Uuid>) -> Filter {
  match parent_id {
    Some(id) => Filter::eq("parentId", id.to_string()),
    None => Filter::eq("parentId", Value::Null),
  }
}

impl<S: DocumentStore> SettingsEngine<S> {
  /// The materialised path for a node called `name` under `parent_id`.
  /// An unresolvable parent yields a root-level path.
  pub async fn derive_path(&self, parent_id: Option<Uuid>, name: &str) -> Result<String> {
    let parent = match parent_id {
      Some(id) => self.get(id).await?,
      None => None,
    };
    Ok(child_path(parent.as_ref().map(|p| p.path.as_str()), name))
  }

  /// One past the highest `order` among the children of `parent_id`, or 0.
  ///
  /// Scans the full sibling set rather than asking the store for a maximum,
  /// so backends need no aggregate queries or composite indexes.
  pub async fn next_order(&self, parent_id: Option<Uuid>) -> Result<i64> {
    let filters = [parent_filter(parent_id)];
    let siblings = self
      .store
      .query(Collection::Settings, &filters)
      .await
      .map_err(Error::store)?;

    let max = siblings
      .iter()
      .filter_map(|r| r.data.get("order").and_then(Value::as_i64))
      .max();
    Ok(max.map_or(0, |m| m + 1))
  }

  /// For a node moving from `from` to `to`: lock `to`'s sibling group and
  /// pick the order the node takes there. Keep the guard until the move is
  /// written. `None` when the parent does not change.
  pub(crate) async fn reserve_move_order(
    &self,
    from: Option<Uuid>,
    to: Option<Uuid>,
  ) -> Result<Option<(i64, OwnedMutexGuard<()>)>> {
    if from == to {
      return Ok(None);
    }
    let guard = self.order_locks.lock(to).await;
    let order = self.next_order(to).await?;
    Ok(Some((order, guard)))
  }
}
