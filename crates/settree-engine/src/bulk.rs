//! Batched writes: flat bulk creation and sibling reordering.
//!
//! The nodes of a batch commit atomically; their history entries are
//! written afterwards, one by one, with the same best-effort guarantee as
//! every other audit write. A crash in between leaves committed nodes
//! without history.

use chrono::Utc;
use serde_json::json;
use settree_core::{
  actor::Actor,
  history::HistoryAction,
  path::child_path,
  setting::{OrderUpdate, SettingKind, SettingNode},
  store::{BatchOp, Collection, Document, DocumentStore},
};
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine, nodes::mirrored_value};

impl<S: DocumentStore> SettingsEngine<S> {
  /// Create one variable per non-blank name under `parent_id` in a single
  /// atomic batch, with consecutive orders after the existing siblings.
  pub async fn bulk_create<I, N>(
    &self,
    names: I,
    parent_id: Option<Uuid>,
    description: &str,
    actor: &Actor,
  ) -> Result<Vec<SettingNode>>
  where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
  {
    let names: Vec<String> = names
      .into_iter()
      .map(|n| n.as_ref().trim().to_owned())
      .filter(|n| !n.is_empty())
      .collect();
    if names.is_empty() {
      return Ok(Vec::new());
    }

    let parent_path = match parent_id {
      Some(id) => self.get(id).await?.map(|p| p.path),
      None => None,
    };

    let guard = self.order_locks.lock(parent_id).await;
    let start = self.next_order(parent_id).await?;

    let now = Utc::now();
    let mut nodes = Vec::with_capacity(names.len());
    let mut ops = Vec::with_capacity(names.len());
    for (order, name) in (start..).zip(names) {
      let (value_type, value) = mirrored_value(SettingKind::Variable, &name);
      let node = SettingNode {
        id: self.store.allocate_id(Collection::Settings),
        path: child_path(parent_path.as_deref(), &name),
        name,
        description: description.to_owned(),
        kind: SettingKind::Variable,
        parent_id,
        order,
        hidden: false,
        favorite: false,
        assigned_targets: Vec::new(),
        value_type,
        value,
        inherited_from: None,
        created_at: now,
        created_by: actor.id.clone(),
        updated_at: now,
        updated_by: actor.id.clone(),
      };
      ops.push(BatchOp::Set {
        collection: Collection::Settings,
        id:         node.id,
        data:       node.to_document()?,
      });
      nodes.push(node);
    }

    self.store.batch_write(ops).await.map_err(Error::store)?;
    drop(guard);
    tracing::info!(parent_id = ?parent_id, created = nodes.len(), "bulk create committed");

    for node in &nodes {
      self
        .record(node.id, &node.path, HistoryAction::Create, None, Some(node.snapshot()), actor)
        .await;
    }
    Ok(nodes)
  }

  /// Assign new sibling orders atomically, then record one `move` entry per
  /// node holding only the old and new `order`.
  pub async fn reorder(&self, updates: &[OrderUpdate], actor: &Actor) -> Result<()> {
    let mut previous = Vec::with_capacity(updates.len());
    for update in updates {
      previous.push(self.get(update.id).await?);
    }

    let now = json!(Utc::now());
    let ops = updates
      .iter()
      .map(|update| {
        let mut data = Document::new();
        data.insert("order".into(), json!(update.order));
        data.insert("updatedAt".into(), now.clone());
        data.insert("updatedBy".into(), json!(actor.id));
        BatchOp::Update {
          collection: Collection::Settings,
          id: update.id,
          data,
        }
      })
      .collect();

    self.store.batch_write(ops).await.map_err(Error::store)?;
    tracing::info!(moved = updates.len(), "settings reordered");

    for (update, node) in updates.iter().zip(previous) {
      let Some(node) = node else { continue };
      self
        .record(
          node.id,
          &node.path,
          HistoryAction::Move,
          Some(json!({ "order": node.order })),
          Some(json!({ "order": update.order })),
          actor,
        )
        .await;
    }
    Ok(())
  }
}
