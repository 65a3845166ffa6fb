//! Single-node operations: create, read, list, update, remove.

use chrono::Utc;
use serde_json::{Value, json};
use settree_core::{
  actor::Actor,
  history::HistoryAction,
  setting::{NewSetting, SettingKind, SettingNode, SettingPatch, ValueType},
  store::{Collection, Document, DocumentStore, Filter, Record},
};
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine, derive::parent_filter};

pub(crate) fn decode_nodes(records: Vec<Record>) -> Result<Vec<SettingNode>> {
  Ok(
    records
      .into_iter()
      .map(SettingNode::from_record)
      .collect::<settree_core::Result<Vec<_>>>()?,
  )
}

/// The `valueType`/`value` pair a node of `kind` called `name` must carry.
pub(crate) fn mirrored_value(kind: SettingKind, name: &str) -> (Option<ValueType>, Option<String>) {
  match kind {
    SettingKind::Variable => (Some(ValueType::String), Some(name.to_owned())),
    SettingKind::Category => (None, None),
  }
}

impl<S: DocumentStore> SettingsEngine<S> {
  /// Create a node, assigning its path and next sibling order, then record
  /// a `create` history entry.
  pub async fn create(&self, input: NewSetting, actor: &Actor) -> Result<SettingNode> {
    let path = self.derive_path(input.parent_id, &input.name).await?;

    let guard = self.order_locks.lock(input.parent_id).await;
    let order = self.next_order(input.parent_id).await?;

    let now = Utc::now();
    let (value_type, value) = mirrored_value(input.kind, &input.name);
    let mut node = SettingNode {
      id: Uuid::nil(),
      path,
      name: input.name,
      description: input.description.unwrap_or_default(),
      kind: input.kind,
      parent_id: input.parent_id,
      order,
      hidden: input.hidden.unwrap_or(false),
      favorite: input.favorite.unwrap_or(false),
      assigned_targets: input.assigned_targets.unwrap_or_default(),
      value_type,
      value,
      inherited_from: input.inherited_from,
      created_at: now,
      created_by: actor.id.clone(),
      updated_at: now,
      updated_by: actor.id.clone(),
    };

    node.id = self
      .store
      .add(Collection::Settings, node.to_document()?)
      .await
      .map_err(Error::store)?;
    drop(guard);

    tracing::debug!(setting_id = %node.id, path = %node.path, order, "setting created");
    self
      .record(node.id, &node.path, HistoryAction::Create, None, Some(node.snapshot()), actor)
      .await;
    Ok(node)
  }

  /// Retrieve a node by id. Returns `None` if not found.
  pub async fn get(&self, id: Uuid) -> Result<Option<SettingNode>> {
    let record = self
      .store
      .get_by_id(Collection::Settings, id)
      .await
      .map_err(Error::store)?;
    Ok(record.map(SettingNode::from_record).transpose()?)
  }

  /// The children of `parent_id` (roots for `None`), ascending by `order`.
  pub async fn list_by_parent(&self, parent_id: Option<Uuid>) -> Result<Vec<SettingNode>> {
    let filters = [parent_filter(parent_id)];
    let records = self
      .store
      .query(Collection::Settings, &filters)
      .await
      .map_err(Error::store)?;

    let mut nodes = decode_nodes(records)?;
    nodes.sort_by_key(|n| n.order);
    Ok(nodes)
  }

  /// Nodes whose `assignedTargets` include `target`, in no particular order.
  pub async fn list_by_target(&self, target: &str) -> Result<Vec<SettingNode>> {
    let filters = [Filter::contains("assignedTargets", target)];
    let records = self
      .store
      .query(Collection::Settings, &filters)
      .await
      .map_err(Error::store)?;
    decode_nodes(records)
  }

  /// Apply the fields present in `patch` and record an `update` entry.
  ///
  /// A node that is (or becomes) a variable keeps `value == name`: a rename
  /// rewrites the value and an explicit value is replaced by the name.
  /// Turning a node into a category clears both value fields. A new
  /// `parentId` also assigns the next order under that parent. Updating a
  /// missing node surfaces the store's own failure.
  pub async fn update(&self, id: Uuid, patch: SettingPatch, actor: &Actor) -> Result<()> {
    let existing = self.get(id).await?;
    let mut changes = patch.to_document();

    let kind = patch.kind.or(existing.as_ref().map(|n| n.kind));
    let kind_changed = patch.kind.is_some_and(|k| existing.as_ref().is_none_or(|n| n.kind != k));
    let touches_value = patch.name.is_some() || patch.value.is_some() || kind_changed;

    if let Some(kind) = kind
      && touches_value
    {
      let name = patch.name.as_deref().or(existing.as_ref().map(|n| n.name.as_str()));
      match name {
        Some(name) => {
          let (value_type, value) = mirrored_value(kind, name);
          changes.insert("valueType".into(), json!(value_type));
          changes.insert("value".into(), json!(value));
        }
        None => {
          changes.remove("value");
        }
      }
    }

    // A node changing parent goes to the end of its new sibling group.
    let move_guard = match (patch.parent_id, existing.as_ref()) {
      (Some(to), Some(node)) => self.reserve_move_order(node.parent_id, to).await?,
      _ => None,
    };
    let move_guard = move_guard.map(|(order, guard)| {
      changes.insert("order".into(), json!(order));
      guard
    });

    changes.insert("updatedAt".into(), json!(Utc::now()));
    changes.insert("updatedBy".into(), json!(actor.id));

    self
      .store
      .update(Collection::Settings, id, changes.clone())
      .await
      .map_err(Error::store)?;
    drop(move_guard);

    tracing::debug!(setting_id = %id, fields = changes.len(), "setting updated");

    if let Some(node) = existing {
      let before = node.snapshot();
      let after = merge_snapshot(&before, changes);
      self
        .record(id, &node.path, HistoryAction::Update, Some(before), Some(after), actor)
        .await;
    }
    Ok(())
  }

  /// Remove a node and its whole subtree. Missing nodes are a no-op.
  pub async fn remove(&self, id: Uuid, actor: &Actor) -> Result<usize> {
    self.delete_subtree(id, actor).await
  }
}

/// `snapshot` with `changes` laid over its top-level fields.
pub(crate) fn merge_snapshot(snapshot: &Value, changes: Document) -> Value {
  let mut merged = snapshot.clone();
  if let Value::Object(fields) = &mut merged {
    fields.extend(changes);
  }
  merged
}
