//! Whole-subtree operations: cascading delete, duplication, and loading a
//! nested view.
//!
//! All three walk the tree with an explicit work stack, so depth is bounded
//! by memory rather than the call stack. Visiting order matches the plain
//! recursive formulation: post-order for delete, pre-order otherwise.

use std::collections::HashSet;

use serde::Serialize;
use settree_core::{
  actor::Actor,
  history::HistoryAction,
  setting::{NewSetting, SettingNode},
  store::{Collection, DocumentStore},
};
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine};

/// A node together with its ordered descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingTree {
  pub node:     SettingNode,
  pub children: Vec<SettingTree>,
}

impl SettingTree {
  /// Number of nodes in this subtree, including the root.
  pub fn node_count(&self) -> usize {
    let mut count = 0;
    let mut stack = vec![self];
    while let Some(tree) = stack.pop() {
      count += 1;
      stack.extend(tree.children.iter());
    }
    count
  }
}

enum Visit {
  Enter(Uuid),
  Leave(SettingNode),
}

/// Creation input copying `source`'s content under a new parent.
fn copy_of(source: &SettingNode, parent_id: Option<Uuid>, name: String) -> NewSetting {
  NewSetting {
    name,
    description: Some(source.description.clone()),
    kind: source.kind,
    parent_id,
    inherited_from: source.inherited_from,
    hidden: None,
    favorite: None,
    assigned_targets: None,
  }
}

impl<S: DocumentStore> SettingsEngine<S> {
  /// Delete `id` and every descendant, children before parents. Each node
  /// gets its own `delete` history entry, written just before it is
  /// removed. Returns the number of nodes deleted; a missing `id` deletes
  /// nothing.
  pub async fn delete_subtree(&self, id: Uuid, actor: &Actor) -> Result<usize> {
    let mut stack = vec![Visit::Enter(id)];
    let mut seen = HashSet::new();
    let mut deleted = 0;

    while let Some(visit) = stack.pop() {
      match visit {
        Visit::Enter(id) => {
          if !seen.insert(id) {
            continue;
          }
          let Some(node) = self.get(id).await? else {
            continue;
          };
          let children = self.list_by_parent(Some(id)).await?;
          stack.push(Visit::Leave(node));
          stack.extend(children.into_iter().rev().map(|c| Visit::Enter(c.id)));
        }
        Visit::Leave(node) => {
          self
            .record(node.id, &node.path, HistoryAction::Delete, Some(node.snapshot()), None, actor)
            .await;
          self
            .store
            .delete(Collection::Settings, node.id)
            .await
            .map_err(Error::store)?;
          deleted += 1;
        }
      }
    }

    tracing::info!(setting_id = %id, deleted, "subtree deleted");
    Ok(deleted)
  }

  /// Copy `id` next to itself as a brand-new node named with the configured
  /// suffix. With `deep`, every descendant is copied too, keeping names and
  /// sibling order. Ids, paths and orders are always freshly assigned.
  pub async fn duplicate(&self, id: Uuid, actor: &Actor, deep: bool) -> Result<SettingNode> {
    let source = self.get(id).await?.ok_or(Error::SettingNotFound(id))?;

    let name = format!("{}{}", source.name, self.config.duplicate_suffix);
    let top = self.create(copy_of(&source, source.parent_id, name), actor).await?;

    let mut copied = 1;
    if deep {
      // (source node, id of the copy its own copy goes under)
      let mut stack: Vec<(SettingNode, Uuid)> = Vec::new();
      let mut seen = HashSet::from([source.id]);
      let children = self.list_by_parent(Some(source.id)).await?;
      stack.extend(children.into_iter().rev().map(|c| (c, top.id)));

      while let Some((child, new_parent)) = stack.pop() {
        if !seen.insert(child.id) {
          continue;
        }
        let copy = self
          .create(copy_of(&child, Some(new_parent), child.name.clone()), actor)
          .await?;
        copied += 1;
        let grandchildren = self.list_by_parent(Some(child.id)).await?;
        stack.extend(grandchildren.into_iter().rev().map(|g| (g, copy.id)));
      }
    }

    tracing::info!(source_id = %id, copy_id = %top.id, deep, copied, "setting duplicated");
    Ok(top)
  }

  /// The ordered forest under `parent_id` (the whole tree for `None`).
  pub async fn load_tree(&self, parent_id: Option<Uuid>) -> Result<Vec<SettingTree>> {
    // Pre-order list of (node, index of its parent in `flat`).
    let mut flat: Vec<(SettingNode, Option<usize>)> = Vec::new();
    let mut seen = HashSet::new();
    let roots = self.list_by_parent(parent_id).await?;
    let mut stack: Vec<(SettingNode, Option<usize>)> =
      roots.into_iter().rev().map(|n| (n, None)).collect();

    while let Some((node, parent)) = stack.pop() {
      if !seen.insert(node.id) {
        continue;
      }
      let index = flat.len();
      let children = self.list_by_parent(Some(node.id)).await?;
      stack.extend(children.into_iter().rev().map(|c| (c, Some(index))));
      flat.push((node, parent));
    }

    // Children always come after their parent, so folding from the back
    // completes every subtree before its parent is built.
    let mut children_of: Vec<Vec<SettingTree>> = (0..flat.len()).map(|_| Vec::new()).collect();
    let mut forest = Vec::new();
    for (index, (node, parent)) in flat.into_iter().enumerate().rev() {
      let mut children = std::mem::take(&mut children_of[index]);
      children.reverse();
      let tree = SettingTree { node, children };
      match parent {
        Some(p) => children_of[p].push(tree),
        None => forest.push(tree),
      }
    }
    forest.reverse();
    Ok(forest)
  }
}
