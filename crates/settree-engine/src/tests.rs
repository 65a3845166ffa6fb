//! Engine tests against an in-memory SQLite store.

use std::{collections::HashSet, sync::Arc, time::Duration};

use settree_core::{
  actor::Actor,
  history::{HistoryAction, HistoryEntry},
  setting::{NewSetting, OrderUpdate, SettingKind, SettingNode, SettingPatch, ValueType},
  store::{BatchOp, Collection, Document, DocumentStore, Filter, Record, Subscription},
};
use settree_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{EngineConfig, Error, SettingsEngine, SettingTree};

async fn engine() -> SettingsEngine<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  SettingsEngine::new(Arc::new(store))
}

fn actor() -> Actor { Actor::new("u-1", "Dana Morel") }

async fn category(
  e: &SettingsEngine<SqliteStore>,
  name: &str,
  parent: Option<Uuid>,
) -> SettingNode {
  e.create(NewSetting::category(name).under(parent), &actor())
    .await
    .unwrap()
}

async fn variable(
  e: &SettingsEngine<SqliteStore>,
  name: &str,
  parent: Option<Uuid>,
) -> SettingNode {
  e.create(NewSetting::variable(name).under(parent), &actor())
    .await
    .unwrap()
}

fn names(nodes: &[SettingNode]) -> Vec<&str> {
  nodes.iter().map(|n| n.name.as_str()).collect()
}

// ─── Paths and orders ────────────────────────────────────────────────────────

#[tokio::test]
async fn paths_are_materialised_from_parent() {
  let e = engine().await;
  let root = category(&e, "Foo Bar", None).await;
  assert_eq!(root.path, "foo-bar");

  let child = variable(&e, "Baz", Some(root.id)).await;
  assert_eq!(child.path, "foo-bar.baz");

  let grandchild = variable(&e, "Deep  Leaf", Some(child.id)).await;
  assert_eq!(grandchild.path, "foo-bar.baz.deep-leaf");
}

#[tokio::test]
async fn unresolvable_parent_yields_root_path() {
  let e = engine().await;
  let path = e.derive_path(Some(Uuid::new_v4()), "Orphan Node").await.unwrap();
  assert_eq!(path, "orphan-node");
}

#[tokio::test]
async fn sequential_siblings_get_consecutive_orders() {
  let e = engine().await;
  let root = category(&e, "Root", None).await;

  for i in 0..5 {
    let node = variable(&e, &format!("v{i}"), Some(root.id)).await;
    assert_eq!(node.order, i);
  }

  let listed = e.list_by_parent(Some(root.id)).await.unwrap();
  assert_eq!(names(&listed), vec!["v0", "v1", "v2", "v3", "v4"]);
  assert_eq!(e.next_order(Some(root.id)).await.unwrap(), 5);
  assert_eq!(e.next_order(Some(Uuid::new_v4())).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_siblings_do_not_share_an_order() {
  let e = Arc::new(engine().await);
  let root_id = category(&e, "Root", None).await.id;

  let mut handles = Vec::new();
  for i in 0..8 {
    let e = Arc::clone(&e);
    handles.push(tokio::spawn(async move {
      e.create(NewSetting::variable(format!("c{i}")).under(Some(root_id)), &actor())
        .await
        .unwrap()
        .order
    }));
  }

  let mut orders = HashSet::new();
  for handle in handles {
    orders.insert(handle.await.unwrap());
  }
  assert_eq!(orders, (0..8).collect::<HashSet<i64>>());
}

// ─── Create / update ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_applies_defaults_and_mirrors_variable_value() {
  let e = engine().await;
  let var = e
    .create(NewSetting::variable("Port").with_description("tcp"), &actor())
    .await
    .unwrap();

  assert_eq!(var.kind, SettingKind::Variable);
  assert_eq!(var.value.as_deref(), Some("Port"));
  assert_eq!(var.value_type, Some(ValueType::String));
  assert!(!var.hidden && !var.favorite);
  assert!(var.assigned_targets.is_empty());
  assert_eq!(var.created_by, "u-1");

  let cat = category(&e, "Network", None).await;
  assert_eq!(cat.value, None);
  assert_eq!(cat.value_type, None);

  let stored = e.get(var.id).await.unwrap().unwrap();
  assert_eq!(stored, var);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let e = engine().await;
  assert!(e.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn rename_rewrites_variable_value_even_if_patch_sets_one() {
  let e = engine().await;
  let var = variable(&e, "Old", None).await;

  let patch = SettingPatch {
    value: Some("something else".into()),
    ..SettingPatch::rename("New")
  };
  e.update(var.id, patch, &actor()).await.unwrap();

  let updated = e.get(var.id).await.unwrap().unwrap();
  assert_eq!(updated.name, "New");
  assert_eq!(updated.value.as_deref(), Some("New"));
  assert_eq!(updated.value_type, Some(ValueType::String));
  // Paths are creation-time identifiers.
  assert_eq!(updated.path, "old");
}

#[tokio::test]
async fn value_only_patch_cannot_detach_variable_from_name() {
  let e = engine().await;
  let var = variable(&e, "Pinned", None).await;

  let patch = SettingPatch { value: Some("drift".into()), ..SettingPatch::default() };
  e.update(var.id, patch, &actor()).await.unwrap();

  let updated = e.get(var.id).await.unwrap().unwrap();
  assert_eq!(updated.value.as_deref(), Some("Pinned"));
}

#[tokio::test]
async fn update_leaves_absent_fields_untouched() {
  let e = engine().await;
  let node = e
    .create(
      NewSetting {
        favorite: Some(true),
        assigned_targets: Some(vec!["tech-1".into()]),
        ..NewSetting::category("Zones").with_description("service zones")
      },
      &actor(),
    )
    .await
    .unwrap();

  let patch = SettingPatch { hidden: Some(true), ..SettingPatch::default() };
  e.update(node.id, patch, &Actor::new("u-2", "Sam Roy")).await.unwrap();

  let updated = e.get(node.id).await.unwrap().unwrap();
  assert!(updated.hidden);
  assert!(updated.favorite);
  assert_eq!(updated.description, "service zones");
  assert_eq!(updated.assigned_targets, vec!["tech-1".to_owned()]);
  assert_eq!(updated.created_by, "u-1");
  assert_eq!(updated.updated_by, "u-2");
}

#[tokio::test]
async fn changing_kind_adjusts_value_fields() {
  let e = engine().await;
  let node = category(&e, "Shift", None).await;

  let to_var = SettingPatch { kind: Some(SettingKind::Variable), ..SettingPatch::default() };
  e.update(node.id, to_var, &actor()).await.unwrap();
  let var = e.get(node.id).await.unwrap().unwrap();
  assert_eq!(var.value.as_deref(), Some("Shift"));
  assert_eq!(var.value_type, Some(ValueType::String));

  let to_cat = SettingPatch { kind: Some(SettingKind::Category), ..SettingPatch::default() };
  e.update(node.id, to_cat, &actor()).await.unwrap();
  let cat = e.get(node.id).await.unwrap().unwrap();
  assert_eq!(cat.value, None);
  assert_eq!(cat.value_type, None);
}

#[tokio::test]
async fn update_records_pre_and_post_images() {
  let e = engine().await;
  let var = variable(&e, "Before", None).await;
  e.update(var.id, SettingPatch::rename("After"), &actor()).await.unwrap();

  let history = e.history(var.id).await.unwrap();
  assert_eq!(history.len(), 2);
  let update = &history[0];
  assert_eq!(update.action, HistoryAction::Update);
  assert_eq!(update.modified_by_name, "Dana Morel");
  let before = update.before.as_ref().unwrap();
  let after = update.after.as_ref().unwrap();
  assert_eq!(before["name"], "Before");
  assert_eq!(after["name"], "After");
  assert_eq!(after["value"], "After");
  assert_eq!(after["path"], "before");
}

#[tokio::test]
async fn update_missing_node_surfaces_store_error() {
  let e = engine().await;
  let err = e
    .update(Uuid::new_v4(), SettingPatch::rename("x"), &actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Store(_)));
}

fn placement(nodes: &[SettingNode]) -> Vec<(&str, i64)> {
  nodes.iter().map(|n| (n.name.as_str(), n.order)).collect()
}

#[tokio::test]
async fn reparenting_appends_to_new_sibling_group() {
  let e = engine().await;
  let a = category(&e, "A", None).await;
  let b = category(&e, "B", None).await;
  variable(&e, "a0", Some(a.id)).await;
  variable(&e, "a1", Some(a.id)).await;
  let b0 = variable(&e, "b0", Some(b.id)).await;
  assert_eq!(b0.order, 0);

  let patch = SettingPatch { parent_id: Some(Some(a.id)), ..SettingPatch::default() };
  e.update(b0.id, patch, &actor()).await.unwrap();

  let under_a = e.list_by_parent(Some(a.id)).await.unwrap();
  assert_eq!(placement(&under_a), vec![("a0", 0), ("a1", 1), ("b0", 2)]);
  assert!(e.list_by_parent(Some(b.id)).await.unwrap().is_empty());

  let update = &e.history(b0.id).await.unwrap()[0];
  assert_eq!(update.after.as_ref().unwrap()["order"], 2);
  assert_eq!(update.before.as_ref().unwrap()["order"], 0);
}

#[tokio::test]
async fn reparenting_to_root_and_same_parent() {
  let e = engine().await;
  let a = category(&e, "A", None).await;
  variable(&e, "a0", Some(a.id)).await;
  let a1 = variable(&e, "a1", Some(a.id)).await;

  let same = SettingPatch { parent_id: Some(Some(a.id)), ..SettingPatch::default() };
  e.update(a1.id, same, &actor()).await.unwrap();
  assert_eq!(e.get(a1.id).await.unwrap().unwrap().order, 1);

  let to_root = SettingPatch { parent_id: Some(None), ..SettingPatch::default() };
  e.update(a1.id, to_root, &actor()).await.unwrap();
  let roots = e.list_by_parent(None).await.unwrap();
  assert_eq!(placement(&roots), vec![("A", 0), ("a1", 1)]);
}

#[tokio::test]
async fn reverting_a_reparent_reslots_under_old_parent() {
  let e = engine().await;
  let a = category(&e, "A", None).await;
  let b = category(&e, "B", None).await;
  variable(&e, "a0", Some(a.id)).await;
  let b0 = variable(&e, "b0", Some(b.id)).await;

  let patch = SettingPatch { parent_id: Some(Some(a.id)), ..SettingPatch::default() };
  e.update(b0.id, patch, &actor()).await.unwrap();
  let moved = e.history(b0.id).await.unwrap()[0].clone();

  // b0's old slot under B is taken while it is away.
  variable(&e, "b1", Some(b.id)).await;

  e.revert(b0.id, moved.id, &actor()).await.unwrap();

  let under_b = e.list_by_parent(Some(b.id)).await.unwrap();
  assert_eq!(placement(&under_b), vec![("b1", 0), ("b0", 1)]);
  let under_a = e.list_by_parent(Some(a.id)).await.unwrap();
  assert_eq!(placement(&under_a), vec![("a0", 0)]);

  // Back under B, b0's recorded order 0 belongs to b1, so it stays put.
  e.revert(b0.id, moved.id, &actor()).await.unwrap();
  assert_eq!(e.get(b0.id).await.unwrap().unwrap().order, 1);
}

#[tokio::test]
async fn list_by_target_finds_assigned_nodes() {
  let e = engine().await;
  for (name, targets) in [("A", vec!["t1"]), ("B", vec!["t1", "t2"]), ("C", vec!["t2"])] {
    e.create(
      NewSetting {
        assigned_targets: Some(targets.into_iter().map(String::from).collect()),
        ..NewSetting::category(name)
      },
      &actor(),
    )
    .await
    .unwrap();
  }

  let mut found = names(&e.list_by_target("t1").await.unwrap())
    .into_iter()
    .map(String::from)
    .collect::<Vec<_>>();
  found.sort();
  assert_eq!(found, vec!["A", "B"]);
  assert!(e.list_by_target("nobody").await.unwrap().is_empty());
}

// ─── Cascading delete ────────────────────────────────────────────────────────

/// root ─┬─ a ─── a1 ─── a1x
///       └─ b
async fn sample_tree(e: &SettingsEngine<SqliteStore>) -> Vec<SettingNode> {
  let root = category(e, "Root", None).await;
  let a = category(e, "A", Some(root.id)).await;
  let a1 = category(e, "A1", Some(a.id)).await;
  let a1x = variable(e, "A1x", Some(a1.id)).await;
  let b = variable(e, "B", Some(root.id)).await;
  vec![root, a, a1, a1x, b]
}

#[tokio::test]
async fn delete_subtree_removes_every_descendant() {
  let e = engine().await;
  let tree = sample_tree(&e).await;
  let bystander = category(&e, "Bystander", None).await;

  let deleted = e.delete_subtree(tree[0].id, &actor()).await.unwrap();
  assert_eq!(deleted, tree.len());

  for node in &tree {
    assert!(e.get(node.id).await.unwrap().is_none());
    assert!(e.list_by_parent(Some(node.id)).await.unwrap().is_empty());

    let history = e.history(node.id).await.unwrap();
    let deletes: Vec<_> = history
      .iter()
      .filter(|h| h.action == HistoryAction::Delete)
      .collect();
    assert_eq!(deletes.len(), 1, "one delete entry for {}", node.name);
    assert!(deletes[0].after.is_none());
    assert_eq!(deletes[0].before.as_ref().unwrap()["name"], node.name.as_str());
  }

  assert!(e.get(bystander.id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_subtree_records_leaves_before_parents() {
  let e = engine().await;
  let tree = sample_tree(&e).await;
  e.remove(tree[0].id, &actor()).await.unwrap();

  // The store returns history in insertion order.
  let filters = [Filter::eq("action", "delete")];
  let deleted: Vec<String> = e
    .store()
    .query(Collection::History, &filters)
    .await
    .unwrap()
    .into_iter()
    .map(|r| HistoryEntry::from_record(r).unwrap())
    .map(|h| h.before.unwrap()["name"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(deleted, vec!["A1x", "A1", "A", "B", "Root"]);
}

#[tokio::test]
async fn delete_missing_is_a_no_op() {
  let e = engine().await;
  assert_eq!(e.delete_subtree(Uuid::new_v4(), &actor()).await.unwrap(), 0);
}

// ─── Duplicate ───────────────────────────────────────────────────────────────

fn shape(tree: &SettingTree) -> Vec<(usize, String)> {
  let mut out = Vec::new();
  let mut stack = vec![(0, tree)];
  while let Some((depth, t)) = stack.pop() {
    out.push((depth, t.node.name.clone()));
    stack.extend(t.children.iter().rev().map(|c| (depth + 1, c)));
  }
  out
}

fn ids(tree: &SettingTree) -> HashSet<Uuid> {
  let mut out = HashSet::new();
  let mut stack = vec![tree];
  while let Some(t) = stack.pop() {
    out.insert(t.node.id);
    stack.extend(t.children.iter());
  }
  out
}

#[tokio::test]
async fn shallow_duplicate_copies_only_the_node() {
  let e = engine().await;
  let tree = sample_tree(&e).await;
  let a = &tree[1];

  let copy = e.duplicate(a.id, &actor(), false).await.unwrap();
  assert_ne!(copy.id, a.id);
  assert_eq!(copy.name, "A (copie)");
  assert_eq!(copy.parent_id, a.parent_id);
  assert_eq!(copy.path, "root.a-(copie)");
  assert_eq!(copy.order, 2);
  assert!(e.list_by_parent(Some(copy.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn deep_duplicate_is_isomorphic_with_fresh_ids() {
  let e = engine().await;
  let tree = sample_tree(&e).await;
  // Give A a second child so sibling order is exercised.
  variable(&e, "A2", Some(tree[1].id)).await;

  let copy = e.duplicate(tree[0].id, &actor(), true).await.unwrap();

  let original = e.load_tree(None).await.unwrap();
  let source = original.iter().find(|t| t.node.id == tree[0].id).unwrap();
  let copied = original.iter().find(|t| t.node.id == copy.id).unwrap();

  let mut expected = shape(source);
  expected[0].1.push_str(" (copie)");
  assert_eq!(shape(copied), expected);
  assert_eq!(copied.node_count(), source.node_count());
  assert!(ids(copied).is_disjoint(&ids(source)));

  let leaf = &copied.children[0].children[0].children[0].node;
  assert_eq!(leaf.name, "A1x");
  assert_eq!(leaf.value.as_deref(), Some("A1x"));
}

#[tokio::test]
async fn duplicate_missing_errors() {
  let e = engine().await;
  let err = e.duplicate(Uuid::new_v4(), &actor(), true).await.unwrap_err();
  assert!(matches!(err, Error::SettingNotFound(_)));
}

#[tokio::test]
async fn duplicate_suffix_is_configurable() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = EngineConfig { duplicate_suffix: " copy".into(), ..EngineConfig::default() };
  let e = SettingsEngine::with_config(Arc::new(store), config);

  let node = category(&e, "Base", None).await;
  let copy = e.duplicate(node.id, &actor(), false).await.unwrap();
  assert_eq!(copy.name, "Base copy");
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_builds_the_outline() {
  let e = engine().await;
  let root = category(&e, "Imports", None).await;

  let lines = ["Alpha", "\tBeta", "\tGamma", "\t\tDelta", "Epsilon"];
  let created = e
    .import_hierarchy(lines, Some(root.id), "from text", &actor())
    .await
    .unwrap();

  assert_eq!(names(&created), vec!["Alpha", "Beta", "Gamma", "Delta", "Epsilon"]);
  let [alpha, beta, gamma, delta, epsilon] = &created[..] else {
    panic!("five nodes expected");
  };
  assert_eq!(alpha.parent_id, Some(root.id));
  assert_eq!(beta.parent_id, Some(alpha.id));
  assert_eq!(gamma.parent_id, Some(alpha.id));
  assert!(gamma.order > beta.order);
  assert_eq!(delta.parent_id, Some(gamma.id));
  assert_eq!(epsilon.parent_id, Some(root.id));
  assert!(epsilon.order > alpha.order);
  assert_eq!(delta.path, "imports.alpha.gamma.delta");

  for node in &created {
    assert_eq!(node.kind, SettingKind::Variable);
    assert_eq!(node.value.as_deref(), Some(node.name.as_str()));
    assert_eq!(node.description, "from text");
  }
}

#[tokio::test]
async fn import_two_space_lines_are_siblings_under_root() {
  let e = engine().await;
  let root = category(&e, "Root", None).await;

  let created = e
    .import_hierarchy(["  Two-space A", "  Two-space B"], Some(root.id), "", &actor())
    .await
    .unwrap();

  assert_eq!(created.len(), 2);
  assert!(created.iter().all(|n| n.parent_id == Some(root.id)));
  assert_eq!(names(&created), vec!["Two-space A", "Two-space B"]);
}

// ─── Bulk create / reorder ───────────────────────────────────────────────────

#[tokio::test]
async fn bulk_create_appends_after_existing_siblings() {
  let e = engine().await;
  let root = category(&e, "Cities", None).await;
  variable(&e, "Lyon", Some(root.id)).await;

  let created = e
    .bulk_create(["Paris", " ", "Nantes", "Lille"], Some(root.id), "fr", &actor())
    .await
    .unwrap();

  assert_eq!(names(&created), vec!["Paris", "Nantes", "Lille"]);
  assert_eq!(created.iter().map(|n| n.order).collect::<Vec<_>>(), vec![1, 2, 3]);
  assert_eq!(created[0].path, "cities.paris");

  let listed = e.list_by_parent(Some(root.id)).await.unwrap();
  assert_eq!(names(&listed), vec!["Lyon", "Paris", "Nantes", "Lille"]);

  for node in &created {
    let history = e.history(node.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, HistoryAction::Create);
  }
}

#[tokio::test]
async fn reorder_moves_and_logs_order_deltas() {
  let e = engine().await;
  let root = category(&e, "Root", None).await;
  let first = variable(&e, "first", Some(root.id)).await;
  let second = variable(&e, "second", Some(root.id)).await;

  e.reorder(
    &[
      OrderUpdate { id: first.id, order: 1 },
      OrderUpdate { id: second.id, order: 0 },
    ],
    &actor(),
  )
  .await
  .unwrap();

  let listed = e.list_by_parent(Some(root.id)).await.unwrap();
  assert_eq!(names(&listed), vec!["second", "first"]);

  let moved = &e.history(first.id).await.unwrap()[0];
  assert_eq!(moved.action, HistoryAction::Move);
  assert_eq!(moved.before, Some(serde_json::json!({ "order": 0 })));
  assert_eq!(moved.after, Some(serde_json::json!({ "order": 1 })));
}

#[tokio::test]
async fn reorder_with_unknown_id_changes_nothing() {
  let e = engine().await;
  let node = variable(&e, "solo", None).await;

  let result = e
    .reorder(
      &[
        OrderUpdate { id: node.id, order: 9 },
        OrderUpdate { id: Uuid::new_v4(), order: 1 },
      ],
      &actor(),
    )
    .await;

  assert!(matches!(result, Err(Error::Store(_))));
  assert_eq!(e.get(node.id).await.unwrap().unwrap().order, 0);
  assert_eq!(e.history(node.id).await.unwrap().len(), 1);
}

// ─── Revert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn revert_restores_snapshot_and_is_idempotent() {
  let e = engine().await;
  let node = e
    .create(NewSetting::variable("Original").with_description("v1"), &actor())
    .await
    .unwrap();
  e.update(
    node.id,
    SettingPatch { description: Some("v2".into()), ..SettingPatch::rename("Renamed") },
    &actor(),
  )
  .await
  .unwrap();

  let update = e.history(node.id).await.unwrap()[0].clone();
  assert_eq!(update.action, HistoryAction::Update);

  e.revert(node.id, update.id, &actor()).await.unwrap();
  let once = e.get(node.id).await.unwrap().unwrap();
  assert_eq!(once.name, "Original");
  assert_eq!(once.value.as_deref(), Some("Original"));
  assert_eq!(once.description, "v1");

  e.revert(node.id, update.id, &actor()).await.unwrap();
  let twice = e.get(node.id).await.unwrap().unwrap();
  assert_eq!(
    (&twice.name, &twice.description, &twice.value, twice.order),
    (&once.name, &once.description, &once.value, once.order)
  );

  let history = e.history(node.id).await.unwrap();
  assert_eq!(history.len(), 4);
  assert_eq!(history[0].action, HistoryAction::Revert);
  assert_eq!(history[0].before.as_ref().unwrap()["name"], "Original");
  assert_eq!(history[1].before.as_ref().unwrap()["name"], "Renamed");
}

#[tokio::test]
async fn revert_of_create_entry_is_rejected() {
  let e = engine().await;
  let node = variable(&e, "Fresh", None).await;
  let created = e.history(node.id).await.unwrap()[0].clone();

  let err = e.revert(node.id, created.id, &actor()).await.unwrap_err();
  assert!(matches!(err, Error::NothingToRevert(_)));
}

#[tokio::test]
async fn revert_unknown_entry_or_foreign_entry_errors() {
  let e = engine().await;
  let a = variable(&e, "A", None).await;
  let b = variable(&e, "B", None).await;
  e.update(b.id, SettingPatch::rename("B2"), &actor()).await.unwrap();
  let b_update = e.history(b.id).await.unwrap()[0].clone();

  let err = e.revert(a.id, Uuid::new_v4(), &actor()).await.unwrap_err();
  assert!(matches!(err, Error::HistoryNotFound(_)));

  let err = e.revert(a.id, b_update.id, &actor()).await.unwrap_err();
  assert!(matches!(err, Error::HistoryMismatch { .. }));
}

#[tokio::test]
async fn revert_of_move_restores_only_order() {
  let e = engine().await;
  let node = variable(&e, "Mover", None).await;
  e.reorder(&[OrderUpdate { id: node.id, order: 7 }], &actor())
    .await
    .unwrap();
  e.update(node.id, SettingPatch::rename("Kept"), &actor()).await.unwrap();

  let moved = e
    .history(node.id)
    .await
    .unwrap()
    .into_iter()
    .find(|h| h.action == HistoryAction::Move)
    .unwrap();
  e.revert(node.id, moved.id, &actor()).await.unwrap();

  let reverted = e.get(node.id).await.unwrap().unwrap();
  assert_eq!(reverted.order, 0);
  assert_eq!(reverted.name, "Kept");
}

// ─── History ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_survives_deletion() {
  let e = engine().await;
  let node = variable(&e, "Ephemeral", None).await;
  e.update(node.id, SettingPatch::rename("Ephemeral 2"), &actor()).await.unwrap();
  assert_eq!(e.history(node.id).await.unwrap().len(), 2);

  e.remove(node.id, &actor()).await.unwrap();

  let history = e.history(node.id).await.unwrap();
  let actions: Vec<_> = history.iter().map(|h| h.action).collect();
  assert_eq!(
    actions,
    vec![HistoryAction::Delete, HistoryAction::Update, HistoryAction::Create]
  );
  assert!(history.iter().all(|h| h.setting_path == "ephemeral"));
}

/// A store whose history collection rejects every write.
#[derive(Clone)]
struct HistoryDown(SqliteStore);

#[derive(Debug, thiserror::Error)]
enum HistoryDownError {
  #[error("history collection unavailable")]
  Unavailable,
  #[error(transparent)]
  Inner(#[from] settree_store_sqlite::Error),
}

impl DocumentStore for HistoryDown {
  type Error = HistoryDownError;

  async fn get_by_id(
    &self,
    collection: Collection,
    id: Uuid,
  ) -> Result<Option<Record>, HistoryDownError> {
    Ok(self.0.get_by_id(collection, id).await?)
  }

  async fn query<'a>(
    &'a self,
    collection: Collection,
    filters: &'a [Filter],
  ) -> Result<Vec<Record>, HistoryDownError> {
    Ok(self.0.query(collection, filters).await?)
  }

  async fn add(&self, collection: Collection, data: Document) -> Result<Uuid, HistoryDownError> {
    if collection == Collection::History {
      return Err(HistoryDownError::Unavailable);
    }
    Ok(self.0.add(collection, data).await?)
  }

  async fn update(
    &self,
    collection: Collection,
    id: Uuid,
    data: Document,
  ) -> Result<(), HistoryDownError> {
    Ok(self.0.update(collection, id, data).await?)
  }

  async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), HistoryDownError> {
    Ok(self.0.delete(collection, id).await?)
  }

  async fn batch_write(&self, ops: Vec<BatchOp>) -> Result<(), HistoryDownError> {
    Ok(self.0.batch_write(ops).await?)
  }

  async fn subscribe(
    &self,
    collection: Collection,
    filters: Vec<Filter>,
  ) -> Result<Subscription, HistoryDownError> {
    Ok(self.0.subscribe(collection, filters).await?)
  }
}

#[tokio::test]
async fn audit_failures_do_not_fail_mutations() {
  let store = HistoryDown(SqliteStore::open_in_memory().await.unwrap());
  let e = SettingsEngine::new(Arc::new(store));

  let root = e.create(NewSetting::category("Root"), &actor()).await.unwrap();
  let child = e
    .create(NewSetting::variable("Child").under(Some(root.id)), &actor())
    .await
    .unwrap();
  e.update(child.id, SettingPatch::rename("Renamed"), &actor()).await.unwrap();
  e.bulk_create(["x", "y"], Some(root.id), "", &actor()).await.unwrap();

  assert_eq!(e.get(child.id).await.unwrap().unwrap().name, "Renamed");
  assert!(e.history(child.id).await.unwrap().is_empty());

  assert_eq!(e.delete_subtree(root.id, &actor()).await.unwrap(), 4);
  assert!(e.get(root.id).await.unwrap().is_none());
}

// ─── Inheritance ─────────────────────────────────────────────────────────────

async fn inheriting(
  e: &SettingsEngine<SqliteStore>,
  name: &str,
  from: Option<Uuid>,
) -> SettingNode {
  e.create(NewSetting { inherited_from: from, ..NewSetting::category(name) }, &actor())
    .await
    .unwrap()
}

#[tokio::test]
async fn resolve_value_follows_inheritance_chain() {
  let e = engine().await;
  let source = variable(&e, "Europe/Paris", None).await;
  let mid = inheriting(&e, "Timezone", Some(source.id)).await;
  let leaf = inheriting(&e, "Site timezone", Some(mid.id)).await;

  assert_eq!(e.resolve_value(source.id).await.unwrap().as_deref(), Some("Europe/Paris"));
  assert_eq!(e.resolve_value(leaf.id).await.unwrap().as_deref(), Some("Europe/Paris"));

  let dangling = inheriting(&e, "Dangling", Some(Uuid::new_v4())).await;
  assert_eq!(e.resolve_value(dangling.id).await.unwrap(), None);

  let err = e.resolve_value(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::SettingNotFound(_)));
}

#[tokio::test]
async fn resolve_value_detects_cycles() {
  let e = engine().await;
  let a = inheriting(&e, "A", None).await;
  let b = inheriting(&e, "B", Some(a.id)).await;
  let patch = SettingPatch { inherited_from: Some(Some(b.id)), ..SettingPatch::default() };
  e.update(a.id, patch, &actor()).await.unwrap();

  let err = e.resolve_value(b.id).await.unwrap_err();
  assert!(matches!(err, Error::InheritanceCycle(_)));
}

#[tokio::test]
async fn resolve_value_bounds_chain_length() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = EngineConfig { max_inheritance_depth: 2, ..EngineConfig::default() };
  let e = SettingsEngine::with_config(Arc::new(store), config);

  let source = variable(&e, "v", None).await;
  let one = inheriting(&e, "1", Some(source.id)).await;
  let two = inheriting(&e, "2", Some(one.id)).await;
  let three = inheriting(&e, "3", Some(two.id)).await;

  assert_eq!(e.resolve_value(two.id).await.unwrap().as_deref(), Some("v"));
  let err = e.resolve_value(three.id).await.unwrap_err();
  assert!(matches!(err, Error::InheritanceTooDeep { limit: 2, .. }));
}

// ─── Tree and watches ────────────────────────────────────────────────────────

#[tokio::test]
async fn load_tree_nests_in_sibling_order() {
  let e = engine().await;
  let tree = sample_tree(&e).await;

  let forest = e.load_tree(None).await.unwrap();
  assert_eq!(forest.len(), 1);
  let root = &forest[0];
  assert_eq!(root.node.id, tree[0].id);
  assert_eq!(
    root.children.iter().map(|c| c.node.name.as_str()).collect::<Vec<_>>(),
    vec!["A", "B"]
  );
  assert_eq!(root.node_count(), 5);

  let under_a = e.load_tree(Some(tree[1].id)).await.unwrap();
  assert_eq!(under_a.len(), 1);
  assert_eq!(under_a[0].node.name, "A1");
  assert_eq!(under_a[0].children[0].node.name, "A1x");
}

#[tokio::test]
async fn watch_children_sees_new_siblings_in_order() {
  let e = engine().await;
  let root = category(&e, "Root", None).await;
  variable(&e, "first", Some(root.id)).await;

  let mut watch = e.watch_children(Some(root.id)).await.unwrap();
  let initial = watch.next().await.unwrap().unwrap();
  assert_eq!(names(&initial), vec!["first"]);

  variable(&e, "second", Some(root.id)).await;

  let listing = tokio::time::timeout(Duration::from_secs(5), async {
    loop {
      let nodes = watch.next().await.unwrap().unwrap();
      if nodes.len() == 2 {
        return nodes;
      }
    }
  })
  .await
  .expect("second sibling observed");
  assert_eq!(names(&listing), vec!["first", "second"]);

  watch.unsubscribe();
}

#[tokio::test]
async fn watch_target_tracks_assignments() {
  let e = engine().await;
  let node = category(&e, "Unassigned", None).await;

  let mut watch = e.watch_target("tech-9").await.unwrap();
  assert!(watch.next().await.unwrap().unwrap().is_empty());

  let patch = SettingPatch {
    assigned_targets: Some(vec!["tech-9".into()]),
    ..SettingPatch::default()
  };
  e.update(node.id, patch, &actor()).await.unwrap();

  let listing = tokio::time::timeout(Duration::from_secs(5), async {
    loop {
      let nodes = watch.next().await.unwrap().unwrap();
      if !nodes.is_empty() {
        return nodes;
      }
    }
  })
  .await
  .expect("assignment observed");
  assert_eq!(listing[0].id, node.id);
}
