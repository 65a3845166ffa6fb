//! Setting nodes, the entries of the configuration tree.
//!
//! Nodes are stored flat; the tree is expressed through `parent_id` edges and
//! sibling `order`. `path` is a materialised dotted slug fixed at creation
//! and never recomputed, so it stays a stable identifier across renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  Result,
  store::{Document, Record, encode_document},
};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// Categories are pure containers; variables carry a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
  Category,
  Variable,
}

/// The value representation of a variable. Only strings exist today.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
  #[default]
  String,
}

// ─── SettingNode ─────────────────────────────────────────────────────────────

/// A persisted configuration node.
///
/// For variables `value_type == Some(ValueType::String)` and
/// `value == Some(name)`; the engine restores this on every create and
/// rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingNode {
  pub id:               Uuid,
  pub path:             String,
  pub name:             String,
  #[serde(default)]
  pub description:      String,
  #[serde(rename = "type")]
  pub kind:             SettingKind,
  #[serde(default)]
  pub parent_id:        Option<Uuid>,
  #[serde(default)]
  pub order:            i64,
  #[serde(default)]
  pub hidden:           bool,
  #[serde(default)]
  pub favorite:         bool,
  #[serde(default)]
  pub assigned_targets: Vec<String>,
  #[serde(default)]
  pub value_type:       Option<ValueType>,
  #[serde(default)]
  pub value:            Option<String>,
  /// Node whose value is used when this one has none.
  #[serde(default)]
  pub inherited_from:   Option<Uuid>,
  pub created_at:       DateTime<Utc>,
  pub created_by:       String,
  pub updated_at:       DateTime<Utc>,
  pub updated_by:       String,
}

impl SettingNode {
  pub fn from_record(record: Record) -> Result<Self> { record.decode() }

  /// The persisted form, without `id`. Optional fields are written as
  /// explicit `null` so a full overwrite clears them.
  pub fn to_document(&self) -> Result<Document> { encode_document(self) }

  /// The opaque snapshot stored in history entries. Every field has a plain
  /// JSON form, so serialisation cannot fail.
  pub fn snapshot(&self) -> Value { serde_json::to_value(self).unwrap_or_default() }

  pub fn is_variable(&self) -> bool { self.kind == SettingKind::Variable }
}

// ─── NewSetting ──────────────────────────────────────────────────────────────

/// Input to node creation. `id`, `path`, `order` and the audit fields are
/// always assigned by the engine; they are not accepted from callers. Neither
/// is a variable's value: it always mirrors `name`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSetting {
  pub name:             String,
  #[serde(default)]
  pub description:      Option<String>,
  #[serde(rename = "type")]
  pub kind:             SettingKind,
  #[serde(default)]
  pub parent_id:        Option<Uuid>,
  #[serde(default)]
  pub inherited_from:   Option<Uuid>,
  #[serde(default)]
  pub hidden:           Option<bool>,
  #[serde(default)]
  pub favorite:         Option<bool>,
  #[serde(default)]
  pub assigned_targets: Option<Vec<String>>,
}

impl NewSetting {
  fn new(name: impl Into<String>, kind: SettingKind) -> Self {
    Self {
      name: name.into(),
      description: None,
      kind,
      parent_id: None,
      inherited_from: None,
      hidden: None,
      favorite: None,
      assigned_targets: None,
    }
  }

  pub fn category(name: impl Into<String>) -> Self {
    Self::new(name, SettingKind::Category)
  }

  pub fn variable(name: impl Into<String>) -> Self {
    Self::new(name, SettingKind::Variable)
  }

  pub fn under(mut self, parent_id: Option<Uuid>) -> Self {
    self.parent_id = parent_id;
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }
}

// ─── SettingPatch ────────────────────────────────────────────────────────────

/// A partial update. Absent fields are left untouched; for the nullable
/// references `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingPatch {
  pub name:             Option<String>,
  pub description:      Option<String>,
  #[serde(rename = "type")]
  pub kind:             Option<SettingKind>,
  #[serde(default, deserialize_with = "double_option")]
  pub parent_id:        Option<Option<Uuid>>,
  pub hidden:           Option<bool>,
  pub favorite:         Option<bool>,
  pub assigned_targets: Option<Vec<String>>,
  pub value:            Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub inherited_from:   Option<Option<Uuid>>,
}

impl SettingPatch {
  pub fn rename(name: impl Into<String>) -> Self {
    Self { name: Some(name.into()), ..Self::default() }
  }

  /// Only the fields that are present, ready to merge into a document.
  pub fn to_document(&self) -> Document {
    let mut doc = Document::new();
    if let Some(name) = &self.name {
      doc.insert("name".into(), json!(name));
    }
    if let Some(description) = &self.description {
      doc.insert("description".into(), json!(description));
    }
    if let Some(kind) = self.kind {
      doc.insert("type".into(), json!(kind));
    }
    if let Some(parent_id) = self.parent_id {
      doc.insert("parentId".into(), json!(parent_id));
    }
    if let Some(hidden) = self.hidden {
      doc.insert("hidden".into(), json!(hidden));
    }
    if let Some(favorite) = self.favorite {
      doc.insert("favorite".into(), json!(favorite));
    }
    if let Some(targets) = &self.assigned_targets {
      doc.insert("assignedTargets".into(), json!(targets));
    }
    if let Some(value) = &self.value {
      doc.insert("value".into(), json!(value));
    }
    if let Some(inherited_from) = self.inherited_from {
      doc.insert("inheritedFrom".into(), json!(inherited_from));
    }
    doc
  }
}

// ─── OrderUpdate ─────────────────────────────────────────────────────────────

/// One entry of a sibling reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
  pub id:    Uuid,
  pub order: i64,
}

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}
