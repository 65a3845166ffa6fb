//! Effective-value resolution through `inheritedFrom` links.

use std::collections::HashSet;

use settree_core::store::DocumentStore;
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine};

impl<S: DocumentStore> SettingsEngine<S> {
  /// The value of `id`, or the first value found by following
  /// `inheritedFrom` links from it.
  ///
  /// Returns `None` when the chain ends (or dangles) without a value, and
  /// [`Error::SettingNotFound`] if `id` itself does not exist.
  /// Revisiting a node is [`Error::InheritanceCycle`]; following more than
  /// `max_inheritance_depth` links is [`Error::InheritanceTooDeep`].
  pub async fn resolve_value(&self, id: Uuid) -> Result<Option<String>> {
    let limit = self.config.max_inheritance_depth;
    let mut visited = HashSet::new();
    let mut current = id;

    loop {
      if !visited.insert(current) {
        return Err(Error::InheritanceCycle(current));
      }
      if visited.len() > limit + 1 {
        return Err(Error::InheritanceTooDeep { start: id, limit });
      }

      let Some(node) = self.get(current).await? else {
        if current == id {
          return Err(Error::SettingNotFound(id));
        }
        return Ok(None);
      };
      if let Some(value) = node.value {
        return Ok(Some(value));
      }
      match node.inherited_from {
        Some(next) => current = next,
        None => return Ok(None),
      }
    }
  }
}
