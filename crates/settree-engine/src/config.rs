//! Engine configuration, deserialised from the `[engine]` table of the
//! server config. Every field has a default.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Appended to the name of the top node of a duplicate.
  pub duplicate_suffix:      String,
  /// Longest `inheritedFrom` chain followed before giving up.
  pub max_inheritance_depth: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      duplicate_suffix:      " (copie)".to_owned(),
      max_inheritance_depth: 32,
    }
  }
}
