//! The identity stamped onto audit fields and history entries.
//!
//! Resolving who is acting is the caller's concern; the engine only records
//! what it is given.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:   String,
  pub name: String,
}

impl Actor {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self { id: id.into(), name: name.into() }
  }
}
