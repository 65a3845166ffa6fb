//! The hierarchical settings engine.
//!
//! [`SettingsEngine`] layers tree semantics over any
//! [`DocumentStore`]: materialised paths, sibling ordering, an append-only
//! audit history with revert, cascading delete, shallow and deep
//! duplication, and bulk import of indented text.
//!
//! The engine adds no locking beyond sibling-order allocation and no
//! retries; every store call is a suspension point and store errors
//! propagate unchanged inside [`Error::Store`].

pub mod config;
pub mod error;
pub mod import;
pub mod tree;
pub mod watch;

mod bulk;
mod derive;
mod history;
mod inherit;
mod nodes;
mod revert;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use tree::SettingTree;
pub use watch::NodeWatch;

use std::sync::Arc;

use settree_core::store::DocumentStore;

use crate::derive::OrderLocks;

/// The settings engine, generic over its document-store backend.
///
/// Share it behind an `Arc`; every operation takes `&self`.
pub struct SettingsEngine<S> {
  store:       Arc<S>,
  config:      EngineConfig,
  order_locks: OrderLocks,
}

impl<S: DocumentStore> SettingsEngine<S> {
  pub fn new(store: Arc<S>) -> Self { Self::with_config(store, EngineConfig::default()) }

  pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
    Self { store, config, order_locks: OrderLocks::default() }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }
}

#[cfg(test)]
mod tests;
