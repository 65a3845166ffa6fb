//! Live views over the sibling and target listings.

use settree_core::{
  setting::SettingNode,
  store::{Collection, DocumentStore, Filter, Subscription},
};
use uuid::Uuid;

use crate::{Error, Result, SettingsEngine, derive::parent_filter, nodes::decode_nodes};

/// A stream of full listings, re-read whenever the settings change.
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct NodeWatch {
  inner:  Subscription,
  sorted: bool,
}

impl NodeWatch {
  /// The next listing, or `None` once the backend stops delivering.
  /// Child listings arrive sorted by `order`; target listings unsorted.
  pub async fn next(&mut self) -> Option<Result<Vec<SettingNode>>> {
    let records = self.inner.next().await?;
    Some(decode_nodes(records).map(|mut nodes| {
      if self.sorted {
        nodes.sort_by_key(|n| n.order);
      }
      nodes
    }))
  }

  pub fn unsubscribe(self) { self.inner.unsubscribe(); }
}

impl<S: DocumentStore> SettingsEngine<S> {
  /// Watch the children of `parent_id`.
  pub async fn watch_children(&self, parent_id: Option<Uuid>) -> Result<NodeWatch> {
    let inner = self
      .store
      .subscribe(Collection::Settings, vec![parent_filter(parent_id)])
      .await
      .map_err(Error::store)?;
    Ok(NodeWatch { inner, sorted: true })
  }

  /// Watch the nodes assigned to `target`.
  pub async fn watch_target(&self, target: &str) -> Result<NodeWatch> {
    let inner = self
      .store
      .subscribe(Collection::Settings, vec![Filter::contains("assignedTargets", target)])
      .await
      .map_err(Error::store)?;
    Ok(NodeWatch { inner, sorted: false })
  }
}
