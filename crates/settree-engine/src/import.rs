//! Bulk import of an indented outline as a tree of variables.
//!
//! ```text
//! Alpha
//! \tBeta
//! \tGamma
//! \t\tDelta
//! Epsilon
//! ```
//!
//! Each tab, or each pair of spaces, is one level. A line becomes a child of
//! the most recent line with a strictly smaller level, or of the import root
//! when there is none.

use settree_core::{
  actor::Actor,
  setting::{NewSetting, SettingNode},
  store::DocumentStore,
};
use uuid::Uuid;

use crate::{Result, SettingsEngine};

/// One non-blank line of an outline, with its resolved parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
  pub name:   String,
  pub level:  usize,
  /// Index of the parent within the plan; `None` means the import root.
  pub parent: Option<usize>,
}

/// Count leading indentation: one level per tab, one per pair of spaces.
/// Scanning stops at the first other character, including a lone space.
pub fn indent_level(line: &str) -> usize {
  let bytes = line.as_bytes();
  let mut level = 0;
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\t' => {
        level += 1;
        i += 1;
      }
      b' ' if bytes.get(i + 1) == Some(&b' ') => {
        level += 1;
        i += 2;
      }
      _ => break,
    }
  }
  level
}

/// Resolve the parent of every non-blank line, in input order.
pub fn plan_hierarchy<I, L>(lines: I) -> Vec<PlannedNode>
where
  I: IntoIterator<Item = L>,
  L: AsRef<str>,
{
  let mut plan: Vec<PlannedNode> = Vec::new();
  // (level, plan index) of the open ancestors.
  let mut stack: Vec<(usize, usize)> = Vec::new();

  for line in lines {
    let line = line.as_ref();
    let name = line.trim();
    if name.is_empty() {
      continue;
    }

    let level = indent_level(line);
    while stack.last().is_some_and(|&(top, _)| top >= level) {
      stack.pop();
    }

    let parent = stack.last().map(|&(_, index)| index);
    stack.push((level, plan.len()));
    plan.push(PlannedNode { name: name.to_owned(), level, parent });
  }

  plan
}

impl<S: DocumentStore> SettingsEngine<S> {
  /// Create one variable per non-blank line under `root`, nested by
  /// indentation, all sharing `description`. Returns the nodes in input
  /// order. Nodes are created one at a time; a failure leaves the ones
  /// already created in place.
  pub async fn import_hierarchy<I, L>(
    &self,
    lines: I,
    root: Option<Uuid>,
    description: &str,
    actor: &Actor,
  ) -> Result<Vec<SettingNode>>
  where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
  {
    let plan = plan_hierarchy(lines);
    let mut created: Vec<SettingNode> = Vec::with_capacity(plan.len());

    for planned in plan {
      let parent_id = match planned.parent {
        Some(index) => Some(created[index].id),
        None => root,
      };
      let input = NewSetting::variable(planned.name)
        .under(parent_id)
        .with_description(description);
      created.push(self.create(input, actor).await?);
    }

    tracing::info!(root = ?root, created = created.len(), "hierarchy imported");
    Ok(created)
  }
}
