use crate::error::{Result, SkeletonError};
use crate::grid::Scale;
use crate::tree::{Branch, NodeId, RootTree};

/// Counters of one pruning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
  /// Decomposition passes, including the final one that removed nothing.
  pub passes: usize,
  pub branches_removed: usize,
  pub nodes_removed: usize,
}

/// Remove leaf branches whose length is below `min_length`.
///
/// Removing a branch can merge its sibling with the parent branch, so the
/// tree is decomposed again until a pass removes nothing.
#[tracing::instrument(skip_all, name = "refine::prune_short", fields(min_length = min_length))]
pub fn prune_short_branches(tree: &mut RootTree, min_length: f64, scale: Scale) -> Result<PruneStats> {
  if min_length.is_nan() {
    return Err(SkeletonError::invalid("min_length", "must not be NaN"));
  }
  prune_leaf_branches(tree, |tree, branch| Ok(branch.length(tree, scale)? < min_length))
}

/// Remove leaf branches whose length-weighted mean radius is below
/// `min_radius`.
#[tracing::instrument(skip_all, name = "refine::prune_thin", fields(min_radius = min_radius))]
pub fn prune_thin_branches(tree: &mut RootTree, min_radius: f64, scale: Scale) -> Result<PruneStats> {
  if min_radius.is_nan() {
    return Err(SkeletonError::invalid("min_radius", "must not be NaN"));
  }
  prune_leaf_branches(tree, |tree, branch| Ok(branch.mean_radius(tree, scale)? < min_radius))
}

fn prune_leaf_branches(
  tree: &mut RootTree,
  doomed: impl Fn(&RootTree, &Branch) -> Result<bool>,
) -> Result<PruneStats> {
  let mut stats = PruneStats::default();
  loop {
    stats.passes += 1;
    // Leaf branches never overlap, so all of them can be judged against the
    // same decomposition and removed by their start nodes.
    let mut starts: Vec<NodeId> = Vec::new();
    for branch in tree.branches().iter().rev() {
      if branch.is_leaf(tree) && doomed(tree, branch)? {
        starts.push(branch.start());
      }
    }
    if starts.is_empty() {
      break;
    }
    for start in starts {
      stats.nodes_removed += tree.remove_subtree(start)?;
      stats.branches_removed += 1;
    }
    tracing::debug!(
      pass = stats.passes,
      branches = stats.branches_removed,
      nodes = stats.nodes_removed,
      "pruned leaf branches"
    );
  }
  Ok(stats)
}

#[cfg(test)]
#[path = "prune_test.rs"]
mod prune_test;
