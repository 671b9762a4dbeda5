//! Branch-level clean-up of an extracted tree.
//!
//! - [`prune_short_branches`] / [`prune_thin_branches`]: drop leaf branches
//!   below a length or mean radius, repeated until nothing changes.
//! - [`simplify_branches`]: Douglas-Peucker on every branch.
//! - [`branch_metrics`]: per-branch length, radius, volume and angles.

mod metrics;
mod prune;
mod simplify;

pub use metrics::{branch_metrics, BranchMetrics, UP};
pub use prune::{prune_short_branches, prune_thin_branches, PruneStats};
pub use simplify::{simplify_branches, SimplifyStats};

use crate::error::Result;
use crate::grid::Scale;
use crate::tree::RootTree;

/// Remove leaf branches shorter than `threshold` voxels.
pub fn prune(tree: &mut RootTree, threshold: f64) -> Result<PruneStats> {
  prune_short_branches(tree, threshold, Scale::UNIT)
}

/// Douglas-Peucker with `tolerance` in voxels.
pub fn simplify(tree: &mut RootTree, tolerance: f64) -> Result<SimplifyStats> {
  simplify_branches(tree, tolerance, Scale::UNIT)
}
