use std::collections::HashMap;
use std::f64::consts::PI;

use glam::DVec3;

use crate::error::Result;
use crate::grid::Scale;
use crate::tree::{NodeId, RootTree};

/// Up direction of the scan; roots grow mostly along `-UP`.
pub const UP: DVec3 = DVec3::Z;

/// Aggregate values of one branch.
///
/// Angles are in radians. Segment values are weighted by segment length; a
/// branch of zero length reports zero angles and the tail radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BranchMetrics {
  pub root: NodeId,
  pub tail: NodeId,
  /// Nodes in the branch, root excluded.
  pub nodes: usize,
  pub length: f64,
  /// Mean of segment radii, each segment radius the mean of its ends.
  pub mean_radius: f64,
  /// Sum of `pi * r^2 * length` over segments.
  pub volume: f64,
  /// Mean angle between segments and [`UP`].
  pub vertical_angle: f64,
  /// Mean elevation of segments above the plane normal to [`UP`].
  pub horizontal_angle: f64,
  /// Angle between the direction into the branch root and the first
  /// segment. `None` when the branch hangs from the tree root.
  pub branching_angle: Option<f64>,
  /// Index of the branch whose tail is this branch's root.
  pub parent: Option<usize>,
}

#[inline]
fn angle_between(a: DVec3, b: DVec3) -> Option<f64> {
  let norm = a.length() * b.length();
  (norm > 0.0).then(|| (a.dot(b) / norm).clamp(-1.0, 1.0).acos())
}

/// Metrics of every branch, in the order of [`RootTree::branches`].
pub fn branch_metrics(tree: &RootTree, scale: Scale) -> Result<Vec<BranchMetrics>> {
  let branches = tree.branches();
  let by_tail: HashMap<NodeId, usize> = branches
    .iter()
    .enumerate()
    .map(|(i, b)| (b.tail(), i))
    .collect();

  let mut out = Vec::with_capacity(branches.len());
  for branch in &branches {
    let path = branch.path(tree)?;
    let mut length = 0.0;
    let mut radius = 0.0;
    let mut volume = 0.0;
    let mut vertical = 0.0;
    let mut horizontal = 0.0;
    for pair in path.windows(2) {
      let a = tree.node(pair[0])?;
      let b = tree.node(pair[1])?;
      let step = scale.apply(b.pos - a.pos);
      let len = step.length();
      if len == 0.0 {
        continue;
      }
      let r = 0.5 * (f64::from(a.radius) + f64::from(b.radius));
      length += len;
      radius += r * len;
      volume += PI * r * r * len;
      let along_up = (step.dot(UP) / len).clamp(-1.0, 1.0);
      vertical += along_up.acos() * len;
      horizontal += along_up.asin() * len;
    }

    let (mean_radius, vertical_angle, horizontal_angle) = if length > 0.0 {
      (radius / length, vertical / length, horizontal / length)
    } else {
      (f64::from(tree.node(branch.tail())?.radius), 0.0, 0.0)
    };

    let root = tree.node(branch.root())?;
    let start = tree.node(branch.start())?;
    let branching_angle = match root.parent() {
      Some(incoming) => {
        let incoming = tree.node(incoming)?;
        angle_between(
          scale.apply(root.pos - incoming.pos),
          scale.apply(start.pos - root.pos),
        )
      }
      None => None,
    };

    out.push(BranchMetrics {
      root: branch.root(),
      tail: branch.tail(),
      nodes: branch.len(),
      length,
      mean_radius,
      volume,
      vertical_angle,
      horizontal_angle,
      branching_angle,
      parent: by_tail.get(&branch.root()).copied(),
    });
  }
  Ok(out)
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_test;
