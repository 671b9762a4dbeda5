//! Douglas-Peucker simplification of branch polylines.
//!
//! Each branch is a polyline from its root to its tail. A segment `(a, b)`
//! is collapsed when every interior point lies closer than the tolerance to
//! the chord `a -> b`; otherwise it is split at the farthest point:
//!
//! ```text
//!   a . . . . . . . . b        max distance < tol : drop interior points
//!      `.   *   .'
//!          far               max distance >= tol: recurse on (a, far)
//!                                                  and (far, b)
//! ```

use glam::DVec3;

use crate::error::{Result, SkeletonError};
use crate::grid::Scale;
use crate::tree::{Branch, RootTree};

/// Counters of one simplification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyStats {
  pub branches: usize,
  /// Segments whose interior was dropped.
  pub segments_collapsed: usize,
  pub nodes_removed: usize,
}

/// Squared distance from `p` to the line through `a` and `b`, or to `a` when
/// the chord is degenerate.
#[inline]
pub(crate) fn chord_distance_squared(p: DVec3, a: DVec3, b: DVec3) -> f64 {
  let m = b - a;
  let len_sq = m.length_squared();
  if len_sq == 0.0 {
    return p.distance_squared(a);
  }
  (p - a).cross(m).length_squared() / len_sq
}

/// Index pairs `(a, b)` of the segments whose interior points are dropped.
pub(crate) fn collapsed_segments(points: &[DVec3], tolerance_sq: f64) -> Vec<(usize, usize)> {
  let mut out = Vec::new();
  if points.len() < 3 {
    return out;
  }
  let mut work = vec![(0, points.len() - 1)];
  while let Some((a, b)) = work.pop() {
    if b <= a + 1 {
      continue;
    }
    let mut far = a + 1;
    let mut far_sq = f64::NEG_INFINITY;
    for (i, &p) in points.iter().enumerate().take(b).skip(a + 1) {
      let d = chord_distance_squared(p, points[a], points[b]);
      if d > far_sq {
        far_sq = d;
        far = i;
      }
    }
    if far_sq < tolerance_sq {
      out.push((a, b));
    } else {
      work.push((far, b));
      work.push((a, far));
    }
  }
  out
}

/// Simplify every branch with Douglas-Peucker at `tolerance` (physical
/// units). Tolerance 0 keeps every node; an infinite tolerance reduces each
/// branch to its root and tail.
#[tracing::instrument(skip_all, name = "refine::simplify", fields(tolerance = tolerance))]
pub fn simplify_branches(tree: &mut RootTree, tolerance: f64, scale: Scale) -> Result<SimplifyStats> {
  if tolerance.is_nan() || tolerance < 0.0 {
    return Err(SkeletonError::invalid(
      "tolerance",
      format!("must be non-negative, got {tolerance}"),
    ));
  }
  let tolerance_sq = tolerance * tolerance;
  let mut stats = SimplifyStats::default();

  // Deleting interior nodes keeps every structural point, so each branch can
  // be re-taken from its tail after the others were edited.
  let tails: Vec<_> = tree.branches().iter().map(Branch::tail).collect();
  for tail in tails {
    let mut branch = Branch::from_tail(tree, tail)?;
    let path = branch.path(tree)?;
    let points = branch.points(tree, scale)?;
    stats.branches += 1;
    for (a, b) in collapsed_segments(&points, tolerance_sq) {
      stats.nodes_removed += branch.delete_between(tree, path[b - 1], path[a + 1])?;
      stats.segments_collapsed += 1;
    }
  }
  tracing::debug!(
    branches = stats.branches,
    segments = stats.segments_collapsed,
    nodes = stats.nodes_removed,
    "simplified branches"
  );
  Ok(stats)
}

#[cfg(test)]
#[path = "simplify_test.rs"]
mod simplify_test;
