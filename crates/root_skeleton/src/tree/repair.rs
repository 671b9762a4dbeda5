//! Radius and label clean-up after extraction.

use super::{NodeId, RootTree};

/// Radii at or below this are treated as unreliable.
pub const UNRELIABLE_RADIUS: f32 = 1.5;

impl RootTree {
  /// Re-estimate unreliable radii along thin runs.
  ///
  /// An inner node with radius at most [`UNRELIABLE_RADIUS`] that is the
  /// `k`-th unreliable node below the last reliable ancestor (radius `r`)
  /// gets `k/(k+1) * next + 1/(k+1) * r`, where `next` is the repaired
  /// radius of its first child. Leaves keep their radius.
  pub fn repair_radius(&mut self) {
    let order: Vec<NodeId> = self.depth_first().collect();
    let Some(root) = self.get(self.root) else {
      return;
    };

    // top-down: last reliable radius and run position for every node
    let mut context = vec![(0.0f32, 0u32); self.slots.len()];
    context[self.root.index()] = (root.radius, 0);
    for &id in &order {
      let Some(node) = self.get(id) else { continue };
      let (last, run) = context[id.index()];
      let child_context = if !node.is_leaf() && node.radius <= UNRELIABLE_RADIUS {
        (last, run + 1)
      } else {
        (node.radius, 0)
      };
      for &child in node.children() {
        context[child.index()] = child_context;
      }
    }

    // bottom-up: first child is repaired before its parent
    for &id in order.iter().rev() {
      let next = match self.get(id) {
        Some(node) if !node.is_leaf() && node.radius <= UNRELIABLE_RADIUS => {
          self.get(node.children()[0]).map(|c| c.radius)
        }
        _ => None,
      };
      if let (Some(next), Some(node)) = (next, self.get_mut(id)) {
        let (last, run) = context[id.index()];
        let k = run as f32;
        node.radius = k / (k + 1.0) * next + last / (k + 1.0);
      }
    }
  }

  /// Raise leaf radii that fall below their parent's radius.
  pub fn repair_tips(&mut self) {
    for leaf in self.leaves() {
      let parent_radius = self
        .get(leaf)
        .and_then(|n| n.parent())
        .and_then(|p| self.get(p))
        .map(|p| p.radius);
      if let (Some(parent_radius), Some(node)) = (parent_radius, self.get_mut(leaf)) {
        if node.radius < parent_radius {
          node.radius = parent_radius;
        }
      }
    }
  }

  /// Relabel branches depth-first starting at 1. The label advances after
  /// every leaf, so each root-to-leaf path segment gets its own id.
  pub fn evaluate_branch_ids(&mut self) {
    let order: Vec<NodeId> = self.depth_first().collect();
    let mut id = 1;
    for node_id in order {
      if let Some(node) = self.get_mut(node_id) {
        node.branch_id = id;
        if node.is_leaf() {
          id += 1;
        }
      }
    }
  }
}

#[cfg(test)]
#[path = "repair_test.rs"]
mod repair_test;
