//! Path-compressed branch view over a [`RootTree`].
//!
//! A branch is a maximal run of single-child nodes hanging below a
//! structural point:
//!
//! ```text
//!   root (>= 2 children, or the tree root)   not part of the branch
//!     |
//!   start                                    \
//!     |                                       | nodes of the branch,
//!    ...   every node here has one child      | tail first when iterated
//!     |                                       |
//!   tail (leaf, or >= 2 children)            /
//! ```
//!
//! A branch remembers the tree revision it was taken at. Edits made through
//! the branch keep it current; any other structural edit makes it stale and
//! further use fails with [`SkeletonError::StaleBranch`].

use glam::DVec3;

use super::{NodeId, RootTree};
use crate::error::{Result, SkeletonError};
use crate::grid::Scale;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Branch {
  root: NodeId,
  start: NodeId,
  tail: NodeId,
  len: usize,
  revision: u64,
}

impl Branch {
  /// Branch ending at `tail`, found by walking up while the parent has a
  /// single child.
  pub fn from_tail(tree: &RootTree, tail: NodeId) -> Result<Self> {
    tree.node(tail)?;
    let mut cur = tail;
    let mut len = 1;
    loop {
      let parent = tree
        .node(cur)?
        .parent()
        .ok_or(SkeletonError::NotInBranch(cur))?;
      let parent_node = tree.node(parent)?;
      if parent == tree.root() || parent_node.rank() != 1 {
        return Ok(Self {
          root: parent,
          start: cur,
          tail,
          len,
          revision: tree.revision(),
        });
      }
      cur = parent;
      len += 1;
    }
  }

  /// Structural point the branch hangs from.
  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  /// First node below the root.
  #[inline]
  pub fn start(&self) -> NodeId {
    self.start
  }

  #[inline]
  pub fn tail(&self) -> NodeId {
    self.tail
  }

  /// Nodes in the branch, excluding its root.
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn is_current(&self, tree: &RootTree) -> bool {
    self.revision == tree.revision()
  }

  fn ensure_current(&self, tree: &RootTree) -> Result<()> {
    if !self.is_current(tree) {
      return Err(SkeletonError::StaleBranch);
    }
    Ok(())
  }

  pub fn is_leaf(&self, tree: &RootTree) -> bool {
    tree.get(self.tail).is_some_and(|n| n.is_leaf())
  }

  /// Node ids from the tail up to the start.
  pub fn nodes(&self, tree: &RootTree) -> Result<Vec<NodeId>> {
    self.ensure_current(tree)?;
    let mut out = Vec::with_capacity(self.len);
    let mut cur = self.tail;
    for _ in 0..self.len {
      out.push(cur);
      if let Some(parent) = tree.node(cur)?.parent() {
        cur = parent;
      }
    }
    Ok(out)
  }

  /// Node ids from the root down to the tail, root included.
  pub fn path(&self, tree: &RootTree) -> Result<Vec<NodeId>> {
    let mut path = self.nodes(tree)?;
    path.push(self.root);
    path.reverse();
    Ok(path)
  }

  /// Physical positions from the root down to the tail.
  pub fn points(&self, tree: &RootTree, scale: Scale) -> Result<Vec<DVec3>> {
    self
      .path(tree)?
      .into_iter()
      .map(|id| tree.node(id).map(|n| scale.apply(n.pos)))
      .collect()
  }

  /// Euclidean length from the root to the tail.
  pub fn length(&self, tree: &RootTree, scale: Scale) -> Result<f64> {
    let points = self.points(tree, scale)?;
    Ok(points.windows(2).map(|w| w[0].distance(w[1])).sum())
  }

  /// Radius averaged over the branch, each segment weighted by its length.
  ///
  /// A branch of zero length reports the tail radius.
  pub fn mean_radius(&self, tree: &RootTree, scale: Scale) -> Result<f64> {
    let path = self.path(tree)?;
    let mut total = 0.0;
    let mut weighted = 0.0;
    for pair in path.windows(2) {
      let a = tree.node(pair[0])?;
      let b = tree.node(pair[1])?;
      let length = scale.apply(b.pos - a.pos).length();
      total += length;
      weighted += length * 0.5 * (f64::from(a.radius) + f64::from(b.radius));
    }
    if total > 0.0 {
      Ok(weighted / total)
    } else {
      Ok(f64::from(tree.node(self.tail)?.radius))
    }
  }

  /// Remove one interior node, linking its child to its parent.
  pub fn delete_node(&mut self, tree: &mut RootTree, id: NodeId) -> Result<()> {
    self.delete_between(tree, id, id).map(|_| ())
  }

  /// Remove the run from `lower` up to `upper` (inclusive), where `upper` is
  /// an ancestor of `lower` inside this branch.
  ///
  /// The child of `lower` is relinked into the slot `upper` held under its
  /// parent. Neither the branch root nor the tail may be part of the run.
  /// On error the tree is left unchanged.
  pub fn delete_between(&mut self, tree: &mut RootTree, lower: NodeId, upper: NodeId) -> Result<usize> {
    self.ensure_current(tree)?;
    for id in [lower, upper] {
      if id == self.root {
        return Err(SkeletonError::BranchRootDeletion(id));
      }
      if id == self.tail {
        return Err(SkeletonError::BranchTailDeletion(id));
      }
    }
    let nodes = self.nodes(tree)?;
    let lower_at = nodes
      .iter()
      .position(|&n| n == lower)
      .ok_or(SkeletonError::NotInBranch(lower))?;
    let upper_at = nodes
      .iter()
      .position(|&n| n == upper)
      .ok_or(SkeletonError::NotInBranch(upper))?;
    if upper_at < lower_at {
      return Err(SkeletonError::NotInBranch(upper));
    }

    // lower is not the tail, so the node before it in tail-first order is its only child
    let child = nodes[lower_at - 1];
    let parent = tree
      .node(upper)?
      .parent()
      .ok_or(SkeletonError::BranchRootDeletion(upper))?;

    let parent_node = tree.node_mut(parent)?;
    for slot in parent_node.children.iter_mut() {
      if *slot == upper {
        *slot = child;
      }
    }
    tree.node_mut(child)?.parent = Some(parent);
    let removed = &nodes[lower_at..=upper_at];
    for &id in removed {
      tree.free_node(id);
    }
    tree.revision += 1;

    if upper == self.start {
      self.start = child;
    }
    self.len -= removed.len();
    self.revision = tree.revision();
    Ok(removed.len())
  }

  /// Detach the whole branch from its root and free it.
  ///
  /// Only allowed when the tail is a leaf.
  pub fn delete_leaf_branch(self, tree: &mut RootTree) -> Result<usize> {
    self.ensure_current(tree)?;
    if !self.is_leaf(tree) {
      return Err(SkeletonError::NotALeafBranch(self.tail));
    }
    tree.remove_subtree(self.start)
  }
}

impl RootTree {
  /// Decompose the tree into branches in depth-first order.
  ///
  /// Every node except the tree root lies in exactly one branch, and every
  /// leaf or branch point is the tail of one.
  pub fn branches(&self) -> Vec<Branch> {
    let mut out = Vec::new();
    let Some(root) = self.get(self.root) else {
      return out;
    };
    let mut stack: Vec<(NodeId, NodeId)> = root.children().iter().rev().map(|&c| (self.root, c)).collect();
    while let Some((branch_root, start)) = stack.pop() {
      let mut tail = start;
      let mut len = 1;
      while let Some(node) = self.get(tail) {
        if node.rank() != 1 {
          break;
        }
        tail = node.children()[0];
        len += 1;
      }
      out.push(Branch {
        root: branch_root,
        start,
        tail,
        len,
        revision: self.revision,
      });
      if let Some(node) = self.get(tail) {
        stack.extend(node.children().iter().rev().map(|&c| (tail, c)));
      }
    }
    out
  }
}

#[cfg(test)]
#[path = "branch_test.rs"]
mod branch_test;
