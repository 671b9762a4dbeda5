//! Rooted skeleton tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`] handles. A parent
//! owns the handles of its children and each child keeps a plain handle back
//! to its parent:
//!
//! ```text
//!          root
//!         /    \
//!        a      d          slots: [root, a, b, c, d, e, -, ...]
//!        |     / \                  freed slots stay empty, handles
//!        b    e   f                 are never handed out twice
//!        |
//!        c
//! ```
//!
//! Traversals use explicit stacks, so deep chains of single-child nodes (the
//! common shape of a root skeleton) cannot overflow the call stack.

mod branch;
mod repair;
mod transform;

use std::fmt;

use glam::{DVec3, IVec3};
use smallvec::SmallVec;

use crate::error::{Result, SkeletonError};

pub use branch::Branch;
pub use repair::UNRELIABLE_RADIUS;
pub use transform::euler_rotation;

/// Stable handle of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Skeleton node.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
  /// Voxel position.
  pub pos: IVec3,
  /// Local root radius estimate in voxels.
  pub radius: f32,
  /// Branch label (order of extraction, or depth-first after relabeling).
  pub branch_id: u32,
  parent: Option<NodeId>,
  children: SmallVec<[NodeId; 2]>,
}

impl TreeNode {
  fn new(pos: IVec3, radius: f32, branch_id: u32, parent: Option<NodeId>) -> Self {
    Self {
      pos,
      radius,
      branch_id,
      parent,
      children: SmallVec::new(),
    }
  }

  #[inline]
  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  #[inline]
  pub fn children(&self) -> &[NodeId] {
    &self.children
  }

  /// Number of children.
  #[inline]
  pub fn rank(&self) -> usize {
    self.children.len()
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }
}

/// One node as seen by an external serializer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeRecord {
  /// Depth-first sequence number, root = 0.
  pub id: usize,
  /// Sequence number of the parent.
  pub parent: Option<usize>,
  pub branch_id: u32,
  pub radius: f32,
  pub pos: IVec3,
}

/// Arena-backed rooted tree.
#[derive(Clone, Debug)]
pub struct RootTree {
  slots: Vec<Option<TreeNode>>,
  root: NodeId,
  len: usize,
  /// Bumped on every structural edit; branch views compare against it.
  revision: u64,
}

impl RootTree {
  /// Tree holding only a root node.
  pub fn new(pos: IVec3, radius: f32) -> Self {
    Self {
      slots: vec![Some(TreeNode::new(pos, radius, 0, None))],
      root: NodeId(0),
      len: 1,
      revision: 0,
    }
  }

  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  /// Live node count.
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  /// A tree always keeps its root.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline]
  pub fn revision(&self) -> u64 {
    self.revision
  }

  #[inline]
  pub fn contains(&self, id: NodeId) -> bool {
    self.get(id).is_some()
  }

  #[inline]
  pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
    self.slots.get(id.index()).and_then(Option::as_ref)
  }

  /// Mutable access to node payload. Links stay private.
  #[inline]
  pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
    self.slots.get_mut(id.index()).and_then(Option::as_mut)
  }

  /// Like [`RootTree::get`] but fails with [`SkeletonError::UnknownNode`].
  #[inline]
  pub fn node(&self, id: NodeId) -> Result<&TreeNode> {
    self.get(id).ok_or(SkeletonError::UnknownNode(id))
  }

  #[inline]
  pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode> {
    self.get_mut(id).ok_or(SkeletonError::UnknownNode(id))
  }

  /// Append a child to `parent`.
  pub fn insert(&mut self, parent: NodeId, pos: IVec3, radius: f32, branch_id: u32) -> Result<NodeId> {
    self.node(parent)?;
    let id = NodeId(self.slots.len() as u32);
    self.slots.push(Some(TreeNode::new(pos, radius, branch_id, Some(parent))));
    self.node_mut(parent)?.children.push(id);
    self.len += 1;
    self.revision += 1;
    Ok(id)
  }

  /// Node ids in depth-first preorder, children left to right.
  pub fn depth_first(&self) -> DepthFirst<'_> {
    DepthFirst {
      tree: self,
      stack: vec![self.root],
    }
  }

  /// Nodes with their ids in depth-first preorder.
  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> + '_ {
    self
      .depth_first()
      .filter_map(move |id| self.get(id).map(|node| (id, node)))
  }

  pub fn leaves(&self) -> Vec<NodeId> {
    self
      .iter()
      .filter(|(_, node)| node.is_leaf())
      .map(|(id, _)| id)
      .collect()
  }

  /// Node positions in depth-first preorder.
  pub fn positions(&self) -> Vec<IVec3> {
    self.iter().map(|(_, node)| node.pos).collect()
  }

  pub fn max_radius(&self) -> f32 {
    self
      .iter()
      .map(|(_, node)| node.radius)
      .fold(f32::NEG_INFINITY, f32::max)
  }

  /// Visit every node in depth-first preorder with sequential ids.
  pub fn export(&self, mut visit: impl FnMut(NodeRecord)) {
    let mut sequence = vec![usize::MAX; self.slots.len()];
    for (seq, (id, node)) in self.iter().enumerate() {
      sequence[id.index()] = seq;
      visit(NodeRecord {
        id: seq,
        parent: node.parent.map(|p| sequence[p.index()]),
        branch_id: node.branch_id,
        radius: node.radius,
        pos: node.pos,
      });
    }
  }

  pub fn records(&self) -> Vec<NodeRecord> {
    let mut out = Vec::with_capacity(self.len);
    self.export(|record| out.push(record));
    out
  }

  /// Independent copy with compacted handles in depth-first order.
  pub fn deep_copy(&self) -> RootTree {
    let mut remap = vec![NodeId(u32::MAX); self.slots.len()];
    let mut slots: Vec<Option<TreeNode>> = Vec::with_capacity(self.len);
    for (id, node) in self.iter() {
      let new_id = NodeId(slots.len() as u32);
      remap[id.index()] = new_id;
      let parent = node.parent.map(|p| remap[p.index()]);
      if let Some(p) = parent {
        if let Some(Some(parent_node)) = slots.get_mut(p.index()) {
          parent_node.children.push(new_id);
        }
      }
      slots.push(Some(TreeNode::new(node.pos, node.radius, node.branch_id, parent)));
    }
    RootTree {
      len: slots.len(),
      slots,
      root: NodeId(0),
      revision: 0,
    }
  }

  /// Detach `id` from its parent and free it with all descendants.
  ///
  /// The root cannot be removed.
  pub fn remove_subtree(&mut self, id: NodeId) -> Result<usize> {
    let parent = self.node(id)?.parent.ok_or(SkeletonError::BranchRootDeletion(id))?;
    self.node_mut(parent)?.children.retain(|c| *c != id);
    Ok(self.free_subtree(id))
  }

  /// Free `id` and everything below it. Links into the subtree from outside
  /// must already be cut.
  fn free_subtree(&mut self, id: NodeId) -> usize {
    let mut stack = vec![id];
    let mut freed = 0;
    while let Some(cur) = stack.pop() {
      if let Some(node) = self.slots.get_mut(cur.index()).and_then(Option::take) {
        stack.extend(node.children.iter().copied());
        freed += 1;
      }
    }
    self.len -= freed;
    self.revision += 1;
    freed
  }

  /// Free a single node whose links have been rewired already.
  fn free_node(&mut self, id: NodeId) {
    if let Some(slot) = self.slots.get_mut(id.index()) {
      if slot.take().is_some() {
        self.len -= 1;
      }
    }
  }

  /// Sample each edge every `max_dist` units.
  ///
  /// The first list holds the root; every following list covers one edge in
  /// depth-first order, excluding its parent end and ending at the child.
  pub fn dense_points(&self, max_dist: f64) -> Vec<Vec<DVec3>> {
    let Some(root) = self.get(self.root) else {
      return Vec::new();
    };
    let mut out = vec![vec![root.pos.as_dvec3()]];
    for (_, node) in self.iter() {
      let Some(parent) = node.parent.and_then(|p| self.get(p)) else {
        continue;
      };
      let from = parent.pos.as_dvec3();
      let to = node.pos.as_dvec3();
      let length = from.distance(to);
      let mut segment = Vec::new();
      if max_dist > 0.0 && length > 0.0 {
        let dir = (to - from) / length;
        let mut t = max_dist;
        while t < length {
          segment.push(from + dir * t);
          t += max_dist;
        }
      }
      segment.push(to);
      out.push(segment);
    }
    out
  }
}

/// Depth-first preorder iterator over node ids.
pub struct DepthFirst<'a> {
  tree: &'a RootTree,
  stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    loop {
      let id = self.stack.pop()?;
      if let Some(node) = self.tree.get(id) {
        self.stack.extend(node.children.iter().rev().copied());
        return Some(id);
      }
    }
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
