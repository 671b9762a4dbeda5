//! Min-priority frontier with lazy deletion.
//!
//! Improving a voxel pushes a fresh entry instead of decreasing the key of
//! the old one; stale entries are discarded when popped because their voxel
//! is already finalized.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Queued voxel keyed by tentative cost.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FrontierEntry {
  pub cost: f32,
  pub index: usize,
}

impl PartialEq for FrontierEntry {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for FrontierEntry {
  /// Reversed so the max-heap pops the cheapest entry, equal costs in
  /// ascending linear index.
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .cost
      .total_cmp(&self.cost)
      .then_with(|| other.index.cmp(&self.index))
  }
}

#[derive(Debug, Default)]
pub(crate) struct Frontier {
  heap: BinaryHeap<FrontierEntry>,
  pushed: usize,
}

impl Frontier {
  #[inline]
  pub fn push(&mut self, cost: f32, index: usize) {
    self.pushed += 1;
    self.heap.push(FrontierEntry { cost, index });
  }

  #[inline]
  pub fn pop(&mut self) -> Option<FrontierEntry> {
    self.heap.pop()
  }

  /// Entries pushed over the lifetime of the frontier.
  #[inline]
  pub fn pushed(&self) -> usize {
    self.pushed
  }
}
