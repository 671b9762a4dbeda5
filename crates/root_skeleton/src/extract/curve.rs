//! Sparse curve skeleton grown from far quench points.
//!
//! Quench points are popped highest priority first. Each one that is still
//! unclaimed grows a chain back to the tree; every new node claims a coarse
//! sphere (suppressing nearby quench points) and owns a fine sphere (so later
//! chains attach to it instead of running parallel to it).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::IVec3;

use super::{unowned_chain, CurveParams, ExtractStats, Extraction, Extractor, SeedMode, VoxelOwnerMap};
use crate::error::Result;
use crate::grid::{Scale, Shape, Volume};
use crate::raster::SphereMasks;
use crate::tree::{NodeId, RootTree};

/// Heap entry: highest priority first, lower index first on ties.
#[derive(Clone, Copy, Debug)]
struct QuenchPoint {
  priority: f64,
  index: usize,
}

impl PartialEq for QuenchPoint {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for QuenchPoint {}

impl PartialOrd for QuenchPoint {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for QuenchPoint {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .priority
      .total_cmp(&other.priority)
      .then_with(|| other.index.cmp(&self.index))
  }
}

/// Claim and owner fields painted while the tree grows.
struct Canvas {
  claimed: Volume<bool>,
  owner: VoxelOwnerMap,
  masks: SphereMasks,
  dilation: f64,
  /// Radius covering the whole volume from any voxel.
  cap: usize,
}

impl Canvas {
  fn new(shape: Shape, scale: Scale, dilation: f64) -> Self {
    let extent = scale.apply(shape.as_ivec3()).length();
    Self {
      claimed: Volume::filled(shape, false),
      owner: Volume::filled(shape, None),
      masks: SphereMasks::new(0, scale),
      dilation,
      cap: extent.ceil() as usize + 1,
    }
  }

  fn sphere_radius(&self, r: f64) -> usize {
    if r.is_nan() || r <= 0.0 {
      return 0;
    }
    (r as usize).min(self.cap)
  }

  /// Own and claim the node's own voxel.
  fn take(&mut self, id: NodeId, pos: IVec3) {
    if let Some(slot) = self.owner.get_mut(pos) {
      *slot = Some(id);
    }
    if let Some(slot) = self.claimed.get_mut(pos) {
      *slot = true;
    }
  }

  /// Claim a sphere of `coarse` and own the unowned voxels within `fine`.
  fn paint(&mut self, id: NodeId, pos: IVec3, coarse: f64, fine: f64) {
    let shape = self.claimed.shape();
    let coarse = self.sphere_radius(coarse);
    let fine = self.sphere_radius(fine);
    let claimed = &mut self.claimed;
    self.masks.for_each(shape, pos, coarse, |p| claimed[p] = true);
    let owner = &mut self.owner;
    self.masks.for_each(shape, pos, fine, |p| {
      if owner[p].is_none() {
        owner[p] = Some(id);
      }
    });
  }

  /// Paint a node created by this extraction.
  fn paint_new(&mut self, id: NodeId, pos: IVec3, radius: f32) {
    let r = f64::from(radius);
    self.paint(id, pos, (r * self.dilation).ceil(), r.floor());
  }

  /// Paint every node of a copied tree before the scan starts.
  fn paint_prior(&mut self, tree: &RootTree) {
    for (id, node) in tree.iter() {
      self.take(id, node.pos);
    }
    for (id, node) in tree.iter() {
      let r = f64::from(node.radius);
      self.paint(id, node.pos, (r * self.dilation).ceil(), (r / 2.0 * self.dilation).ceil());
    }
  }

  #[inline]
  fn is_claimed(&self, index: usize) -> bool {
    self.claimed.as_slice()[index]
  }
}

/// Radius sample, clamped to be non-negative.
#[inline]
fn sample(radius: &Volume<f32>, pos: IVec3) -> f32 {
  radius.value(pos).unwrap_or(0.0).max(0.0)
}

pub(super) fn run(ctx: &Extractor<'_>, seed: IVec3, params: &CurveParams<'_>) -> Result<Extraction> {
  let shape = ctx.volume.shape();
  let mut canvas = Canvas::new(shape, params.scale, params.dilation());
  let mut stats = ExtractStats::default();

  let mut tree = match params.seed_mode {
    SeedMode::Extend(prior) => {
      let tree = prior.deep_copy();
      canvas.paint_prior(&tree);
      tree
    }
    SeedMode::Fresh | SeedMode::FromLeaves(_) => {
      let tree = RootTree::new(seed, sample(params.radius, seed));
      canvas.take(tree.root(), seed);
      tree
    }
  };

  let mut heap = match params.seed_mode {
    SeedMode::FromLeaves(prior) => leaf_quench_points(ctx, params.radius, prior, &canvas),
    SeedMode::Fresh | SeedMode::Extend(_) => scan_quench_points(ctx, seed, params),
  };
  stats.candidates = heap.len();
  tracing::debug!(quench_points = heap.len(), "quench points collected");

  let mut branch_id = 0;
  while let Some(point) = heap.pop() {
    if canvas.is_claimed(point.index) {
      continue;
    }
    let pos = shape.coord(point.index);
    if ctx.paths.predecessor(pos).is_none() {
      continue;
    }
    let Some((mut parent, chain)) = unowned_chain(ctx.paths, &canvas.owner, pos)? else {
      stats.dead_ends += 1;
      continue;
    };
    if chain.is_empty() {
      continue;
    }
    branch_id += 1;
    for &voxel in chain.iter().rev() {
      let r = sample(params.radius, voxel);
      parent = tree.insert(parent, voxel, r, branch_id)?;
      canvas.take(parent, voxel);
      canvas.paint_new(parent, voxel, r);
    }
    stats.nodes_created += chain.len();
    stats.chains += 1;
  }

  Ok(Extraction {
    tree,
    mask: canvas.claimed,
    stats,
  })
}

/// Voxels inside the scan box with enough combined intensity, far enough from
/// the seed and with a predecessor. Priority is the squared distance.
fn scan_quench_points(ctx: &Extractor<'_>, seed: IVec3, params: &CurveParams<'_>) -> BinaryHeap<QuenchPoint> {
  let _span = tracing::debug_span!("quench_scan").entered();
  let shape = ctx.volume.shape();
  let (lo, hi) = match params.axis_cut {
    Some(cut) => cut.bounds(shape),
    None => (IVec3::ZERO, shape.as_ivec3()),
  };
  let min_sq = params.min_distance * params.min_distance;
  let plane = shape.slab_len();

  ctx
    .dispatcher
    .map_slabs(ctx.volume, |z, slab| {
      let mut found = Vec::new();
      let zi = z as i32;
      if zi < lo.z || zi >= hi.z {
        return found;
      }
      for y in lo.y..hi.y {
        for x in lo.x..hi.x {
          let i = y as usize * shape.x + x as usize;
          if slab[i] < params.min_combined {
            continue;
          }
          let pos = IVec3::new(x, y, zi);
          let priority = params.scale.distance_squared(seed, pos);
          if priority > min_sq && ctx.paths.predecessor(pos).is_some() {
            found.push(QuenchPoint {
              priority,
              index: z * plane + i,
            });
          }
        }
      }
      found
    })
    .into_iter()
    .flatten()
    .collect()
}

/// Leaves of a prior tree ranked by how much unexplored root lies behind
/// them: mean radius (radii above 1) plus length of the unclaimed predecessor
/// path, plus the depth below the top of the volume.
fn leaf_quench_points(
  ctx: &Extractor<'_>,
  radius: &Volume<f32>,
  prior: &RootTree,
  canvas: &Canvas,
) -> BinaryHeap<QuenchPoint> {
  let shape = ctx.volume.shape();
  let limit = shape.len();
  let mut heap = BinaryHeap::new();
  for leaf in prior.leaves() {
    let Some(pos) = prior.get(leaf).map(|n| n.pos) else {
      continue;
    };
    let Some(index) = shape.index(pos) else {
      continue;
    };
    let mut length = 0usize;
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut cur = pos;
    while length < limit {
      length += 1;
      let Some(next) = ctx.paths.predecessor(cur) else {
        break;
      };
      if canvas.claimed.value(cur).unwrap_or(true) {
        break;
      }
      let r = f64::from(sample(radius, cur));
      if r > 1.0 {
        sum += r;
        count += 1;
      }
      cur = next;
    }
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
    let depth = (shape.z as i64 - i64::from(pos.z)) as f64;
    heap.push(QuenchPoint {
      priority: mean + length as f64 + depth,
      index,
    });
  }
  heap
}

#[cfg(test)]
#[path = "curve_test.rs"]
mod curve_test;
