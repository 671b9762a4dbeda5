//! Turn solver output into an explicit [`RootTree`].
//!
//! Both modes share one primitive: walk the predecessor chain of a voxel up
//! to the first voxel already owned by a tree node, then create nodes for
//! the unowned part from the top down.
//!
//! ```text
//!   owned by node N
//!        |
//!   [o]--[ ]--[ ]--[ ]--[q]      q: voxel being materialized
//!         \_______________/
//!          new nodes, parent first, hung below N
//! ```
//!
//! A chain that runs out of predecessors before reaching an owned voxel is a
//! dead end and creates nothing. The owner map guarantees that a voxel is
//! claimed by at most one node.
//!
//! - [`ExtractMode::Exhaustive`]: every voxel above an intensity threshold
//!   becomes a node.
//! - [`ExtractMode::CurveSkeleton`]: sparse extraction from far quench
//!   points, with spheres around each node suppressing nearby quench points.

mod curve;
mod exhaustive;

use glam::IVec3;
use web_time::Instant;

use crate::error::{Result, SkeletonError};
use crate::grid::{Scale, Shape, SlabDispatcher, Volume};
use crate::solver::ShortestPaths;
use crate::tree::{NodeId, RootTree};

/// Map from voxel to the tree node that claimed it.
pub type VoxelOwnerMap = Volume<Option<NodeId>>;

/// Restricts the quench point scan to part of the volume.
///
/// `Min*(n)` skips the first `n` planes along the axis, `Max*(n)` the last.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisCut {
  MinX(usize),
  MaxX(usize),
  MinY(usize),
  MaxY(usize),
  MinZ(usize),
  MaxZ(usize),
}

impl AxisCut {
  /// Scan box of `shape` after the cut, min inclusive and max exclusive.
  pub fn bounds(self, shape: Shape) -> (IVec3, IVec3) {
    let mut lo = [0usize; 3];
    let mut hi = [shape.x, shape.y, shape.z];
    match self {
      AxisCut::MinX(n) => lo[0] = n,
      AxisCut::MaxX(n) => hi[0] = hi[0].saturating_sub(n),
      AxisCut::MinY(n) => lo[1] = n,
      AxisCut::MaxY(n) => hi[1] = hi[1].saturating_sub(n),
      AxisCut::MinZ(n) => lo[2] = n,
      AxisCut::MaxZ(n) => hi[2] = hi[2].saturating_sub(n),
    }
    let lo = IVec3::new(lo[0] as i32, lo[1] as i32, lo[2] as i32);
    let hi = IVec3::new(hi[0] as i32, hi[1] as i32, hi[2] as i32);
    (lo.min(hi), hi)
  }

  /// Id used by configuration files: 0..=5 for MinX, MaxX, .., MaxZ.
  pub fn from_axis(axis: u8, planes: usize) -> Option<Self> {
    Some(match axis {
      0 => AxisCut::MinX(planes),
      1 => AxisCut::MaxX(planes),
      2 => AxisCut::MinY(planes),
      3 => AxisCut::MaxY(planes),
      4 => AxisCut::MinZ(planes),
      5 => AxisCut::MaxZ(planes),
      _ => return None,
    })
  }
}

/// Where the curve skeleton starts from.
#[derive(Clone, Copy, Debug, Default)]
pub enum SeedMode<'a> {
  /// New tree holding only the seed.
  #[default]
  Fresh,
  /// Copy of a prior tree; its nodes claim their surroundings before any
  /// quench point is picked.
  Extend(&'a RootTree),
  /// New tree, but the quench points are the leaves of a prior tree.
  FromLeaves(&'a RootTree),
}

/// Parameters of the exhaustive mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExhaustiveParams {
  /// Minimum intensity of a voxel to become a node.
  pub threshold: f32,
  /// Maximum path cost of a voxel to become a node.
  pub cutoff: f32,
  /// Radius given to every node.
  pub radius: f32,
}

impl Default for ExhaustiveParams {
  fn default() -> Self {
    Self {
      threshold: 0.0,
      cutoff: f32::INFINITY,
      radius: 1.0,
    }
  }
}

/// Parameters of the curve skeleton mode.
#[derive(Clone, Copy, Debug)]
pub struct CurveParams<'a> {
  /// Local radius per voxel, sampled into node radii.
  pub radius: &'a Volume<f32>,
  /// Minimum combined intensity of a quench point.
  pub min_combined: f32,
  /// Quench points must lie farther than this from the seed.
  pub min_distance: f64,
  /// Claim spheres are `1 + dilation_percent / 100` times the node radius.
  pub dilation_percent: f64,
  pub scale: Scale,
  pub axis_cut: Option<AxisCut>,
  pub seed_mode: SeedMode<'a>,
}

impl<'a> CurveParams<'a> {
  pub fn new(radius: &'a Volume<f32>) -> Self {
    Self {
      radius,
      min_combined: 20.0,
      min_distance: 0.0,
      dilation_percent: 200.0,
      scale: Scale::UNIT,
      axis_cut: None,
      seed_mode: SeedMode::Fresh,
    }
  }

  pub fn with_min_combined(mut self, min_combined: f32) -> Self {
    self.min_combined = min_combined;
    self
  }

  pub fn with_min_distance(mut self, min_distance: f64) -> Self {
    self.min_distance = min_distance;
    self
  }

  pub fn with_dilation_percent(mut self, dilation_percent: f64) -> Self {
    self.dilation_percent = dilation_percent;
    self
  }

  pub fn with_scale(mut self, scale: Scale) -> Self {
    self.scale = scale;
    self
  }

  pub fn with_axis_cut(mut self, axis_cut: Option<AxisCut>) -> Self {
    self.axis_cut = axis_cut;
    self
  }

  pub fn with_seed_mode(mut self, seed_mode: SeedMode<'a>) -> Self {
    self.seed_mode = seed_mode;
    self
  }

  #[inline]
  pub(crate) fn dilation(&self) -> f64 {
    1.0 + self.dilation_percent / 100.0
  }
}

#[derive(Clone, Copy, Debug)]
pub enum ExtractMode<'a> {
  Exhaustive(ExhaustiveParams),
  CurveSkeleton(CurveParams<'a>),
}

/// Counters collected during one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
  /// Tree nodes created, excluding copied ones.
  pub nodes_created: usize,
  /// Voxels considered as chain starts.
  pub candidates: usize,
  /// Chains that created at least one node.
  pub chains: usize,
  /// Chains that ended without reaching an owned voxel.
  pub dead_ends: usize,
  /// Wall time in microseconds.
  pub total_us: u64,
}

/// Tree plus statistics of one extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
  pub tree: RootTree,
  /// Voxels taken by the extraction: node voxels in exhaustive mode, node
  /// voxels plus their claim spheres in curve mode.
  pub mask: Volume<bool>,
  pub stats: ExtractStats,
}

/// Build a tree rooted at `seed` from the predecessor fields in `paths`.
///
/// `volume` is the intensity thresholded by the mode: the cost volume in
/// exhaustive mode, the combined quench volume in curve mode.
pub fn extract(volume: &Volume<f32>, paths: &ShortestPaths, seed: IVec3, mode: ExtractMode<'_>) -> Result<RootTree> {
  Extractor::new(volume, paths)
    .run(seed, mode)
    .map(|extraction| extraction.tree)
}

/// Extraction over one volume and solve result.
#[derive(Clone, Debug)]
pub struct Extractor<'a> {
  volume: &'a Volume<f32>,
  paths: &'a ShortestPaths,
  dispatcher: SlabDispatcher,
}

impl<'a> Extractor<'a> {
  pub fn new(volume: &'a Volume<f32>, paths: &'a ShortestPaths) -> Self {
    Self {
      volume,
      paths,
      dispatcher: SlabDispatcher::default(),
    }
  }

  /// Dispatcher used for the voxel scans.
  pub fn with_dispatcher(mut self, dispatcher: SlabDispatcher) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  #[tracing::instrument(skip_all, name = "extract::run", fields(seed = %seed))]
  pub fn run(&self, seed: IVec3, mode: ExtractMode<'_>) -> Result<Extraction> {
    self.validate(seed, &mode)?;
    let start = Instant::now();
    let mut extraction = match mode {
      ExtractMode::Exhaustive(params) => exhaustive::run(self, seed, &params)?,
      ExtractMode::CurveSkeleton(params) => curve::run(self, seed, &params)?,
    };
    extraction.stats.total_us = start.elapsed().as_micros() as u64;
    let stats = extraction.stats;
    tracing::debug!(
      nodes = extraction.tree.len(),
      created = stats.nodes_created,
      candidates = stats.candidates,
      chains = stats.chains,
      dead_ends = stats.dead_ends,
      total_us = stats.total_us,
      "extraction finished"
    );
    Ok(extraction)
  }

  fn validate(&self, seed: IVec3, mode: &ExtractMode<'_>) -> Result<()> {
    self.volume.ensure_same_shape(&self.paths.cost)?;
    let shape = self.volume.shape();
    if !shape.contains(seed) {
      return Err(SkeletonError::SeedOutOfBounds { seed, shape });
    }
    if seed != self.paths.seed() {
      return Err(SkeletonError::invalid(
        "seed",
        format!("paths were solved from {}, not {seed}", self.paths.seed()),
      ));
    }
    match mode {
      ExtractMode::Exhaustive(params) => {
        if params.threshold.is_nan() || params.cutoff.is_nan() {
          return Err(SkeletonError::invalid("threshold", "threshold and cutoff must not be NaN"));
        }
        if !params.radius.is_finite() || params.radius < 0.0 {
          return Err(SkeletonError::invalid(
            "radius",
            format!("must be finite and non-negative, got {}", params.radius),
          ));
        }
      }
      ExtractMode::CurveSkeleton(params) => {
        self.volume.ensure_same_shape(params.radius)?;
        if params.min_combined.is_nan() {
          return Err(SkeletonError::invalid("min_combined", "must not be NaN"));
        }
        if !params.min_distance.is_finite() || params.min_distance < 0.0 {
          return Err(SkeletonError::invalid(
            "min_distance",
            format!("must be finite and non-negative, got {}", params.min_distance),
          ));
        }
        if !params.dilation_percent.is_finite() || params.dilation_percent < 0.0 {
          return Err(SkeletonError::invalid(
            "dilation_percent",
            format!("must be finite and non-negative, got {}", params.dilation_percent),
          ));
        }
      }
    }
    Ok(())
  }
}

/// Unowned part of the predecessor chain of `pos`.
///
/// Returns the owning node the chain hangs from and the unowned voxels, `pos`
/// first. `None` for a dead end.
pub(crate) fn unowned_chain(
  paths: &ShortestPaths,
  owner: &VoxelOwnerMap,
  pos: IVec3,
) -> Result<Option<(NodeId, Vec<IVec3>)>> {
  let limit = owner.len();
  let mut chain = Vec::new();
  let mut cur = pos;
  loop {
    if let Some(id) = owner.value(cur).flatten() {
      return Ok(Some((id, chain)));
    }
    if chain.len() >= limit {
      return Err(SkeletonError::MalformedPredecessors { start: pos });
    }
    chain.push(cur);
    match paths.predecessor(cur) {
      Some(next) => cur = next,
      None => return Ok(None),
    }
  }
}
