//! Single-source shortest paths over the voxel grid.
//!
//! Every voxel moves through three states:
//!
//! ```text
//!   UNVISITED --relax--> QUEUED --pop--> FINALIZED
//!                          ^  |
//!                          +--+  improved again: pushed once more,
//!                                the older entry is skipped when popped
//! ```
//!
//! Relaxing `u -> v` offers `cost[u] + intensity(v) * weight` to `v`. The
//! best and second-best offers are both kept per voxel; only an improvement
//! of the best re-queues the voxel. Offers above the cutoff are dropped, and
//! a finalized voxel is never relaxed again.
//!
//! # Variants
//!
//! - [`Variant::Plain`]: weight is the physical step length.
//! - [`Variant::DirectionPenalty`]: the weight is scaled by a turn penalty
//!   plus a term for stepping against the radius gradient.
//! - [`Variant::GapClosing`]: bounded runs of expensive voxels are bridged
//!   and re-priced once the path lands on a cheap voxel again.
//!
//! Equal costs pop in ascending linear index, which makes every run
//! deterministic.

mod gap;
mod queue;

use glam::{DVec3, IVec3};
use web_time::Instant;

use crate::error::{Result, SkeletonError};
use crate::grid::{Scale, Shape, SlabDispatcher, Volume};
use crate::neighborhood::{Connectivity, DirectionCode, Neighborhood};

use gap::GapState;
use queue::Frontier;

/// Predecessor code plus the visited flag of a voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PredCell {
  pub code: DirectionCode,
  pub finalized: bool,
}

/// Edge weighting of the search.
#[derive(Clone, Copy, Debug, Default)]
pub enum Variant<'a> {
  #[default]
  Plain,
  /// Scale each step by `turn + slope`.
  ///
  /// `turn` is `penalty` when the step reverses the direction the source was
  /// reached from, else 1. `slope` is `|min(0, grad r . d)|` for the
  /// central-difference gradient of `radius` at the source and the step
  /// direction `d` pointing back at it.
  DirectionPenalty { radius: &'a Volume<f32>, penalty: f64 },
  /// Voxels with intensity at or above `cost_fraction * max(intensity)` are
  /// gap voxels. A path may cross at most `max_gap_length` physical units of
  /// consecutive gap voxels.
  GapClosing {
    cost_fraction: f64,
    max_gap_length: f64,
  },
}

/// Counters collected during one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
  /// Voxels finalized.
  pub finalized: usize,
  /// Frontier pushes, including re-queues.
  pub pushed: usize,
  /// Popped entries discarded because their voxel was already final.
  pub stale_pops: usize,
  /// Offers that only improved the second-best cost.
  pub second_updates: usize,
  /// Offers discarded by the cutoff.
  pub cut_off: usize,
  /// Gap runs re-priced on landing.
  pub gaps_closed: usize,
  /// Wall time in microseconds.
  pub total_us: u64,
}

/// Output of a solve: cost and predecessor fields over the whole volume.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
  pub cost: Volume<f32>,
  pub second_cost: Volume<f32>,
  pub pred: Volume<PredCell>,
  pub second_pred: Volume<DirectionCode>,
  /// Shared id per bridged run. Only set by [`Variant::GapClosing`].
  pub gap_ids: Option<Volume<Option<u32>>>,
  pub stats: SolveStats,
  seed: IVec3,
}

impl ShortestPaths {
  /// Wrap cost and predecessor maps produced elsewhere.
  ///
  /// Second-best fields are left empty and every voxel with a predecessor
  /// counts as finalized.
  pub fn from_maps(seed: IVec3, cost: Volume<f32>, pred: Volume<DirectionCode>) -> Result<Self> {
    cost.ensure_same_shape(&pred)?;
    let shape = cost.shape();
    if !shape.contains(seed) {
      return Err(SkeletonError::SeedOutOfBounds { seed, shape });
    }
    let pred = pred.map(|&code| PredCell {
      code,
      finalized: code.has_predecessor() || code.is_root(),
    });
    Ok(Self {
      second_cost: Volume::filled(shape, f32::INFINITY),
      second_pred: Volume::filled(shape, DirectionCode::NONE),
      gap_ids: None,
      stats: SolveStats::default(),
      cost,
      pred,
      seed,
    })
  }

  #[inline]
  pub fn shape(&self) -> Shape {
    self.cost.shape()
  }

  #[inline]
  pub fn seed(&self) -> IVec3 {
    self.seed
  }

  #[inline]
  pub fn cost_at(&self, pos: IVec3) -> Option<f32> {
    self.cost.value(pos)
  }

  /// Finite cost reached.
  #[inline]
  pub fn is_reachable(&self, pos: IVec3) -> bool {
    self.cost_at(pos).is_some_and(f32::is_finite)
  }

  #[inline]
  pub fn code_at(&self, pos: IVec3) -> Option<DirectionCode> {
    self.pred.get(pos).map(|cell| cell.code)
  }

  /// Decoded best predecessor of `pos`.
  pub fn predecessor(&self, pos: IVec3) -> Option<IVec3> {
    let code = self.code_at(pos)?;
    if !code.has_predecessor() {
      return None;
    }
    let target = pos + code.offset();
    self.shape().contains(target).then_some(target)
  }

  /// Voxels with a finite cost.
  pub fn reached(&self) -> usize {
    self.cost.as_slice().iter().filter(|c| c.is_finite()).count()
  }

  /// Chain from `pos` back to the seed, `pos` first and the seed last.
  ///
  /// Empty for unreached voxels. Fails when the chain leaves the seed
  /// unreached within one step per voxel.
  pub fn path_to_seed(&self, pos: IVec3) -> Result<Vec<IVec3>> {
    if !self.is_reachable(pos) {
      return Ok(Vec::new());
    }
    let mut path = vec![pos];
    let mut cur = pos;
    while cur != self.seed {
      if path.len() > self.shape().len() {
        return Err(SkeletonError::MalformedPredecessors { start: pos });
      }
      cur = self
        .predecessor(cur)
        .ok_or(SkeletonError::MalformedPredecessors { start: pos })?;
      path.push(cur);
    }
    Ok(path)
  }
}

/// Result of offering a candidate cost to a voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Offer {
  /// New best; the voxel was queued.
  Best,
  /// Only the second-best improved.
  Second,
  /// Neither improved.
  Kept,
  /// Above the cutoff.
  CutOff,
}

/// Mutable search fields shared by all variants.
pub(crate) struct SearchState {
  pub cost: Volume<f32>,
  pub second_cost: Volume<f32>,
  pub pred: Volume<PredCell>,
  pub second_pred: Volume<DirectionCode>,
  pub frontier: Frontier,
  pub stats: SolveStats,
  cutoff: f32,
}

impl SearchState {
  fn new(shape: Shape, cutoff: f32) -> Self {
    Self {
      cost: Volume::filled(shape, f32::INFINITY),
      second_cost: Volume::filled(shape, f32::INFINITY),
      pred: Volume::filled(shape, PredCell::default()),
      second_pred: Volume::filled(shape, DirectionCode::NONE),
      frontier: Frontier::default(),
      stats: SolveStats::default(),
      cutoff,
    }
  }

  /// Offer `candidate` reached through `code` to voxel `v`.
  pub fn offer(&mut self, v: usize, candidate: f64, code: DirectionCode) -> Offer {
    // NaN fails the comparison as well.
    if !(candidate <= f64::from(self.cutoff)) {
      self.stats.cut_off += 1;
      return Offer::CutOff;
    }
    let candidate = candidate as f32;
    let best = self.cost.as_slice()[v];
    if candidate < best {
      self.second_cost.as_mut_slice()[v] = best;
      self.second_pred.as_mut_slice()[v] = self.pred.as_slice()[v].code;
      self.cost.as_mut_slice()[v] = candidate;
      self.pred.as_mut_slice()[v].code = code;
      self.frontier.push(candidate, v);
      Offer::Best
    } else if candidate < self.second_cost.as_slice()[v] {
      self.second_cost.as_mut_slice()[v] = candidate;
      self.second_pred.as_mut_slice()[v] = code;
      self.stats.second_updates += 1;
      Offer::Second
    } else {
      Offer::Kept
    }
  }
}

/// Edge weighting resolved for one solve.
enum Relaxation {
  Plain,
  Direction { gradient: Volume<DVec3>, penalty: f64 },
  Gap(GapState),
}

/// Configured single-source search over one intensity volume.
///
/// ```ignore
/// let paths = ShortestPathSolver::new(&cost)
///   .with_cutoff(1e5)
///   .with_connectivity(Connectivity::TwentySix)
///   .with_direction_penalty(&radius, 2.0)
///   .solve(seed)?;
/// ```
#[derive(Clone, Debug)]
pub struct ShortestPathSolver<'a> {
  intensity: &'a Volume<f32>,
  cutoff: f32,
  scale: Scale,
  connectivity: Connectivity,
  variant: Variant<'a>,
  dispatcher: SlabDispatcher,
}

impl<'a> ShortestPathSolver<'a> {
  /// Plain 26-connected search without a cutoff.
  pub fn new(intensity: &'a Volume<f32>) -> Self {
    Self {
      intensity,
      cutoff: f32::INFINITY,
      scale: Scale::UNIT,
      connectivity: Connectivity::default(),
      variant: Variant::Plain,
      dispatcher: SlabDispatcher::default(),
    }
  }

  pub fn with_cutoff(mut self, cutoff: f32) -> Self {
    self.cutoff = cutoff;
    self
  }

  pub fn with_scale(mut self, scale: Scale) -> Self {
    self.scale = scale;
    self
  }

  pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
    self.connectivity = connectivity;
    self
  }

  pub fn with_variant(mut self, variant: Variant<'a>) -> Self {
    self.variant = variant;
    self
  }

  pub fn with_direction_penalty(self, radius: &'a Volume<f32>, penalty: f64) -> Self {
    self.with_variant(Variant::DirectionPenalty { radius, penalty })
  }

  pub fn with_gap_closing(self, cost_fraction: f64, max_gap_length: f64) -> Self {
    self.with_variant(Variant::GapClosing {
      cost_fraction,
      max_gap_length,
    })
  }

  /// Dispatcher used for the gradient precomputation.
  pub fn with_dispatcher(mut self, dispatcher: SlabDispatcher) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  fn validate(&self, seed: IVec3) -> Result<()> {
    let shape = self.intensity.shape();
    if !shape.contains(seed) {
      return Err(SkeletonError::SeedOutOfBounds { seed, shape });
    }
    if self.cutoff.is_nan() || self.cutoff < 0.0 {
      return Err(SkeletonError::invalid(
        "cutoff",
        format!("must be a non-negative number, got {}", self.cutoff),
      ));
    }
    if let Some((lo, _)) = self.intensity.min_max() {
      if lo < 0.0 {
        return Err(SkeletonError::invalid(
          "intensity",
          format!("costs must be non-negative, found {lo}"),
        ));
      }
    }
    match self.variant {
      Variant::Plain => {}
      Variant::DirectionPenalty { radius, penalty } => {
        self.intensity.ensure_same_shape(radius)?;
        if !penalty.is_finite() || penalty < 1.0 {
          return Err(SkeletonError::invalid(
            "direction_penalty",
            format!("must be finite and at least 1, got {penalty}"),
          ));
        }
      }
      Variant::GapClosing {
        cost_fraction,
        max_gap_length,
      } => {
        if !cost_fraction.is_finite() || cost_fraction < 0.0 {
          return Err(SkeletonError::invalid(
            "cost_fraction",
            format!("must be finite and non-negative, got {cost_fraction}"),
          ));
        }
        if !max_gap_length.is_finite() || max_gap_length < 0.0 {
          return Err(SkeletonError::invalid(
            "max_gap_length",
            format!("must be finite and non-negative, got {max_gap_length}"),
          ));
        }
      }
    }
    Ok(())
  }

  /// Run the search from `seed` until the frontier is empty.
  #[tracing::instrument(skip_all, name = "solver::solve", fields(seed = %seed))]
  pub fn solve(&self, seed: IVec3) -> Result<ShortestPaths> {
    self.validate(seed)?;
    let start = Instant::now();
    let shape = self.intensity.shape();
    let neighborhood = Neighborhood::new(shape, self.scale, self.connectivity);
    let intensity = self.intensity.as_slice();

    let mut relaxation = match self.variant {
      Variant::Plain => Relaxation::Plain,
      Variant::DirectionPenalty { radius, penalty } => {
        let _span = tracing::info_span!("radius_gradient").entered();
        Relaxation::Direction {
          gradient: radius.gradient(&self.dispatcher),
          penalty,
        }
      }
      Variant::GapClosing {
        cost_fraction,
        max_gap_length,
      } => Relaxation::Gap(GapState::new(self.intensity, cost_fraction, max_gap_length)),
    };

    let mut state = SearchState::new(shape, self.cutoff);
    let seed_index = shape.offset(seed);
    state.cost.as_mut_slice()[seed_index] = 0.0;
    state.pred.as_mut_slice()[seed_index].code = DirectionCode::ROOT;
    state.frontier.push(0.0, seed_index);

    while let Some(entry) = state.frontier.pop() {
      let u = entry.index;
      let cell = state.pred.as_slice()[u];
      if cell.finalized {
        state.stats.stale_pops += 1;
        continue;
      }
      state.pred.as_mut_slice()[u].finalized = true;
      state.stats.finalized += 1;

      let pos = shape.coord(u);
      let cost_u = f64::from(state.cost.as_slice()[u]);
      for edge in neighborhood.edges(pos) {
        let v = shape.offset(edge.target);
        if state.pred.as_slice()[v].finalized {
          continue;
        }
        let value = f64::from(intensity[v]);
        match &mut relaxation {
          Relaxation::Plain => {
            state.offer(v, cost_u + value * edge.weight, edge.code);
          }
          Relaxation::Direction { gradient, penalty } => {
            let turn = if Neighborhood::compare(cell.code, edge.code) < 0 {
              *penalty
            } else {
              1.0
            };
            let slope = gradient.as_slice()[u]
              .dot(neighborhood.direction(edge.code))
              .min(0.0)
              .abs();
            state.offer(v, cost_u + value * edge.weight * (turn + slope), edge.code);
          }
          Relaxation::Gap(gap) => gap.relax(&mut state, shape, u, v, &edge, value),
        }
      }
    }

    state.stats.pushed = state.frontier.pushed();
    state.stats.total_us = start.elapsed().as_micros() as u64;
    tracing::debug!(
      finalized = state.stats.finalized,
      pushed = state.stats.pushed,
      stale = state.stats.stale_pops,
      gaps = state.stats.gaps_closed,
      us = state.stats.total_us,
      "shortest paths solved"
    );

    let gap_ids = match relaxation {
      Relaxation::Gap(gap) => Some(gap.into_ids()),
      _ => None,
    };
    Ok(ShortestPaths {
      cost: state.cost,
      second_cost: state.second_cost,
      pred: state.pred,
      second_pred: state.second_pred,
      gap_ids,
      stats: state.stats,
      seed,
    })
  }
}

/// Plain search from `seed`.
pub fn solve(
  volume: &Volume<f32>,
  cutoff: f32,
  scale: Scale,
  connectivity: Connectivity,
  seed: IVec3,
) -> Result<ShortestPaths> {
  ShortestPathSolver::new(volume)
    .with_cutoff(cutoff)
    .with_scale(scale)
    .with_connectivity(connectivity)
    .solve(seed)
}
