//! Configuration-driven skeletonization, from volumes to a cleaned tree.
//!
//! ```text
//!   cost ----------> solve (direction penalty) --+
//!   radius --------------------------------------+--> curve skeleton
//!   combined ------------------------------------+          |
//!                                          repair radius + tips
//!                                                           |
//!                                        prune short, prune thin
//!                                                           |
//!                                  relabel branches, simplify (optional)
//! ```

use glam::IVec3;
use web_time::Instant;

use crate::config::SkeletonConfig;
use crate::error::Result;
use crate::extract::{AxisCut, CurveParams, ExtractMode, ExtractStats, Extractor, SeedMode};
use crate::grid::{Scale, SlabDispatcher, Volume};
use crate::neighborhood::Connectivity;
use crate::refine::{prune_short_branches, prune_thin_branches, simplify_branches, PruneStats, SimplifyStats};
use crate::solver::{ShortestPathSolver, SolveStats};
use crate::tree::RootTree;

/// Result of [`Skeletonizer::run`].
#[derive(Debug, Clone)]
pub struct SkeletonRun {
  pub tree: RootTree,
  /// Claim mask of the curve skeleton extraction.
  pub mask: Volume<bool>,
  pub solve: SolveStats,
  pub extract: ExtractStats,
  pub short_pruning: PruneStats,
  pub thin_pruning: PruneStats,
  /// Only set when simplification is enabled.
  pub simplify: Option<SimplifyStats>,
  /// Wall time of the refinement stages in microseconds.
  pub refine_us: u64,
  pub total_us: u64,
}

/// Validated pipeline parameters.
#[derive(Debug, Clone)]
pub struct Skeletonizer {
  config: SkeletonConfig,
  connectivity: Connectivity,
  scale: Scale,
  axis_cut: Option<AxisCut>,
  dispatcher: SlabDispatcher,
}

impl Skeletonizer {
  pub fn new(config: SkeletonConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      connectivity: config.connectivity()?,
      scale: config.scale()?,
      axis_cut: config.axis_cut()?,
      config,
      dispatcher: SlabDispatcher::default(),
    })
  }

  /// Dispatcher shared by the gradient and quench scans.
  pub fn with_dispatcher(mut self, dispatcher: SlabDispatcher) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  pub fn config(&self) -> &SkeletonConfig {
    &self.config
  }

  /// Skeletonize from `seed`.
  ///
  /// `cost` drives the shortest paths, `radius` the node radii and the
  /// direction penalty, `combined` selects the quench points.
  pub fn run(&self, cost: &Volume<f32>, radius: &Volume<f32>, combined: &Volume<f32>, seed: IVec3) -> Result<SkeletonRun> {
    self.run_from(cost, radius, combined, seed, SeedMode::Fresh)
  }

  /// Like [`Skeletonizer::run`], starting from a prior tree as described by
  /// `seed_mode`.
  #[tracing::instrument(skip_all, name = "pipeline::run", fields(seed = %seed))]
  pub fn run_from(
    &self,
    cost: &Volume<f32>,
    radius: &Volume<f32>,
    combined: &Volume<f32>,
    seed: IVec3,
    seed_mode: SeedMode<'_>,
  ) -> Result<SkeletonRun> {
    let start = Instant::now();
    let config = &self.config;

    let paths = ShortestPathSolver::new(cost)
      .with_cutoff(config.cost_cutoff)
      .with_scale(self.scale)
      .with_connectivity(self.connectivity)
      .with_direction_penalty(radius, config.direction_penalty)
      .with_dispatcher(self.dispatcher)
      .solve(seed)?;

    let params = CurveParams::new(radius)
      .with_min_combined(config.min_combined)
      .with_min_distance(config.quench_min_distance)
      .with_dilation_percent(config.dilation_percent)
      .with_scale(self.scale)
      .with_axis_cut(self.axis_cut)
      .with_seed_mode(seed_mode);
    let extraction = Extractor::new(combined, &paths)
      .with_dispatcher(self.dispatcher)
      .run(seed, ExtractMode::CurveSkeleton(params))?;
    let mut tree = extraction.tree;

    let refine_start = Instant::now();
    {
      let _span = tracing::info_span!("repair").entered();
      tree.repair_radius();
      tree.repair_tips();
    }
    let short_pruning = prune_short_branches(&mut tree, config.min_branch_length, self.scale)?;
    let thin_pruning = prune_thin_branches(&mut tree, config.min_branch_radius, self.scale)?;
    tree.evaluate_branch_ids();
    let simplify = if config.simplify {
      Some(simplify_branches(&mut tree, config.simplify_tolerance, self.scale)?)
    } else {
      None
    };
    let refine_us = refine_start.elapsed().as_micros() as u64;
    let total_us = start.elapsed().as_micros() as u64;

    tracing::info!(
      nodes = tree.len(),
      branches = tree.branches().len(),
      solve_us = paths.stats.total_us,
      extract_us = extraction.stats.total_us,
      refine_us = refine_us,
      total_us = total_us,
      "skeleton extracted"
    );

    Ok(SkeletonRun {
      tree,
      mask: extraction.mask,
      solve: paths.stats,
      extract: extraction.stats,
      short_pruning,
      thin_pruning,
      simplify,
      refine_us,
      total_us,
    })
  }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
