//! root_skeleton - Root architecture skeletons from 3D volumes
//!
//! Turns a scanned root system (a cost volume, a local radius volume and a
//! quench intensity volume) into a rooted tree of voxel positions with
//! per-node radii, ready for pruning, simplification and per-branch
//! measurements.
//!
//! # Stages
//!
//! - **Shortest paths**: seeded Dijkstra over a 6/18/26 neighborhood with
//!   anisotropic voxel scale, optional direction penalty or gap closing
//! - **Extraction**: exhaustive tree of every qualifying voxel, or a sparse
//!   curve skeleton grown from far quench points
//! - **Refinement**: radius repair, pruning of short or thin leaf branches,
//!   Douglas-Peucker simplification, branch metrics
//! - **Rasterization**: spheres and lines back into volumes
//!
//! # Example
//!
//! ```ignore
//! use root_skeleton::{SkeletonConfig, Skeletonizer};
//!
//! let config = SkeletonConfig::load(Path::new("skeleton.toml"))?;
//! let run = Skeletonizer::new(config)?.run(&cost, &radius, &combined, seed)?;
//!
//! println!("{} nodes in {} branches", run.tree.len(), run.tree.branches().len());
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod neighborhood;
pub mod solver;

// Re-export commonly used items
pub use config::{AxisCutConfig, SkeletonConfig};
pub use error::{ConfigError, Result, SkeletonError};
pub use grid::{Scale, Shape, SlabDispatcher, Volume};
pub use neighborhood::{Connectivity, DirectionCode, Neighborhood};
pub use solver::{solve, ShortestPathSolver, ShortestPaths, SolveStats, Variant};

// Tree arena and branch views
pub mod tree;
pub use tree::{Branch, NodeId, NodeRecord, RootTree, TreeNode};

// Tree construction from predecessor fields
pub mod extract;
pub use extract::{
  extract, AxisCut, CurveParams, ExhaustiveParams, ExtractMode, ExtractStats, Extraction, Extractor,
  SeedMode, VoxelOwnerMap,
};

// Pruning, simplification and measurements
pub mod refine;
pub use refine::{branch_metrics, prune, simplify, BranchMetrics, PruneStats, SimplifyStats};

// Drawing trees back into volumes
pub mod raster;
pub use raster::{draw_line, stamp_sphere, SphereMasks};

// End-to-end run driven by a config
pub mod pipeline;
pub use pipeline::{SkeletonRun, Skeletonizer};

#[cfg(test)]
#[path = "properties_test.rs"]
mod properties_test;
