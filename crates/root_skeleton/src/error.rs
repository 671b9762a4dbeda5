//! Error types shared by the solver, the extractor and tree editing.

use std::path::PathBuf;

use glam::IVec3;
use thiserror::Error;

use crate::grid::Shape;
use crate::tree::NodeId;

/// Result alias used throughout the crate.
pub type Result<T, E = SkeletonError> = std::result::Result<T, E>;

/// Failures surfaced to callers.
///
/// Configuration problems are reported before any solve or extraction starts.
/// Structural edits that would corrupt a tree are rejected and leave the tree
/// untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkeletonError {
  #[error("seed {seed} lies outside volume of shape {shape}")]
  SeedOutOfBounds { seed: IVec3, shape: Shape },

  #[error("unknown connectivity id {0} (expected 1, 2, 3, 6, 18 or 26)")]
  UnknownConnectivity(u8),

  #[error("volume of shape {found} does not match shape {expected}")]
  ShapeMismatch { expected: Shape, found: Shape },

  #[error("shape {shape} needs {expected} values, got {found}")]
  SizeMismatch {
    shape: Shape,
    expected: usize,
    found: usize,
  },

  #[error("invalid parameter `{name}`: {reason}")]
  InvalidParameter { name: &'static str, reason: String },

  #[error("node {0} is not part of the tree")]
  UnknownNode(NodeId),

  #[error("branch view is stale, the tree was edited after it was taken")]
  StaleBranch,

  #[error("node {0} is the root of the branch and cannot be deleted")]
  BranchRootDeletion(NodeId),

  #[error("node {0} is the tail of the branch and cannot be deleted")]
  BranchTailDeletion(NodeId),

  #[error("node {0} does not lie inside the branch")]
  NotInBranch(NodeId),

  #[error("branch ending at node {0} is not a leaf branch")]
  NotALeafBranch(NodeId),

  #[error("predecessor chain starting at {start} does not reach an owned voxel")]
  MalformedPredecessors { start: IVec3 },
}

impl SkeletonError {
  pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidParameter {
      name,
      reason: reason.into(),
    }
  }
}

/// Failures while loading a [`SkeletonConfig`](crate::config::SkeletonConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config TOML")]
  Parse(#[from] toml::de::Error),

  #[error(transparent)]
  Invalid(#[from] SkeletonError),
}
