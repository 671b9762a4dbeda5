//! TOML configuration of the end-to-end pipeline.
//!
//! Every key is optional:
//!
//! ```toml
//! connectivity = 26
//! cost_cutoff = 100000.0
//! direction_penalty = 2.0
//! min_combined = 20.0
//! dilation_percent = 200.0
//! quench_min_distance = 0.0
//! min_branch_length = 0.0
//! min_branch_radius = 0.0
//! simplify = false
//! simplify_tolerance = 2.25
//! scale = [1.0, 1.0, 1.0]
//!
//! [axis_cut]
//! axis = 4    # 0..=5: min x, max x, min y, max y, min z, max z
//! planes = 10
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result, SkeletonError};
use crate::extract::AxisCut;
use crate::grid::Scale;
use crate::neighborhood::Connectivity;

/// Parameters of [`Skeletonizer`](crate::pipeline::Skeletonizer).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkeletonConfig {
  /// Neighborhood id: 1/6, 2/18 or 3/26.
  #[serde(default = "default_connectivity")]
  pub connectivity: u8,
  /// Path costs above this are not expanded.
  #[serde(default = "default_cost_cutoff")]
  pub cost_cutoff: f32,
  /// Multiplier for steps reversing the incoming direction.
  #[serde(default = "default_direction_penalty")]
  pub direction_penalty: f64,
  /// Minimum combined intensity of a quench point.
  #[serde(default = "default_min_combined")]
  pub min_combined: f32,
  /// Claim spheres are `1 + dilation_percent / 100` times the node radius.
  #[serde(default = "default_dilation_percent")]
  pub dilation_percent: f64,
  #[serde(default)]
  pub axis_cut: Option<AxisCutConfig>,
  #[serde(default)]
  pub quench_min_distance: f64,
  #[serde(default)]
  pub min_branch_length: f64,
  #[serde(default)]
  pub min_branch_radius: f64,
  #[serde(default)]
  pub simplify: bool,
  #[serde(default = "default_simplify_tolerance")]
  pub simplify_tolerance: f64,
  /// Physical voxel size along x, y and z.
  #[serde(default = "default_scale")]
  pub scale: [f64; 3],
}

/// Quench scan restriction, see [`AxisCut::from_axis`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisCutConfig {
  pub axis: u8,
  pub planes: usize,
}

fn default_connectivity() -> u8 {
  26
}

fn default_cost_cutoff() -> f32 {
  100_000.0
}

fn default_direction_penalty() -> f64 {
  2.0
}

fn default_min_combined() -> f32 {
  20.0
}

fn default_dilation_percent() -> f64 {
  200.0
}

fn default_simplify_tolerance() -> f64 {
  2.25
}

fn default_scale() -> [f64; 3] {
  [1.0; 3]
}

impl Default for SkeletonConfig {
  fn default() -> Self {
    Self {
      connectivity: default_connectivity(),
      cost_cutoff: default_cost_cutoff(),
      direction_penalty: default_direction_penalty(),
      min_combined: default_min_combined(),
      dilation_percent: default_dilation_percent(),
      axis_cut: None,
      quench_min_distance: 0.0,
      min_branch_length: 0.0,
      min_branch_radius: 0.0,
      simplify: false,
      simplify_tolerance: default_simplify_tolerance(),
      scale: default_scale(),
    }
  }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
  if value.is_nan() || value < 0.0 {
    return Err(SkeletonError::invalid(name, format!("must be non-negative, got {value}")));
  }
  Ok(())
}

impl SkeletonConfig {
  /// Load and validate a TOML file.
  pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let config = Self::from_toml_str(&content)?;
    tracing::debug!(path = %path.display(), "loaded skeleton config");
    Ok(config)
  }

  /// Parse and validate TOML text.
  pub fn from_toml_str(content: &str) -> std::result::Result<Self, ConfigError> {
    let config: SkeletonConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    self.connectivity()?;
    self.scale()?;
    self.axis_cut()?;
    non_negative("cost_cutoff", f64::from(self.cost_cutoff))?;
    non_negative("min_combined", f64::from(self.min_combined))?;
    non_negative("dilation_percent", self.dilation_percent)?;
    non_negative("quench_min_distance", self.quench_min_distance)?;
    non_negative("min_branch_length", self.min_branch_length)?;
    non_negative("min_branch_radius", self.min_branch_radius)?;
    non_negative("simplify_tolerance", self.simplify_tolerance)?;
    if !self.direction_penalty.is_finite() || self.direction_penalty < 1.0 {
      return Err(SkeletonError::invalid(
        "direction_penalty",
        format!("must be finite and at least 1, got {}", self.direction_penalty),
      ));
    }
    Ok(())
  }

  pub fn connectivity(&self) -> Result<Connectivity> {
    Connectivity::try_from(self.connectivity)
  }

  pub fn scale(&self) -> Result<Scale> {
    let [x, y, z] = self.scale;
    Scale::new(x, y, z)
  }

  pub fn axis_cut(&self) -> Result<Option<AxisCut>> {
    self
      .axis_cut
      .map(|cut| {
        AxisCut::from_axis(cut.axis, cut.planes).ok_or_else(|| {
          SkeletonError::invalid("axis_cut", format!("axis must be 0..=5, got {}", cut.axis))
        })
      })
      .transpose()
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
