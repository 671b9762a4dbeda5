use glam::{DVec3, IVec3};

use crate::error::{Result, SkeletonError};

/// Physical voxel size per axis.
///
/// Distances between voxel coordinates are measured after scaling each axis,
/// so a scan with 0.5mm slices and 0.25mm pixels is handled without
/// resampling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale(DVec3);

impl Scale {
  /// Isotropic unit voxels.
  pub const UNIT: Self = Self(DVec3::ONE);

  pub fn new(x: f64, y: f64, z: f64) -> Result<Self> {
    Self::from_dvec3(DVec3::new(x, y, z))
  }

  /// Every component must be finite and strictly positive.
  pub fn from_dvec3(factors: DVec3) -> Result<Self> {
    if !factors.is_finite() || factors.min_element() <= 0.0 {
      return Err(SkeletonError::invalid(
        "scale",
        format!("axis factors must be finite and positive, got {factors}"),
      ));
    }
    Ok(Self(factors))
  }

  #[inline]
  pub fn factors(&self) -> DVec3 {
    self.0
  }

  /// Scaled physical offset.
  #[inline]
  pub fn apply(&self, offset: IVec3) -> DVec3 {
    offset.as_dvec3() * self.0
  }

  #[inline]
  pub fn length(&self, offset: IVec3) -> f64 {
    self.apply(offset).length()
  }

  #[inline]
  pub fn distance_squared(&self, a: IVec3, b: IVec3) -> f64 {
    self.apply(b - a).length_squared()
  }
}

impl Default for Scale {
  fn default() -> Self {
    Self::UNIT
  }
}
