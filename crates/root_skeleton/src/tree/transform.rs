//! Rigid transforms of node positions.
//!
//! Positions stay on the voxel grid: every transform is applied to the exact
//! integer position and rounded once.

use glam::{DAffine3, DQuat, DVec3, EulerRot, IVec3};

use super::RootTree;

/// Rotation from Euler angles in degrees, applied as `Rz(a) * Ry(b) * Rx(c)`.
pub fn euler_rotation(angles_deg: DVec3) -> DQuat {
  DQuat::from_euler(
    EulerRot::ZYX,
    angles_deg.x.to_radians(),
    angles_deg.y.to_radians(),
    angles_deg.z.to_radians(),
  )
}

impl RootTree {
  /// Apply `transform` to every node position, rounding to the grid.
  pub fn transform(&mut self, transform: DAffine3) {
    for node in self.slots.iter_mut().flatten() {
      node.pos = transform.transform_point3(node.pos.as_dvec3()).round().as_ivec3();
    }
  }

  /// Rotate around the origin by Euler angles in degrees.
  pub fn rotate(&mut self, angles_deg: DVec3) {
    self.transform(DAffine3::from_quat(euler_rotation(angles_deg)));
  }

  /// Rotate around `pivot` by Euler angles in degrees.
  pub fn rotate_around(&mut self, pivot: DVec3, angles_deg: DVec3) {
    let transform = DAffine3::from_translation(pivot)
      * DAffine3::from_quat(euler_rotation(angles_deg))
      * DAffine3::from_translation(-pivot);
    self.transform(transform);
  }

  /// Translate by a real offset, rounding to the grid.
  pub fn translate(&mut self, offset: DVec3) {
    self.transform(DAffine3::from_translation(offset));
  }

  /// Exact integer translation.
  pub fn translate_by(&mut self, offset: IVec3) {
    for node in self.slots.iter_mut().flatten() {
      node.pos += offset;
    }
  }

  /// Move the tree so its root sits at the origin.
  pub fn zero_root(&mut self) {
    if let Some(root) = self.get(self.root) {
      let offset = -root.pos;
      self.translate_by(offset);
    }
  }
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;
