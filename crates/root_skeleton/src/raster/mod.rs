//! Rasterization of spheres, lines and whole trees into volumes.
//!
//! Spheres are precomputed as offset lists per integer radius. A voxel
//! offset `o` belongs to the sphere of radius `r` when `|o * scale|^2 <= r^2`,
//! so with anisotropic voxels the mask is an ellipsoid in index space.
//! Everything is clipped to the volume bounds.

use glam::IVec3;

use crate::grid::{Scale, Shape, Volume};
use crate::tree::RootTree;

/// Offset lists of discrete spheres, grown on demand.
#[derive(Clone, Debug)]
pub struct SphereMasks {
  scale: Scale,
  masks: Vec<Vec<IVec3>>,
}

impl SphereMasks {
  /// Masks for every radius up to `max_radius`.
  pub fn new(max_radius: usize, scale: Scale) -> Self {
    let mut masks = Self {
      scale,
      masks: Vec::with_capacity(max_radius + 1),
    };
    masks.reserve(max_radius);
    masks
  }

  #[inline]
  pub fn scale(&self) -> Scale {
    self.scale
  }

  /// Largest radius built so far.
  #[inline]
  pub fn max_radius(&self) -> usize {
    self.masks.len().saturating_sub(1)
  }

  /// Build masks up to and including `radius`.
  pub fn reserve(&mut self, radius: usize) {
    while self.masks.len() <= radius {
      let r = self.masks.len();
      self.masks.push(sphere_offsets(r, self.scale));
    }
  }

  /// Offsets of the sphere of `radius`, centered on the origin.
  pub fn offsets(&mut self, radius: usize) -> &[IVec3] {
    self.reserve(radius);
    &self.masks[radius]
  }

  /// Call `visit` for every in-bounds voxel of the sphere around `center`.
  pub fn for_each(&mut self, shape: Shape, center: IVec3, radius: usize, mut visit: impl FnMut(IVec3)) {
    for &offset in self.offsets(radius) {
      let pos = center + offset;
      if shape.contains(pos) {
        visit(pos);
      }
    }
  }

  /// Set every voxel of the sphere to `value`.
  pub fn stamp<T: Clone>(&mut self, volume: &mut Volume<T>, center: IVec3, radius: usize, value: T) {
    let shape = volume.shape();
    self.for_each(shape, center, radius, |pos| volume[pos] = value.clone());
  }
}

fn sphere_offsets(radius: usize, scale: Scale) -> Vec<IVec3> {
  let r = radius as i32;
  let limit = (radius * radius) as f64;
  let mut out = Vec::new();
  for z in -r..=r {
    for y in -r..=r {
      for x in -r..=r {
        let offset = IVec3::new(x, y, z);
        if scale.apply(offset).length_squared() <= limit {
          out.push(offset);
        }
      }
    }
  }
  out
}

/// Stamp an isotropic sphere of `radius` voxels, clipped to the bounds.
pub fn stamp_sphere<T: Clone>(volume: &mut Volume<T>, center: IVec3, radius: usize, value: T) {
  let shape = volume.shape();
  for offset in sphere_offsets(radius, Scale::UNIT) {
    let pos = center + offset;
    if shape.contains(pos) {
      volume[pos] = value.clone();
    }
  }
}

/// Voxels of the straight line from `a` to `b`, both endpoints included.
///
/// One voxel is produced per step along the dominant axis; the other axes
/// are rounded.
pub fn line_voxels(a: IVec3, b: IVec3) -> Vec<IVec3> {
  let delta = b - a;
  let steps = delta.abs().max_element();
  if steps == 0 {
    return vec![a];
  }
  let from = a.as_dvec3();
  let step = delta.as_dvec3() / f64::from(steps);
  (0..=steps)
    .map(|i| (from + step * f64::from(i)).round().as_ivec3())
    .collect()
}

/// Draw the line from `a` to `b`, clipped to the bounds.
pub fn draw_line<T: Clone>(volume: &mut Volume<T>, a: IVec3, b: IVec3, value: T) {
  let shape = volume.shape();
  for pos in line_voxels(a, b) {
    if shape.contains(pos) {
      volume[pos] = value.clone();
    }
  }
}

impl RootTree {
  /// Draw one line per edge.
  pub fn draw<T: Clone>(&self, canvas: &mut Volume<T>, value: T) {
    for (_, node) in self.iter() {
      if let Some(parent) = node.parent().and_then(|p| self.get(p)) {
        draw_line(canvas, parent.pos, node.pos, value.clone());
      }
    }
  }

  /// Stamp a sphere of radius `round(radius * rate)` at every node.
  pub fn fill_volume<T: Clone>(&self, out: &mut Volume<T>, masks: &mut SphereMasks, value: T, rate: f64) {
    let _span = tracing::debug_span!("fill_volume", nodes = self.len()).entered();
    for (_, node) in self.iter() {
      let radius = (f64::from(node.radius) * rate).round().max(0.0) as usize;
      masks.stamp(out, node.pos, radius, value.clone());
    }
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
