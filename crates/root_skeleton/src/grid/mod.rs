//! Dense 3D volumes.
//!
//! Storage is x-fastest, then y, then z:
//!
//! ```text
//!   index = z * (X * Y) + y * X + x
//!
//!   z = 0            z = 1
//!   +---------+      +---------+
//!   | 0  1  2 |      | 9 10 11 |
//!   | 3  4  5 |      |12 13 14 |
//!   | 6  7  8 |      |15 16 17 |
//!   +---------+      +---------+
//! ```
//!
//! One `X * Y` plane is a z-slab, the unit of work handed out by
//! [`SlabDispatcher`] for parallel per-voxel passes.

mod scale;
pub mod slab;

use std::fmt;
use std::ops::{Index, IndexMut};

use glam::{DVec3, IVec3};

use crate::error::{Result, SkeletonError};

pub use scale::Scale;
pub use slab::SlabDispatcher;

/// Extent of a volume in voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
  pub x: usize,
  pub y: usize,
  pub z: usize,
}

impl Shape {
  #[inline]
  pub const fn new(x: usize, y: usize, z: usize) -> Self {
    Self { x, y, z }
  }

  /// Total voxel count.
  #[inline]
  pub const fn len(&self) -> usize {
    self.x * self.y * self.z
  }

  #[inline]
  pub const fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Voxels in one z-slab.
  #[inline]
  pub const fn slab_len(&self) -> usize {
    self.x * self.y
  }

  #[inline]
  pub fn contains(&self, pos: IVec3) -> bool {
    pos.x >= 0
      && pos.y >= 0
      && pos.z >= 0
      && (pos.x as usize) < self.x
      && (pos.y as usize) < self.y
      && (pos.z as usize) < self.z
  }

  /// Linear index of `pos`, or `None` outside the volume.
  #[inline]
  pub fn index(&self, pos: IVec3) -> Option<usize> {
    self.contains(pos).then(|| self.offset(pos))
  }

  /// Linear index without the bounds check. `pos` must be inside.
  #[inline]
  pub(crate) fn offset(&self, pos: IVec3) -> usize {
    pos.z as usize * self.slab_len() + pos.y as usize * self.x + pos.x as usize
  }

  /// Inverse of [`Shape::index`].
  #[inline]
  pub fn coord(&self, index: usize) -> IVec3 {
    let plane = self.slab_len();
    let z = index / plane;
    let rest = index % plane;
    IVec3::new((rest % self.x) as i32, (rest / self.x) as i32, z as i32)
  }

  #[inline]
  pub fn as_ivec3(&self) -> IVec3 {
    IVec3::new(self.x as i32, self.y as i32, self.z as i32)
  }

  #[inline]
  pub fn as_dvec3(&self) -> DVec3 {
    self.as_ivec3().as_dvec3()
  }
}

impl From<[usize; 3]> for Shape {
  fn from([x, y, z]: [usize; 3]) -> Self {
    Self::new(x, y, z)
  }
}

impl fmt::Display for Shape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}x{}", self.x, self.y, self.z)
  }
}

/// Dense volume of `T` with a fixed shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Volume<T> {
  shape: Shape,
  data: Vec<T>,
}

impl<T: Clone> Volume<T> {
  /// Volume with every voxel set to `value`.
  pub fn filled(shape: Shape, value: T) -> Self {
    Self {
      shape,
      data: vec![value; shape.len()],
    }
  }

  pub fn fill(&mut self, value: T) {
    self.data.fill(value);
  }
}

impl<T> Volume<T> {
  /// Wrap an existing buffer laid out x-fastest.
  pub fn from_vec(shape: Shape, data: Vec<T>) -> Result<Self> {
    if data.len() != shape.len() {
      return Err(SkeletonError::SizeMismatch {
        shape,
        expected: shape.len(),
        found: data.len(),
      });
    }
    Ok(Self { shape, data })
  }

  /// Build a volume by evaluating `f` at every voxel in storage order.
  pub fn from_fn(shape: Shape, mut f: impl FnMut(IVec3) -> T) -> Self {
    let data = (0..shape.len()).map(|i| f(shape.coord(i))).collect();
    Self { shape, data }
  }

  #[inline]
  pub fn shape(&self) -> Shape {
    self.shape
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  #[inline]
  pub fn contains(&self, pos: IVec3) -> bool {
    self.shape.contains(pos)
  }

  #[inline]
  pub fn get(&self, pos: IVec3) -> Option<&T> {
    self.shape.index(pos).map(|i| &self.data[i])
  }

  #[inline]
  pub fn get_mut(&mut self, pos: IVec3) -> Option<&mut T> {
    self.shape.index(pos).map(|i| &mut self.data[i])
  }

  #[inline]
  pub fn as_slice(&self) -> &[T] {
    &self.data
  }

  #[inline]
  pub fn as_mut_slice(&mut self) -> &mut [T] {
    &mut self.data
  }

  pub fn into_vec(self) -> Vec<T> {
    self.data
  }

  /// One z-plane of the volume.
  pub fn slab(&self, z: usize) -> &[T] {
    let plane = self.shape.slab_len();
    &self.data[z * plane..(z + 1) * plane]
  }

  /// Iterate voxels with their coordinates in storage order.
  pub fn indexed(&self) -> impl Iterator<Item = (IVec3, &T)> + '_ {
    self
      .data
      .iter()
      .enumerate()
      .map(move |(i, value)| (self.shape.coord(i), value))
  }

  pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Volume<U> {
    Volume {
      shape: self.shape,
      data: self.data.iter().map(f).collect(),
    }
  }

  /// Fails with [`SkeletonError::ShapeMismatch`] unless both shapes agree.
  pub fn ensure_same_shape<U>(&self, other: &Volume<U>) -> Result<()> {
    if self.shape != other.shape {
      return Err(SkeletonError::ShapeMismatch {
        expected: self.shape,
        found: other.shape,
      });
    }
    Ok(())
  }
}

impl<T: Copy> Volume<T> {
  /// Copy of the voxel at `pos`, if inside.
  #[inline]
  pub fn value(&self, pos: IVec3) -> Option<T> {
    self.get(pos).copied()
  }
}

impl Volume<f32> {
  /// Smallest and largest non-NaN value.
  pub fn min_max(&self) -> Option<(f32, f32)> {
    self
      .data
      .iter()
      .copied()
      .filter(|v| !v.is_nan())
      .fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
      })
  }

  pub fn max_value(&self) -> Option<f32> {
    self.min_max().map(|(_, hi)| hi)
  }

  /// Central-difference gradient field.
  ///
  /// Border voxels, where one neighbor is missing, get a zero gradient.
  pub fn gradient(&self, dispatcher: &SlabDispatcher) -> Volume<DVec3> {
    let shape = self.shape;
    let mut out = Volume::filled(shape, DVec3::ZERO);
    if shape.x < 3 || shape.y < 3 || shape.z < 3 {
      return out;
    }
    dispatcher.for_each_slab_mut(&mut out, |z, slab| {
      if z == 0 || z + 1 >= shape.z {
        return;
      }
      for y in 1..shape.y - 1 {
        for x in 1..shape.x - 1 {
          let p = IVec3::new(x as i32, y as i32, z as i32);
          let at = |d: IVec3| f64::from(self.data[shape.offset(p + d)]);
          slab[y * shape.x + x] = 0.5
            * DVec3::new(
              at(IVec3::X) - at(IVec3::NEG_X),
              at(IVec3::Y) - at(IVec3::NEG_Y),
              at(IVec3::Z) - at(IVec3::NEG_Z),
            );
        }
      }
    });
    out
  }
}

impl<T> Index<IVec3> for Volume<T> {
  type Output = T;

  #[inline]
  fn index(&self, pos: IVec3) -> &T {
    match self.shape.index(pos) {
      Some(i) => &self.data[i],
      None => panic!("voxel {pos} outside volume {}", self.shape),
    }
  }
}

impl<T> IndexMut<IVec3> for Volume<T> {
  #[inline]
  fn index_mut(&mut self, pos: IVec3) -> &mut T {
    match self.shape.index(pos) {
      Some(i) => &mut self.data[i],
      None => panic!("voxel {pos} outside volume {}", self.shape),
    }
  }
}
