//! Grid connectivity model.
//!
//! Enumerates the graph edges leaving a voxel. Each edge carries the target
//! coordinate, a geometric weight multiplier and the [`DirectionCode`] the
//! target stores to point back at the source.

mod direction;

use glam::{DVec3, IVec3};
use smallvec::SmallVec;

use crate::error::{Result, SkeletonError};
use crate::grid::{Scale, Shape};

pub use direction::DirectionCode;

/// Maximum number of neighbors of any voxel.
pub const MAX_NEIGHBORS: usize = 26;

/// Neighbor set of a voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Connectivity {
  /// Face neighbors.
  Six,
  /// Face and edge neighbors.
  Eighteen,
  /// Face, edge and corner neighbors.
  #[default]
  TwentySix,
}

impl Connectivity {
  /// Most axes a single edge may move along.
  #[inline]
  pub fn max_axes(self) -> i32 {
    match self {
      Self::Six => 1,
      Self::Eighteen => 2,
      Self::TwentySix => 3,
    }
  }

  /// Neighbor count of an interior voxel.
  #[inline]
  pub fn degree(self) -> usize {
    match self {
      Self::Six => 6,
      Self::Eighteen => 18,
      Self::TwentySix => 26,
    }
  }
}

impl TryFrom<u8> for Connectivity {
  type Error = SkeletonError;

  /// Accepts both the class ids `1..=3` and the neighbor counts.
  fn try_from(id: u8) -> Result<Self> {
    match id {
      1 | 6 => Ok(Self::Six),
      2 | 18 => Ok(Self::Eighteen),
      3 | 26 => Ok(Self::TwentySix),
      other => Err(SkeletonError::UnknownConnectivity(other)),
    }
  }
}

/// Edge from a source voxel to one of its neighbors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
  pub target: IVec3,
  /// Physical length of the step.
  pub weight: f64,
  /// Code stored at `target` pointing back at the source.
  pub code: DirectionCode,
}

/// Precomputed relative neighbor.
#[derive(Clone, Copy, Debug)]
struct Stencil {
  delta: IVec3,
  weight: f64,
  code: DirectionCode,
}

/// Bounds-clipped neighbor enumeration for one volume shape.
#[derive(Clone, Debug)]
pub struct Neighborhood {
  shape: Shape,
  scale: Scale,
  connectivity: Connectivity,
  stencil: SmallVec<[Stencil; MAX_NEIGHBORS]>,
}

impl Neighborhood {
  pub fn new(shape: Shape, scale: Scale, connectivity: Connectivity) -> Self {
    let mut stencil = SmallVec::new();
    for dz in -1..=1 {
      for dy in -1..=1 {
        for dx in -1..=1 {
          let delta = IVec3::new(dx, dy, dz);
          let moved = delta.abs().element_sum();
          if moved == 0 || moved > connectivity.max_axes() {
            continue;
          }
          // Offsets in -1..=1 always encode.
          if let Some(code) = DirectionCode::from_offset(-delta) {
            stencil.push(Stencil {
              delta,
              weight: scale.length(delta),
              code,
            });
          }
        }
      }
    }
    Self {
      shape,
      scale,
      connectivity,
      stencil,
    }
  }

  #[inline]
  pub fn shape(&self) -> Shape {
    self.shape
  }

  #[inline]
  pub fn scale(&self) -> Scale {
    self.scale
  }

  #[inline]
  pub fn connectivity(&self) -> Connectivity {
    self.connectivity
  }

  /// Neighbors of `pos` that lie inside the volume.
  pub fn edges(&self, pos: IVec3) -> SmallVec<[Edge; MAX_NEIGHBORS]> {
    self
      .stencil
      .iter()
      .filter_map(|s| {
        let target = pos + s.delta;
        self.shape.contains(target).then_some(Edge {
          target,
          weight: s.weight,
          code: s.code,
        })
      })
      .collect()
  }

  /// Position `code` points at from `pos`. Codes without a predecessor decode
  /// to `pos` itself.
  #[inline]
  pub fn decode(&self, pos: IVec3, code: DirectionCode) -> IVec3 {
    pos + code.offset()
  }

  /// Predecessor of `pos`, if the code names one inside the volume.
  #[inline]
  pub fn predecessor(&self, pos: IVec3, code: DirectionCode) -> Option<IVec3> {
    if !code.has_predecessor() {
      return None;
    }
    let target = self.decode(pos, code);
    self.shape.contains(target).then_some(target)
  }

  /// Sign of the dot product between the two direction vectors.
  ///
  /// Negative when `b` turns back against `a`.
  #[inline]
  pub fn compare(a: DirectionCode, b: DirectionCode) -> i32 {
    a.offset().dot(b.offset()).signum()
  }

  /// Unit physical direction of a code.
  #[inline]
  pub fn direction(&self, code: DirectionCode) -> DVec3 {
    if self.scale == Scale::UNIT {
      return code.unit();
    }
    self.scale.apply(code.offset()).normalize_or_zero()
  }
}
