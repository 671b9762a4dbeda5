//! Compact predecessor direction codes.
//!
//! A code records where the predecessor of a voxel lies, one bit per axis
//! direction:
//!
//! ```text
//!   bit   6     5    4    3    2    1    0
//!        root  +x   -x   +y   -y   +z   -z
//! ```
//!
//! Diagonal offsets combine axis bits, so a predecessor at `(+1, -1, 0)` is
//! `0b10_0100`. Zero means "no predecessor". The root bit marks the search
//! seed and never combines with axis bits.

use glam::{DVec3, IVec3};

/// Direction from a voxel towards its predecessor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectionCode(u8);

impl DirectionCode {
  /// No predecessor (unreached voxel).
  pub const NONE: Self = Self(0);
  /// The search seed.
  pub const ROOT: Self = Self(1 << 6);

  pub const POS_X: Self = Self(1 << 5);
  pub const NEG_X: Self = Self(1 << 4);
  pub const POS_Y: Self = Self(1 << 3);
  pub const NEG_Y: Self = Self(1 << 2);
  pub const POS_Z: Self = Self(1 << 1);
  pub const NEG_Z: Self = Self(1);

  const AXIS_MASK: u8 = 0b0011_1111;

  /// Code for a unit offset with components in `-1..=1`.
  ///
  /// Returns `None` for the zero offset or any component outside that range.
  pub fn from_offset(offset: IVec3) -> Option<Self> {
    if offset == IVec3::ZERO || offset.abs().max_element() > 1 {
      return None;
    }
    let axis = |v: i32, pos: u8, neg: u8| match v {
      1 => pos,
      -1 => neg,
      _ => 0,
    };
    Some(Self(
      axis(offset.x, Self::POS_X.0, Self::NEG_X.0)
        | axis(offset.y, Self::POS_Y.0, Self::NEG_Y.0)
        | axis(offset.z, Self::POS_Z.0, Self::NEG_Z.0),
    ))
  }

  /// Validate raw bits, for instance from an external predecessor map.
  pub fn from_bits(bits: u8) -> Option<Self> {
    if bits == Self::ROOT.0 || bits == 0 {
      return Some(Self(bits));
    }
    if bits & !Self::AXIS_MASK != 0 {
      return None;
    }
    let conflicting = [0b11_0000u8, 0b00_1100, 0b00_0011]
      .iter()
      .any(|&pair| bits & pair == pair);
    (!conflicting).then_some(Self(bits))
  }

  #[inline]
  pub const fn bits(self) -> u8 {
    self.0
  }

  #[inline]
  pub const fn is_none(self) -> bool {
    self.0 == 0
  }

  #[inline]
  pub const fn is_root(self) -> bool {
    self.0 == Self::ROOT.0
  }

  /// True when the code points at an actual neighbor.
  #[inline]
  pub const fn has_predecessor(self) -> bool {
    self.0 & Self::AXIS_MASK != 0
  }

  /// Offset from the voxel to its predecessor. Zero for `NONE` and `ROOT`.
  #[inline]
  pub fn offset(self) -> IVec3 {
    let b = self.0;
    let axis = |pos: u8, neg: u8| i32::from(b & pos != 0) - i32::from(b & neg != 0);
    IVec3::new(
      axis(Self::POS_X.0, Self::NEG_X.0),
      axis(Self::POS_Y.0, Self::NEG_Y.0),
      axis(Self::POS_Z.0, Self::NEG_Z.0),
    )
  }

  #[inline]
  pub fn unit(self) -> DVec3 {
    self.offset().as_dvec3().normalize_or_zero()
  }

  /// Number of axes the offset moves along (0 to 3).
  #[inline]
  pub fn axes(self) -> u32 {
    (self.0 & Self::AXIS_MASK).count_ones()
  }

  /// Code pointing the opposite way.
  #[inline]
  pub fn reversed(self) -> Self {
    Self::from_offset(-self.offset()).unwrap_or(self)
  }
}

#[cfg(test)]
#[path = "direction_test.rs"]
mod direction_test;
