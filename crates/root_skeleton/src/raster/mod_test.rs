use glam::IVec3;

use super::*;
use crate::grid::{Scale, Shape, Volume};
use crate::tree::RootTree;

fn count<T: PartialEq>(volume: &Volume<T>, value: &T) -> usize {
  volume.as_slice().iter().filter(|v| *v == value).count()
}

// =========================================================================
// Sphere masks
// =========================================================================

#[test]
fn test_sphere_sizes() {
  let mut masks = SphereMasks::new(2, Scale::UNIT);
  assert_eq!(masks.offsets(0), &[IVec3::ZERO]);
  // radius 1: center plus face neighbors
  assert_eq!(masks.offsets(1).len(), 7);
  // radius 2: 33 offsets with |o|^2 <= 4
  assert_eq!(masks.offsets(2).len(), 33);
  assert_eq!(masks.max_radius(), 2);
}

#[test]
fn test_masks_grow_on_demand() {
  let mut masks = SphereMasks::new(0, Scale::UNIT);
  assert_eq!(masks.max_radius(), 0);
  assert!(!masks.offsets(3).is_empty());
  assert_eq!(masks.max_radius(), 3);
}

#[test]
fn test_anisotropic_sphere_is_flattened() {
  let mut masks = SphereMasks::new(2, Scale::new(1.0, 1.0, 2.0).unwrap());
  let offsets = masks.offsets(2);
  assert!(offsets.contains(&IVec3::new(2, 0, 0)));
  assert!(offsets.contains(&IVec3::new(0, 0, 1)));
  assert!(!offsets.contains(&IVec3::new(0, 0, 2)));
}

#[test]
fn test_stamp_clips_to_bounds() {
  let mut volume = Volume::filled(Shape::new(4, 4, 4), 0u8);
  stamp_sphere(&mut volume, IVec3::ZERO, 1, 1);
  // center plus three in-bounds face neighbors
  assert_eq!(count(&volume, &1), 4);

  let mut volume = Volume::filled(Shape::new(4, 4, 4), 0u8);
  stamp_sphere(&mut volume, IVec3::new(-5, 0, 0), 2, 1);
  assert_eq!(count(&volume, &1), 0);
}

#[test]
fn test_masked_stamp_matches_free_function() {
  let shape = Shape::new(7, 7, 7);
  let mut a = Volume::filled(shape, false);
  let mut b = Volume::filled(shape, false);
  stamp_sphere(&mut a, IVec3::splat(3), 3, true);
  SphereMasks::new(3, Scale::UNIT).stamp(&mut b, IVec3::splat(3), 3, true);
  assert_eq!(a, b);
}

// =========================================================================
// Lines
// =========================================================================

#[test]
fn test_line_includes_endpoints() {
  let line = line_voxels(IVec3::ZERO, IVec3::new(4, 2, 0));
  assert_eq!(line.len(), 5);
  assert_eq!(line[0], IVec3::ZERO);
  assert_eq!(line[4], IVec3::new(4, 2, 0));
  assert_eq!(line[2], IVec3::new(2, 1, 0));
}

#[test]
fn test_line_follows_dominant_axis() {
  let line = line_voxels(IVec3::new(0, 0, 5), IVec3::new(1, 1, 0));
  assert_eq!(line.len(), 6);
  for (i, pos) in line.iter().enumerate() {
    assert_eq!(pos.z, 5 - i as i32);
  }
  assert_eq!(line_voxels(IVec3::ONE, IVec3::ONE), vec![IVec3::ONE]);
}

#[test]
fn test_draw_line_clips() {
  let mut volume = Volume::filled(Shape::new(3, 1, 1), 0u8);
  draw_line(&mut volume, IVec3::new(-2, 0, 0), IVec3::new(5, 0, 0), 7);
  assert_eq!(volume.as_slice(), &[7, 7, 7]);
}

// =========================================================================
// Trees
// =========================================================================

#[test]
fn test_draw_tree_edges() {
  let mut tree = RootTree::new(IVec3::ZERO, 1.0);
  let a = tree.insert(tree.root(), IVec3::new(3, 0, 0), 1.0, 1).unwrap();
  tree.insert(a, IVec3::new(3, 3, 0), 1.0, 1).unwrap();
  let mut canvas = Volume::filled(Shape::new(4, 4, 1), 0u8);
  tree.draw(&mut canvas, 1);
  assert_eq!(count(&canvas, &1), 7);
  assert_eq!(canvas[IVec3::new(3, 2, 0)], 1);
  assert_eq!(canvas[IVec3::new(0, 3, 0)], 0);
}

#[test]
fn test_fill_volume_scales_radius() {
  let tree = RootTree::new(IVec3::splat(4), 2.0);
  let mut masks = SphereMasks::new(4, Scale::UNIT);

  let mut out = Volume::filled(Shape::new(9, 9, 9), 0u8);
  tree.fill_volume(&mut out, &mut masks, 1, 1.0);
  assert_eq!(count(&out, &1), 33);

  let mut out = Volume::filled(Shape::new(9, 9, 9), 0u8);
  tree.fill_volume(&mut out, &mut masks, 1, 0.2);
  assert_eq!(count(&out, &1), 1);
}
