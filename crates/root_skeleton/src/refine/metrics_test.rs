use std::f64::consts::{FRAC_PI_2, PI};

use glam::IVec3;

use super::*;

fn close(a: f64, b: f64) -> bool {
  (a - b).abs() < 1e-9
}

/// Trunk growing down from z = 10 to 8, then a horizontal side branch and a
/// downward continuation.
fn planted() -> RootTree {
  let mut tree = RootTree::new(IVec3::new(0, 0, 10), 2.0);
  let a = tree.insert(tree.root(), IVec3::new(0, 0, 9), 2.0, 1).unwrap();
  let fork = tree.insert(a, IVec3::new(0, 0, 8), 2.0, 1).unwrap();
  tree.insert(fork, IVec3::new(1, 0, 8), 1.0, 2).unwrap();
  let b = tree.insert(fork, IVec3::new(0, 0, 7), 1.0, 3).unwrap();
  tree.insert(b, IVec3::new(0, 0, 6), 1.0, 3).unwrap();
  tree
}

#[test]
fn test_trunk_metrics() {
  let tree = planted();
  let metrics = branch_metrics(&tree, Scale::UNIT).unwrap();
  assert_eq!(metrics.len(), 3);
  let trunk = &metrics[0];
  assert_eq!(trunk.nodes, 2);
  assert!(close(trunk.length, 2.0));
  assert!(close(trunk.mean_radius, 2.0));
  assert!(close(trunk.volume, 8.0 * PI));
  assert!(close(trunk.vertical_angle, PI));
  assert!(close(trunk.horizontal_angle, -FRAC_PI_2));
  assert_eq!(trunk.branching_angle, None);
  assert_eq!(trunk.parent, None);
}

#[test]
fn test_side_branch_metrics() {
  let tree = planted();
  let metrics = branch_metrics(&tree, Scale::UNIT).unwrap();
  let side = &metrics[1];
  assert!(close(side.length, 1.0));
  assert!(close(side.mean_radius, 1.5));
  assert!(close(side.volume, 2.25 * PI));
  assert!(close(side.vertical_angle, FRAC_PI_2));
  assert!(close(side.horizontal_angle, 0.0));
  assert!(close(side.branching_angle.unwrap(), FRAC_PI_2));
  assert_eq!(side.parent, Some(0));

  let down = &metrics[2];
  assert!(close(down.length, 2.0));
  assert!(close(down.mean_radius, 1.25));
  assert!(close(down.volume, 3.25 * PI));
  assert!(close(down.branching_angle.unwrap(), 0.0));
  assert_eq!(down.parent, Some(0));
}

#[test]
fn test_metrics_follow_scale() {
  let tree = planted();
  let metrics = branch_metrics(&tree, Scale::new(1.0, 1.0, 2.0).unwrap()).unwrap();
  assert!(close(metrics[0].length, 4.0));
  assert!(close(metrics[1].length, 1.0));
  assert!(close(metrics[0].volume, 16.0 * PI));
}

#[test]
fn test_zero_length_branch_defaults() {
  let mut tree = RootTree::new(IVec3::ZERO, 3.0);
  tree.insert(tree.root(), IVec3::ZERO, 0.5, 1).unwrap();
  let metrics = branch_metrics(&tree, Scale::UNIT).unwrap();
  assert_eq!(metrics.len(), 1);
  assert_eq!(metrics[0].length, 0.0);
  assert_eq!(metrics[0].mean_radius, 0.5);
  assert_eq!(metrics[0].volume, 0.0);
  assert_eq!(metrics[0].vertical_angle, 0.0);
}

#[test]
fn test_mean_radius_matches_branch_view() {
  let tree = planted();
  let metrics = branch_metrics(&tree, Scale::UNIT).unwrap();
  for (m, branch) in metrics.iter().zip(tree.branches()) {
    assert!(close(m.mean_radius, branch.mean_radius(&tree, Scale::UNIT).unwrap()));
    assert!(close(m.length, branch.length(&tree, Scale::UNIT).unwrap()));
  }
}
