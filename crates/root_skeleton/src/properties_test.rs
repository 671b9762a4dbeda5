//! Property-based checks over random small volumes.

use super::*;
use std::collections::HashSet;

use glam::IVec3;
use proptest::prelude::*;

/// Random volume of up to 6³ voxels with non-negative costs, plus a seed.
fn volume_and_seed() -> impl Strategy<Value = (Volume<f32>, IVec3)> {
  (
    1usize..=6,
    1usize..=6,
    1usize..=6,
    proptest::collection::vec(0.0f32..10.0, 216),
    (0usize..6, 0usize..6, 0usize..6),
  )
    .prop_map(|(x, y, z, values, (sx, sy, sz))| {
      let shape = Shape::new(x, y, z);
      let volume = Volume::from_fn(shape, |p| values[shape.offset(p)]);
      let seed = IVec3::new((sx % x) as i32, (sy % y) as i32, (sz % z) as i32);
      (volume, seed)
    })
}

fn connectivity() -> impl Strategy<Value = Connectivity> {
  prop_oneof![
    Just(Connectivity::Six),
    Just(Connectivity::Eighteen),
    Just(Connectivity::TwentySix),
  ]
}

/// Every reached voxel chains back to the seed without repeating a voxel;
/// with `monotone`, costs also never rise toward the seed.
fn check_chains(paths: &ShortestPaths, monotone: bool) -> Result<(), TestCaseError> {
  let seed = paths.seed();
  for (pos, _) in paths.cost.indexed() {
    if !paths.is_reachable(pos) {
      continue;
    }
    let path = paths.path_to_seed(pos).unwrap();
    prop_assert_eq!(path.last().copied(), Some(seed));
    let mut seen = HashSet::new();
    prop_assert!(path.iter().all(|p| seen.insert(*p)), "chain from {} repeats a voxel", pos);
    if monotone {
      for pair in path.windows(2) {
        prop_assert!(paths.cost_at(pair[1]) <= paths.cost_at(pair[0]));
      }
    }
  }
  Ok(())
}

fn full_tree(volume: &Volume<f32>, seed: IVec3, connectivity: Connectivity) -> (ShortestPaths, RootTree) {
  let paths = solve(volume, f32::INFINITY, Scale::UNIT, connectivity, seed).unwrap();
  let tree = extract(volume, &paths, seed, ExtractMode::Exhaustive(ExhaustiveParams::default())).unwrap();
  (paths, tree)
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  // ===========================================================================
  // Solver
  // ===========================================================================

  #[test]
  fn test_seed_is_root_of_every_chain((volume, seed) in volume_and_seed(), connectivity in connectivity()) {
    let paths = solve(&volume, f32::INFINITY, Scale::UNIT, connectivity, seed).unwrap();
    prop_assert_eq!(paths.cost_at(seed), Some(0.0));
    prop_assert_eq!(paths.code_at(seed), Some(DirectionCode::ROOT));
    prop_assert_eq!(paths.reached(), volume.len());

    for (pos, _) in volume.indexed() {
      let path = paths.path_to_seed(pos).unwrap();
      prop_assert_eq!(path.first().copied(), Some(pos));
      prop_assert_eq!(path.last().copied(), Some(seed));
      prop_assert!(path.len() <= volume.len());
    }
  }

  #[test]
  fn test_cost_never_increases_toward_seed((volume, seed) in volume_and_seed(), connectivity in connectivity()) {
    let paths = solve(&volume, f32::INFINITY, Scale::UNIT, connectivity, seed).unwrap();
    for (pos, _) in volume.indexed() {
      let path = paths.path_to_seed(pos).unwrap();
      for pair in path.windows(2) {
        let here = paths.cost_at(pair[0]).unwrap();
        let next = paths.cost_at(pair[1]).unwrap();
        prop_assert!(next <= here, "cost rises from {} to {} toward the seed", here, next);
      }
    }
  }

  #[test]
  fn test_cost_matches_predecessor_edge((volume, seed) in volume_and_seed()) {
    let paths = solve(&volume, f32::INFINITY, Scale::UNIT, Connectivity::TwentySix, seed).unwrap();
    for (pos, value) in volume.indexed() {
      let Some(pred) = paths.predecessor(pos) else { continue };
      let expected = f64::from(paths.cost_at(pred).unwrap()) + f64::from(*value) * (pred - pos).as_dvec3().length();
      let found = f64::from(paths.cost_at(pos).unwrap());
      prop_assert!((found - expected).abs() <= 1e-3 * (1.0 + expected));
    }
  }

  #[test]
  fn test_solve_is_deterministic((volume, seed) in volume_and_seed(), connectivity in connectivity()) {
    let a = solve(&volume, f32::INFINITY, Scale::UNIT, connectivity, seed).unwrap();
    let b = solve(&volume, f32::INFINITY, Scale::UNIT, connectivity, seed).unwrap();
    prop_assert_eq!(a.cost.as_slice(), b.cost.as_slice());
    prop_assert_eq!(a.pred.as_slice(), b.pred.as_slice());
  }

  #[test]
  fn test_direction_penalty_chains_reach_seed(
    (volume, seed) in volume_and_seed(),
    connectivity in connectivity(),
    penalty in 1.0f64..4.0,
  ) {
    let radius = volume.map(|v| (v * 0.37).fract() * 3.0);
    let solver = ShortestPathSolver::new(&volume)
      .with_connectivity(connectivity)
      .with_direction_penalty(&radius, penalty);
    let paths = solver.solve(seed).unwrap();
    prop_assert_eq!(paths.cost_at(seed), Some(0.0));
    prop_assert_eq!(paths.reached(), volume.len());
    check_chains(&paths, true)?;

    let again = solver.solve(seed).unwrap();
    prop_assert_eq!(paths.cost.as_slice(), again.cost.as_slice());
    prop_assert_eq!(paths.pred.as_slice(), again.pred.as_slice());
  }

  #[test]
  fn test_gap_closing_chains_reach_seed(
    (volume, seed) in volume_and_seed(),
    connectivity in connectivity(),
    cost_fraction in 0.3f64..1.0,
    max_gap_length in 0.0f64..4.0,
  ) {
    let solver = ShortestPathSolver::new(&volume)
      .with_connectivity(connectivity)
      .with_gap_closing(cost_fraction, max_gap_length);
    let paths = solver.solve(seed).unwrap();
    prop_assert_eq!(paths.cost_at(seed), Some(0.0));
    check_chains(&paths, false)?;

    let again = solver.solve(seed).unwrap();
    prop_assert_eq!(paths.cost.as_slice(), again.cost.as_slice());
    prop_assert_eq!(paths.pred.as_slice(), again.pred.as_slice());
    prop_assert_eq!(
      paths.gap_ids.as_ref().map(|ids| ids.as_slice()),
      again.gap_ids.as_ref().map(|ids| ids.as_slice())
    );
  }

  /// A tagged gap voxel shares its id with every gap voxel behind it and with
  /// the cheap voxel the run starts from.
  #[test]
  fn test_gap_run_shares_one_id(
    (volume, seed) in volume_and_seed(),
    cost_fraction in 0.3f64..1.0,
    max_gap_length in 0.5f64..4.0,
  ) {
    let paths = ShortestPathSolver::new(&volume)
      .with_gap_closing(cost_fraction, max_gap_length)
      .solve(seed)
      .unwrap();
    let ids = paths.gap_ids.as_ref().unwrap();
    let threshold = volume.max_value().map_or(0.0, f64::from) * cost_fraction;
    let is_gap = |p: IVec3| p != seed && f64::from(volume[p]) >= threshold;

    for (pos, id) in ids.indexed() {
      let Some(id) = *id else { continue };
      if !is_gap(pos) {
        continue;
      }
      let mut cur = pos;
      while is_gap(cur) {
        prop_assert_eq!(ids[cur], Some(id), "run through {} split at {}", pos, cur);
        cur = paths.predecessor(cur).unwrap();
      }
      prop_assert_eq!(ids[cur], Some(id), "anchor {} of run through {}", cur, pos);
    }
  }

  // ===========================================================================
  // Extraction
  // ===========================================================================

  #[test]
  fn test_exhaustive_tree_mirrors_predecessors((volume, seed) in volume_and_seed(), connectivity in connectivity()) {
    let (paths, tree) = full_tree(&volume, seed, connectivity);
    prop_assert_eq!(tree.len(), volume.len());
    prop_assert_eq!(tree.node(tree.root()).unwrap().pos, seed);
    for (_, node) in tree.iter() {
      let parent = node.parent().map(|p| tree.node(p).unwrap().pos);
      prop_assert_eq!(parent, paths.predecessor(node.pos));
    }
  }

  #[test]
  fn test_curve_skeleton_owns_each_voxel_once(
    (volume, seed) in volume_and_seed(),
    dilation in 0.0f64..300.0,
  ) {
    let paths = solve(&volume, f32::INFINITY, Scale::UNIT, Connectivity::TwentySix, seed).unwrap();
    let radius = volume.map(|v| v * 0.3);
    let combined = volume.map(|v| v * 5.0);
    let params = CurveParams::new(&radius).with_dilation_percent(dilation);

    let run = |dispatcher: SlabDispatcher| {
      Extractor::new(&combined, &paths)
        .with_dispatcher(dispatcher)
        .run(seed, ExtractMode::CurveSkeleton(params))
        .unwrap()
        .tree
    };
    let sequential = run(SlabDispatcher::sequential());
    let parallel = run(SlabDispatcher::new(3));
    prop_assert_eq!(sequential.records(), parallel.records());

    let mut positions = sequential.positions();
    let total = positions.len();
    positions.sort_by_key(|p| (p.z, p.y, p.x));
    positions.dedup();
    prop_assert_eq!(positions.len(), total);
  }

  // ===========================================================================
  // Tree and refinement
  // ===========================================================================

  #[test]
  fn test_branches_cover_every_node_once((volume, seed) in volume_and_seed()) {
    let (_, tree) = full_tree(&volume, seed, Connectivity::TwentySix);
    let mut covered: Vec<NodeId> = Vec::new();
    for branch in tree.branches() {
      covered.extend(branch.nodes(&tree).unwrap());
    }
    covered.sort();
    let mut expected: Vec<NodeId> = tree.depth_first().filter(|&id| id != tree.root()).collect();
    expected.sort();
    prop_assert_eq!(covered, expected);
  }

  #[test]
  fn test_pruning_is_idempotent((volume, seed) in volume_and_seed(), threshold in 0.0f64..6.0) {
    let (_, mut tree) = full_tree(&volume, seed, Connectivity::TwentySix);
    prune(&mut tree, threshold).unwrap();
    let records = tree.records();
    let again = prune(&mut tree, threshold).unwrap();
    prop_assert_eq!(again.branches_removed, 0);
    prop_assert_eq!(tree.records(), records);
  }

  #[test]
  fn test_simplify_extremes((volume, seed) in volume_and_seed()) {
    let (_, mut tree) = full_tree(&volume, seed, Connectivity::TwentySix);
    let before = tree.len();
    prop_assert_eq!(simplify(&mut tree, 0.0).unwrap().nodes_removed, 0);
    prop_assert_eq!(tree.len(), before);

    simplify(&mut tree, f64::INFINITY).unwrap();
    for branch in tree.branches() {
      prop_assert_eq!(branch.len(), 1);
    }
  }
}
