use super::*;

/// ```text
///   r(0,0,0)
///   |- a(1,0,0) - b(2,0,0) - c(3,0,0)
///   `- d(0,1,0) - e(0,2,0)
///               `- f(1,2,0)
/// ```
pub(crate) fn sample_tree() -> (RootTree, [NodeId; 6]) {
  let mut tree = RootTree::new(IVec3::ZERO, 4.0);
  let r = tree.root();
  let a = tree.insert(r, IVec3::new(1, 0, 0), 3.0, 1).unwrap();
  let b = tree.insert(a, IVec3::new(2, 0, 0), 2.0, 1).unwrap();
  let c = tree.insert(b, IVec3::new(3, 0, 0), 1.0, 1).unwrap();
  let d = tree.insert(r, IVec3::new(0, 1, 0), 3.0, 2).unwrap();
  let e = tree.insert(d, IVec3::new(0, 2, 0), 2.0, 2).unwrap();
  let f = tree.insert(d, IVec3::new(1, 2, 0), 2.5, 3).unwrap();
  (tree, [a, b, c, d, e, f])
}

#[test]
fn test_insert_links_parent_and_child() {
  let (tree, [a, b, _, d, e, f]) = sample_tree();
  assert_eq!(tree.len(), 7);
  assert_eq!(tree.node(a).unwrap().parent(), Some(tree.root()));
  assert_eq!(tree.node(b).unwrap().parent(), Some(a));
  assert_eq!(tree.node(tree.root()).unwrap().children(), &[a, d]);
  assert_eq!(tree.node(d).unwrap().children(), &[e, f]);
  assert_eq!(tree.node(d).unwrap().rank(), 2);
}

#[test]
fn test_insert_under_unknown_parent_fails() {
  let mut tree = RootTree::new(IVec3::ZERO, 1.0);
  let bogus = NodeId(42);
  assert_eq!(
    tree.insert(bogus, IVec3::ONE, 1.0, 0),
    Err(SkeletonError::UnknownNode(bogus))
  );
  assert_eq!(tree.len(), 1);
}

#[test]
fn test_depth_first_preorder() {
  let (tree, [a, b, c, d, e, f]) = sample_tree();
  let order: Vec<_> = tree.depth_first().collect();
  assert_eq!(order, vec![tree.root(), a, b, c, d, e, f]);
  assert_eq!(tree.leaves(), vec![c, e, f]);
}

#[test]
fn test_export_numbers_nodes_sequentially() {
  let (tree, _) = sample_tree();
  let records = tree.records();
  assert_eq!(records.len(), 7);
  assert_eq!(records[0].parent, None);
  for (i, record) in records.iter().enumerate() {
    assert_eq!(record.id, i);
    if let Some(p) = record.parent {
      assert!(p < i, "parent must be exported first");
    }
  }
  // f hangs below d, which is the fifth node visited
  assert_eq!(records[6].parent, Some(4));
  assert_eq!(records[6].pos, IVec3::new(1, 2, 0));
  assert_eq!(records[6].branch_id, 3);
}

#[test]
fn test_remove_subtree() {
  let (mut tree, [_, _, _, d, e, f]) = sample_tree();
  assert_eq!(tree.remove_subtree(d), Ok(3));
  assert_eq!(tree.len(), 4);
  for id in [d, e, f] {
    assert!(!tree.contains(id));
  }
  assert_eq!(tree.node(tree.root()).unwrap().rank(), 1);
}

#[test]
fn test_root_cannot_be_removed() {
  let (mut tree, _) = sample_tree();
  let root = tree.root();
  assert_eq!(
    tree.remove_subtree(root),
    Err(SkeletonError::BranchRootDeletion(root))
  );
  assert_eq!(tree.len(), 7);
}

/// Handles of removed nodes are never reused.
#[test]
fn test_handles_not_reused() {
  let (mut tree, [a, ..]) = sample_tree();
  tree.remove_subtree(a).unwrap();
  let fresh = tree.insert(tree.root(), IVec3::NEG_X, 1.0, 0).unwrap();
  assert_ne!(fresh, a);
  assert!(!tree.contains(a));
}

#[test]
fn test_deep_copy_compacts() {
  let (mut tree, [a, ..]) = sample_tree();
  tree.remove_subtree(a).unwrap();
  let copy = tree.deep_copy();
  assert_eq!(copy.len(), 4);
  assert_eq!(copy.records(), tree.records());
  let ids: Vec<_> = copy.depth_first().map(|id| id.index()).collect();
  assert_eq!(ids, vec![0, 1, 2, 3]);

  // editing the copy leaves the source alone
  let mut copy = copy;
  let root = copy.root();
  copy.get_mut(root).unwrap().radius = 99.0;
  assert_eq!(tree.node(tree.root()).unwrap().radius, 4.0);
}

#[test]
fn test_max_radius_and_positions() {
  let (tree, _) = sample_tree();
  assert_eq!(tree.max_radius(), 4.0);
  assert_eq!(tree.positions().len(), 7);
  assert_eq!(tree.positions()[3], IVec3::new(3, 0, 0));
}

#[test]
fn test_dense_points() {
  let mut tree = RootTree::new(IVec3::ZERO, 1.0);
  tree.insert(tree.root(), IVec3::new(0, 0, 5), 1.0, 0).unwrap();
  let lists = tree.dense_points(2.0);
  assert_eq!(lists.len(), 2);
  assert_eq!(lists[0], vec![DVec3::ZERO]);
  assert_eq!(
    lists[1],
    vec![DVec3::new(0.0, 0.0, 2.0), DVec3::new(0.0, 0.0, 4.0), DVec3::new(0.0, 0.0, 5.0)]
  );
}

/// A chain deep enough to overflow a recursive walk is handled iteratively.
#[test]
fn test_deep_chain_traversal() {
  let mut tree = RootTree::new(IVec3::ZERO, 1.0);
  let mut cur = tree.root();
  for z in 1..200_000 {
    cur = tree.insert(cur, IVec3::new(0, 0, z), 1.0, 0).unwrap();
  }
  assert_eq!(tree.depth_first().count(), 200_000);
  assert_eq!(tree.leaves(), vec![cur]);
  let copy = tree.deep_copy();
  assert_eq!(copy.len(), 200_000);
}
