use std::sync::atomic::AtomicUsize;

use glam::IVec3;

use super::*;
use crate::grid::Shape;

/// Every slab is visited exactly once regardless of worker count.
#[test]
fn test_each_slab_claimed_once() {
  for workers in [1, 2, 7, 64] {
    let shape = Shape::new(3, 2, 11);
    let mut vol = Volume::filled(shape, 0u32);
    let calls = AtomicUsize::new(0);
    SlabDispatcher::new(workers).for_each_slab_mut(&mut vol, |z, slab| {
      calls.fetch_add(1, Ordering::Relaxed);
      for v in slab.iter_mut() {
        *v += z as u32 + 1;
      }
    });
    assert_eq!(calls.load(Ordering::Relaxed), shape.z);
    for (p, v) in vol.indexed() {
      assert_eq!(*v, p.z as u32 + 1, "workers={} voxel {}", workers, p);
    }
  }
}

#[test]
fn test_map_slabs_preserves_order() {
  let shape = Shape::new(2, 2, 6);
  let vol = Volume::from_fn(shape, |p: IVec3| p.z as u64);
  let sums = SlabDispatcher::new(4).map_slabs(&vol, |_, slab| slab.iter().sum::<u64>());
  assert_eq!(sums, vec![0, 4, 8, 12, 16, 20]);
}

#[test]
fn test_empty_volume_is_noop() {
  let mut vol: Volume<u8> = Volume::filled(Shape::new(0, 3, 3), 0);
  SlabDispatcher::new(2).for_each_slab_mut(&mut vol, |_, _| panic!("no slabs expected"));
  let out: Vec<()> = SlabDispatcher::new(2).map_slabs(&vol, |_, _| ());
  assert!(out.is_empty());
}

#[test]
fn test_worker_count_is_at_least_one() {
  assert_eq!(SlabDispatcher::new(0).workers(), 1);
}
