//! Cooperative z-slab dispatcher.
//!
//! A fixed number of workers drain the slabs of one volume through a shared
//! atomic cursor:
//!
//! ```text
//!   cursor --> [ z0 | z1 | z2 | z3 | ... | zN ]
//!                ^    ^    ^
//!               w0   w2   w1     each worker claims the next index,
//!                                processes it, then claims again
//! ```
//!
//! Every slab index is handed out exactly once, so a worker only ever writes
//! inside its own slab and no per-voxel locking is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::Volume;

/// Fans per-slab work out over rayon's pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlabDispatcher {
  workers: usize,
}

impl SlabDispatcher {
  /// Dispatcher with a fixed worker count (at least one).
  pub fn new(workers: usize) -> Self {
    Self {
      workers: workers.max(1),
    }
  }

  /// One worker per rayon thread.
  pub fn from_pool() -> Self {
    Self::new(rayon::current_num_threads())
  }

  /// Single worker, useful for reproducing ordering-sensitive issues.
  pub fn sequential() -> Self {
    Self::new(1)
  }

  #[inline]
  pub fn workers(&self) -> usize {
    self.workers
  }

  /// Run `work(z, slab)` for every z-slab of `volume` with mutable access.
  pub fn for_each_slab_mut<T, F>(&self, volume: &mut Volume<T>, work: F)
  where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
  {
    let plane = volume.shape().slab_len();
    if plane == 0 || volume.is_empty() {
      return;
    }
    // Each slot is taken exactly once, by whichever worker claimed its index.
    let slabs: Vec<Mutex<Option<&mut [T]>>> = volume
      .as_mut_slice()
      .chunks_mut(plane)
      .map(|slab| Mutex::new(Some(slab)))
      .collect();
    let cursor = AtomicUsize::new(0);
    let workers = self.workers.min(slabs.len());

    rayon::scope(|scope| {
      for _ in 0..workers {
        scope.spawn(|_| loop {
          let z = cursor.fetch_add(1, Ordering::Relaxed);
          let Some(slot) = slabs.get(z) else {
            break;
          };
          let claimed = slot.lock().ok().and_then(|mut guard| guard.take());
          if let Some(slab) = claimed {
            work(z, slab);
          }
        });
      }
    });
  }

  /// Evaluate `work(z, slab)` for every z-slab and collect results in slab
  /// order.
  pub fn map_slabs<T, R, F>(&self, volume: &Volume<T>, work: F) -> Vec<R>
  where
    T: Sync,
    R: Send,
    F: Fn(usize, &[T]) -> R + Sync,
  {
    let shape = volume.shape();
    if shape.slab_len() == 0 || volume.is_empty() {
      return Vec::new();
    }
    let results: Vec<Mutex<Option<R>>> = (0..shape.z).map(|_| Mutex::new(None)).collect();
    let cursor = AtomicUsize::new(0);
    let workers = self.workers.min(shape.z);

    rayon::scope(|scope| {
      for _ in 0..workers {
        scope.spawn(|_| loop {
          let z = cursor.fetch_add(1, Ordering::Relaxed);
          let Some(slot) = results.get(z) else {
            break;
          };
          let value = work(z, volume.slab(z));
          if let Ok(mut guard) = slot.lock() {
            *guard = Some(value);
          }
        });
      }
    });

    results
      .into_iter()
      .filter_map(|slot| slot.into_inner().ok().flatten())
      .collect()
  }
}

impl Default for SlabDispatcher {
  fn default() -> Self {
    Self::from_pool()
  }
}

#[cfg(test)]
#[path = "slab_test.rs"]
mod slab_test;
