//! Gap-closing relaxation.
//!
//! Expensive voxels (at or above a fraction of the volume maximum) are gap
//! voxels. A path may run through them for a bounded physical length:
//!
//! ```text
//!   anchor   gap   gap   gap   landing
//!     o------x-----x-----x------o
//!   cost[a]                     cost[a] + intensity(landing) * (k + 1)
//! ```
//!
//! When the path lands on a cheap voxel again, the landing cost is re-priced
//! from the anchor as if all `k` bridged voxels cost as much as the landing
//! voxel, and the run is tagged with a gap id owned by the anchor.

use super::{Offer, SearchState};
use crate::grid::{Shape, Volume};
use crate::neighborhood::Edge;

pub(crate) struct GapState {
  threshold: f64,
  max_length: f64,
  /// Physical length of the gap run ending at each voxel; zero off-gap.
  run: Vec<f64>,
  ids: Volume<Option<u32>>,
  next_id: u32,
}

impl GapState {
  pub fn new(intensity: &Volume<f32>, cost_fraction: f64, max_length: f64) -> Self {
    let max = intensity.max_value().map_or(0.0, f64::from);
    let threshold = max * cost_fraction;
    tracing::debug!(threshold, max_length, "gap closing enabled");
    Self {
      threshold,
      max_length,
      run: vec![0.0; intensity.len()],
      ids: Volume::filled(intensity.shape(), None),
      next_id: 0,
    }
  }

  #[inline]
  fn is_gap(&self, value: f64) -> bool {
    value >= self.threshold
  }

  pub fn relax(
    &mut self,
    state: &mut SearchState,
    shape: Shape,
    u: usize,
    v: usize,
    edge: &Edge,
    value: f64,
  ) {
    let run_u = self.run[u];
    let cost_u = f64::from(state.cost.as_slice()[u]);

    if !self.is_gap(value) {
      if run_u > 0.0 {
        let (anchor, bridged) = self.trace_run(state, shape, u);
        let candidate =
          f64::from(state.cost.as_slice()[anchor]) + value * (bridged.len() + 1) as f64;
        if state.offer(v, candidate, edge.code) == Offer::Best {
          self.run[v] = 0.0;
          self.tag(anchor, &bridged, v);
          state.stats.gaps_closed += 1;
        }
      } else if state.offer(v, cost_u + value * edge.weight, edge.code) == Offer::Best {
        self.run[v] = 0.0;
      }
    } else if run_u < self.max_length
      && state.offer(v, cost_u + value * edge.weight, edge.code) == Offer::Best
    {
      self.run[v] = run_u + edge.weight;
    }
  }

  /// Walk back from `u` through the gap run to the first non-gap voxel.
  ///
  /// Returns the anchor index and the bridged run, nearest first.
  fn trace_run(&self, state: &SearchState, shape: Shape, u: usize) -> (usize, Vec<usize>) {
    let mut bridged = Vec::new();
    let mut cur = u;
    while self.run[cur] > 0.0 && bridged.len() < self.run.len() {
      let code = state.pred.as_slice()[cur].code;
      let pos = shape.coord(cur);
      let Some(next) = shape.index(pos + code.offset()).filter(|_| code.has_predecessor()) else {
        break;
      };
      bridged.push(cur);
      cur = next;
    }
    (cur, bridged)
  }

  fn tag(&mut self, anchor: usize, bridged: &[usize], landing: usize) {
    let ids = self.ids.as_mut_slice();
    let id = match ids[anchor] {
      Some(id) => id,
      None => {
        let id = self.next_id;
        self.next_id += 1;
        ids[anchor] = Some(id);
        id
      }
    };
    for &i in bridged {
      ids[i] = Some(id);
    }
    ids[landing] = Some(id);
  }

  pub fn into_ids(self) -> Volume<Option<u32>> {
    self.ids
  }
}
