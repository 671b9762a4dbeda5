//! Every qualifying voxel becomes a node.

use glam::IVec3;

use super::{unowned_chain, ExhaustiveParams, ExtractStats, Extraction, Extractor, VoxelOwnerMap};
use crate::error::Result;
use crate::grid::Volume;
use crate::tree::RootTree;

pub(super) fn run(ctx: &Extractor<'_>, seed: IVec3, params: &ExhaustiveParams) -> Result<Extraction> {
  let shape = ctx.volume.shape();
  let plane = shape.slab_len();
  let cost = ctx.paths.cost.as_slice();

  let qualifying: Vec<usize> = {
    let _span = tracing::debug_span!("exhaustive_scan").entered();
    ctx
      .dispatcher
      .map_slabs(ctx.volume, |z, slab| {
        let base = z * plane;
        slab
          .iter()
          .enumerate()
          .filter(|&(i, &value)| {
            let c = cost[base + i];
            value >= params.threshold && c.is_finite() && c <= params.cutoff
          })
          .map(|(i, _)| base + i)
          .collect::<Vec<_>>()
      })
      .into_iter()
      .flatten()
      .collect()
  };

  let mut tree = RootTree::new(seed, params.radius);
  let mut owner: VoxelOwnerMap = Volume::filled(shape, None);
  owner[seed] = Some(tree.root());
  let mut stats = ExtractStats {
    candidates: qualifying.len(),
    ..ExtractStats::default()
  };

  for index in qualifying {
    let pos = shape.coord(index);
    let Some((mut parent, chain)) = unowned_chain(ctx.paths, &owner, pos)? else {
      stats.dead_ends += 1;
      continue;
    };
    if chain.is_empty() {
      continue;
    }
    for &voxel in chain.iter().rev() {
      parent = tree.insert(parent, voxel, params.radius, 0)?;
      owner[voxel] = Some(parent);
    }
    stats.nodes_created += chain.len();
    stats.chains += 1;
  }

  let mask = owner.map(Option::is_some);
  Ok(Extraction { tree, mask, stats })
}

#[cfg(test)]
#[path = "exhaustive_test.rs"]
mod exhaustive_test;
