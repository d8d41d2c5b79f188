//! Path reconstruction from stopped diffusions.
//!
//! Walks a diffusion's travel links backward from its endpoints to the
//! seed. Full mode emits one complete seed-to-endpoint path per endpoint;
//! partition mode segments the history so adjacent output paths share
//! only their boundary node, avoiding the trunk duplication full mode
//! produces when many endpoints hang off one common stem.

use std::collections::HashSet;

use crate::cluster::Cluster;
use crate::fill::Diffusion;
use crate::tables::PathTable;

/// Sort key for partition emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionKey {
  /// Path distance at the endpoint.
  Length,
  /// Path score at the endpoint.
  Score,
  /// Hop depth at the endpoint.
  Depth,
}

/// What path tables a diffusion produces.
#[derive(Clone, Debug)]
pub enum PathOutput {
  None,
  Full,
  Partitions { key: PartitionKey, ascending: bool },
}

impl Default for PathOutput {
  fn default() -> Self {
    PathOutput::None
  }
}

/// Reconstruct the configured path tables for one stopped diffusion.
pub fn build_paths(
  cluster: &Cluster,
  diffusion: &Diffusion,
  output: &PathOutput,
  tags: &[String],
) -> Vec<PathTable> {
  match output {
    PathOutput::None => Vec::new(),
    PathOutput::Full => build_full_paths(cluster, diffusion, tags),
    PathOutput::Partitions { key, ascending } => {
      build_partitions(cluster, diffusion, *key, *ascending, tags)
    }
  }
}

/// One complete seed-to-endpoint path per diffusion endpoint.
pub fn build_full_paths(cluster: &Cluster, diffusion: &Diffusion, tags: &[String]) -> Vec<PathTable> {
  sorted_endpoints(diffusion, PartitionKey::Length, true)
    .into_iter()
    .filter_map(|endpoint| {
      let mut nodes = walk_back(diffusion, endpoint, None);
      nodes.reverse();
      emit(cluster, &nodes, tags)
    })
    .collect()
}

/// Segment the visited history so only segment boundary nodes overlap
/// between adjacent partitions.
pub fn build_partitions(
  cluster: &Cluster,
  diffusion: &Diffusion,
  key: PartitionKey,
  ascending: bool,
  tags: &[String],
) -> Vec<PathTable> {
  let mut claimed: HashSet<u32> = HashSet::new();
  let mut out = Vec::new();

  for endpoint in sorted_endpoints(diffusion, key, ascending) {
    if claimed.contains(&endpoint) {
      continue;
    }
    let mut nodes = walk_back(diffusion, endpoint, Some(&claimed));
    claimed.extend(nodes.iter().copied());
    nodes.reverse();
    if let Some(path) = emit(cluster, &nodes, tags) {
      out.push(path);
    }
  }

  out
}

/// Endpoints ordered by the capture-time key, ties broken by node index.
fn sorted_endpoints(diffusion: &Diffusion, key: PartitionKey, ascending: bool) -> Vec<u32> {
  let key_of = |node: u32| -> f64 {
    match diffusion.capture_of(node) {
      Some(capture) => match key {
        PartitionKey::Length => capture.distance,
        PartitionKey::Score => capture.score,
        PartitionKey::Depth => capture.depth as f64,
      },
      None => 0.0,
    }
  };

  let mut endpoints: Vec<u32> = diffusion.endpoints().iter().copied().collect();
  endpoints.sort_by(|&a, &b| {
    let key = key_of(a).total_cmp(&key_of(b));
    let key = if ascending { key } else { key.reverse() };
    // Ties always go to the lower node index
    key.then(a.cmp(&b))
  });
  endpoints
}

/// Travel-link walk from `endpoint` toward the seed, endpoint first.
/// With a claim set, the walk includes the first claimed node it hits
/// (the shared boundary) and stops there.
fn walk_back(diffusion: &Diffusion, endpoint: u32, claimed: Option<&HashSet<u32>>) -> Vec<u32> {
  let mut nodes = vec![endpoint];
  let mut current = endpoint;
  while let Some(link) = diffusion.travel_link(current) {
    current = link.node;
    nodes.push(current);
    if let Some(claimed) = claimed {
      if claimed.contains(&current) {
        break;
      }
    }
  }
  nodes
}

/// Copy rows out of the vertex table; paths shorter than 2 nodes are
/// dropped.
fn emit(cluster: &Cluster, nodes: &[u32], tags: &[String]) -> Option<PathTable> {
  if nodes.len() < 2 {
    return None;
  }
  let rows = cluster.gather_point_indices(nodes);
  let positions = rows.iter().map(|&r| cluster.points().position(r)).collect();
  Some(PathTable {
    rows,
    positions,
    tags: tags.to_vec(),
  })
}

#[cfg(test)]
#[path = "paths_test.rs"]
mod paths_test;
