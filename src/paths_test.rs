use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use glam::DVec3;

use super::*;
use crate::fill::{flood_fill, FillControl, FillControls, FloodConfig};
use crate::tables::{identity_lookup, EdgeTable, PointTable};

fn build(positions: Vec<DVec3>, edge_pairs: &[(u32, u32)]) -> Cluster {
  let n = positions.len();
  let points = Arc::new(PointTable::from_positions(positions));
  let mut edges = EdgeTable::new();
  for &(a, b) in edge_pairs {
    edges.push(a, b);
  }
  Cluster::build_from(points, &edges, &identity_lookup(n), None, 0).unwrap()
}

fn line(n: usize) -> Cluster {
  let positions = (0..n).map(|i| DVec3::new(i as f64, 0.0, 0.0)).collect();
  let pairs: Vec<(u32, u32)> = (0..n as u32 - 1).map(|i| (i, i + 1)).collect();
  build(positions, &pairs)
}

/// Trunk 0-1-2 with two branches off node 2: 2-3-4 and 2-5-6.
fn fork() -> Cluster {
  build(
    vec![
      DVec3::new(0.0, 0.0, 0.0),
      DVec3::new(1.0, 0.0, 0.0),
      DVec3::new(2.0, 0.0, 0.0),
      DVec3::new(3.0, 0.0, 0.0),
      DVec3::new(4.0, 0.0, 0.0),
      DVec3::new(2.0, 1.0, 0.0),
      DVec3::new(2.0, 2.0, 0.0),
    ],
    &[(0, 1), (1, 2), (2, 3), (3, 4), (2, 5), (5, 6)],
  )
}

fn diffuse(cluster: &mut Cluster, seed: DVec3, config: &FloodConfig) -> crate::fill::Diffusion {
  let cancel = AtomicBool::new(false);
  let mut result = flood_fill(cluster, &[seed], config, &cancel).unwrap();
  result.diffusions.remove(0)
}

#[test]
fn test_full_path_round_trip() {
  let mut cluster = line(5);
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &FloodConfig::default());

  let paths = build_full_paths(&cluster, &diffusion, &[]);
  assert_eq!(paths.len(), 1);

  // The single path is exactly the visited sequence, no duplicates
  assert_eq!(paths[0].rows, vec![0, 1, 2, 3, 4]);
  let unique: HashSet<u32> = paths[0].rows.iter().copied().collect();
  assert_eq!(unique.len(), paths[0].rows.len());
  assert_eq!(
    paths[0].rows,
    cluster.gather_point_indices(&diffusion.visited_nodes)
  );
}

#[test]
fn test_full_path_per_endpoint() {
  let mut cluster = fork();
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &FloodConfig::default());

  let paths = build_full_paths(&cluster, &diffusion, &[]);
  assert_eq!(paths.len(), 2);
  // Both full paths duplicate the shared trunk
  for path in &paths {
    assert_eq!(&path.rows[..3], &[0, 1, 2]);
    assert_eq!(path.rows.len(), 5);
  }
}

#[test]
fn test_partitions_share_only_boundary() {
  let mut cluster = fork();
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &FloodConfig::default());

  let partitions = build_partitions(&cluster, &diffusion, PartitionKey::Length, false, &[]);
  assert_eq!(partitions.len(), 2);

  // First partition runs seed to endpoint, second stops at the fork
  assert_eq!(partitions[0].rows.len(), 5);
  assert_eq!(partitions[1].rows.len(), 3);

  let a: HashSet<u32> = partitions[0].rows.iter().copied().collect();
  let b: HashSet<u32> = partitions[1].rows.iter().copied().collect();
  let shared: Vec<u32> = a.intersection(&b).copied().collect();
  assert_eq!(shared, vec![2]);
}

#[test]
fn test_partition_ties_break_by_lower_node() {
  // Both branches of the fork end at equal distance from the seed;
  // descending order must still pick the lower-index endpoint first
  let mut cluster = fork();
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &FloodConfig::default());

  let partitions = build_partitions(&cluster, &diffusion, PartitionKey::Length, false, &[]);
  assert_eq!(partitions[0].rows, vec![0, 1, 2, 3, 4]);
  assert_eq!(partitions[1].rows, vec![2, 5, 6]);
}

#[test]
fn test_partitions_cover_all_visited() {
  let mut cluster = fork();
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &FloodConfig::default());

  let partitions = build_partitions(&cluster, &diffusion, PartitionKey::Depth, true, &[]);
  let mut covered: HashSet<u32> = HashSet::new();
  for partition in &partitions {
    covered.extend(partition.rows.iter().copied());
  }
  let visited: HashSet<u32> =
    cluster.gather_point_indices(&diffusion.visited_nodes).into_iter().collect();
  assert_eq!(covered, visited);
}

#[test]
fn test_short_paths_dropped() {
  // Depth 0 stops the diffusion at its seed; a 1-node path is dropped
  let mut cluster = line(3);
  let config =
    FloodConfig::default().with_controls(FillControls::new(vec![FillControl::MaxDepth(0)]));
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &config);

  assert!(build_full_paths(&cluster, &diffusion, &[]).is_empty());
  assert!(build_partitions(&cluster, &diffusion, PartitionKey::Length, true, &[]).is_empty());
}

#[test]
fn test_tags_forwarded() {
  let mut cluster = line(4);
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &FloodConfig::default());
  let tags = vec!["seed:a".to_string(), "run:7".to_string()];

  let paths = build_paths(&cluster, &diffusion, &PathOutput::Full, &tags);
  assert_eq!(paths.len(), 1);
  assert_eq!(paths[0].tags, tags);

  assert!(build_paths(&cluster, &diffusion, &PathOutput::None, &tags).is_empty());
}

#[test]
fn test_path_positions_copied() {
  let mut cluster = line(3);
  let diffusion = diffuse(&mut cluster, DVec3::ZERO, &FloodConfig::default());

  let paths = build_full_paths(&cluster, &diffusion, &[]);
  assert_eq!(
    paths[0].positions,
    vec![
      DVec3::new(0.0, 0.0, 0.0),
      DVec3::new(1.0, 0.0, 0.0),
      DVec3::new(2.0, 0.0, 0.0),
    ]
  );
}
