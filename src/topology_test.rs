use std::f64::consts::PI;
use std::sync::Arc;

use glam::DVec3;

use super::*;
use crate::cluster::Cluster;
use crate::math;
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

/// 3x3 lattice in the XY plane: point row = y * 3 + x, unit spacing.
fn grid() -> Cluster {
  let mut positions = Vec::new();
  for y in 0..3 {
    for x in 0..3 {
      positions.push(DVec3::new(x as f64, y as f64, 0.0));
    }
  }
  let mut pairs = Vec::new();
  for y in 0..3u32 {
    for x in 0..3u32 {
      let row = y * 3 + x;
      if x < 2 {
        pairs.push((row, row + 1));
      }
      if y < 2 {
        pairs.push((row, row + 3));
      }
    }
  }
  build(positions, &pairs)
}

#[test]
fn test_grid_finds_all_faces() {
  let cluster = grid();
  let projected = project_positions(&cluster, DVec3::Z);
  let cells = find_cells(&cluster, &projected, &CellConstraints::default());

  // Four unit faces plus the outer boundary loop
  assert_eq!(cells.len(), 5);
  let mut areas: Vec<f64> = cells.iter().map(|c| c.area).collect();
  areas.sort_by(f64::total_cmp);
  for area in &areas[..4] {
    assert!((area - 1.0).abs() < 1e-9);
  }
  assert!((areas[4] - 4.0).abs() < 1e-9);
}

#[test]
fn test_grid_unit_cells_constrained() {
  let cluster = grid();
  let projected = project_positions(&cluster, DVec3::Z);
  let constraints = CellConstraints {
    max_area: 2.0,
    ..CellConstraints::default()
  };
  let cells = find_cells(&cluster, &projected, &constraints);

  assert_eq!(cells.len(), 4);
  for cell in &cells {
    assert_eq!(cell.nodes.len(), 4);
    assert!((cell.area - 1.0).abs() < 1e-9);
    assert!((cell.perimeter - 4.0).abs() < 1e-9);
    assert!((cell.compactness - PI / 4.0).abs() < 1e-9);
    assert!(cell.is_convex);
  }
}

#[test]
fn test_winding_is_counter_clockwise() {
  let cluster = grid();
  let projected = project_positions(&cluster, DVec3::Z);
  for cell in find_cells(&cluster, &projected, &CellConstraints::default()) {
    let polygon: Vec<_> = cell.nodes.iter().map(|&n| projected[n as usize]).collect();
    assert!(math::signed_area(&polygon) >= 0.0);
  }
}

#[test]
fn test_triangle_deduped_by_signature() {
  // Inner and outer walks of a triangle span the same node set
  let cluster = build(
    vec![
      DVec3::new(0.0, 0.0, 0.0),
      DVec3::new(1.0, 0.0, 0.0),
      DVec3::new(0.0, 1.0, 0.0),
    ],
    &[(0, 1), (1, 2), (2, 0)],
  );
  let projected = project_positions(&cluster, DVec3::Z);
  let cells = find_cells(&cluster, &projected, &CellConstraints::default());

  assert_eq!(cells.len(), 1);
  assert!((cells[0].area - 0.5).abs() < 1e-9);
}

#[test]
fn test_two_node_walk_is_leaf() {
  let cluster = build(
    vec![DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)],
    &[(0, 1)],
  );
  let projected = project_positions(&cluster, DVec3::Z);
  assert_eq!(
    Cell::build(Link::new(0, 0), &cluster, &projected).err(),
    Some(CellError::Leaf)
  );
}

#[test]
fn test_collinear_chain_filtered_by_area() {
  let cluster = build(
    vec![
      DVec3::new(0.0, 0.0, 0.0),
      DVec3::new(1.0, 0.0, 0.0),
      DVec3::new(2.0, 0.0, 0.0),
      DVec3::new(3.0, 0.0, 0.0),
    ],
    &[(0, 1), (1, 2), (2, 3)],
  );
  let projected = project_positions(&cluster, DVec3::Z);

  // The chain closes into a degenerate zero-area loop
  let open = find_cells(&cluster, &projected, &CellConstraints::default());
  assert_eq!(open.len(), 1);
  assert!(open[0].area < 1e-9);

  let constraints = CellConstraints {
    min_area: 0.1,
    ..CellConstraints::default()
  };
  assert!(find_cells(&cluster, &projected, &constraints).is_empty());
}

#[test]
fn test_concave_cycle_and_shape_filters() {
  // L-shaped hexagonal cycle
  let cluster = build(
    vec![
      DVec3::new(0.0, 0.0, 0.0),
      DVec3::new(2.0, 0.0, 0.0),
      DVec3::new(2.0, 1.0, 0.0),
      DVec3::new(1.0, 1.0, 0.0),
      DVec3::new(1.0, 2.0, 0.0),
      DVec3::new(0.0, 2.0, 0.0),
    ],
    &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)],
  );
  let projected = project_positions(&cluster, DVec3::Z);

  let cells = find_cells(&cluster, &projected, &CellConstraints::default());
  assert_eq!(cells.len(), 1);
  assert!((cells[0].area - 3.0).abs() < 1e-9);
  assert!(!cells[0].is_convex);

  let convex_only = CellConstraints {
    convex_only: true,
    ..CellConstraints::default()
  };
  assert!(find_cells(&cluster, &projected, &convex_only).is_empty());

  let concave_only = CellConstraints {
    concave_only: true,
    ..CellConstraints::default()
  };
  assert_eq!(find_cells(&cluster, &projected, &concave_only).len(), 1);
}

#[test]
fn test_wrapper_is_outer_hull() {
  let mut cluster = grid();
  let projected = project_positions(&cluster, DVec3::Z);
  let wrapper = find_wrapper(&mut cluster, &projected).unwrap();

  assert!((wrapper.area - 4.0).abs() < 1e-9);
  assert_eq!(wrapper.nodes.len(), 8);
}

#[test]
fn test_cell_edges_align_with_nodes() {
  let cluster = grid();
  let projected = project_positions(&cluster, DVec3::Z);
  for cell in find_cells(&cluster, &projected, &CellConstraints::default()) {
    assert_eq!(cell.nodes.len(), cell.edges.len());
    let n = cell.nodes.len();
    for i in 0..n {
      let edge = cluster.edge(cell.edges[i]);
      let a = cluster.node(cell.nodes[i]).point_index;
      let b = cluster.node(cell.nodes[(i + 1) % n]).point_index;
      assert!(edge.contains(a) && edge.contains(b));
    }
  }
}
