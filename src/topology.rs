//! Cell and hull discovery over a planar-projected cluster.
//!
//! A cell is a closed face of the projected graph, traced by guided
//! half-edge walking: at each node the walk takes the next link
//! counter-clockwise from the reversed arrival direction. The outer hull
//! is the wrapper cell reached from a point outside the cluster bounds.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use glam::{DVec2, DVec3};

use crate::cluster::{Cluster, Link};
use crate::math;

/// Why a walk failed to produce a usable cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellError {
  /// The walk re-entered a directed half-edge without closing on the
  /// seed node.
  Open,
  /// The walk exceeded the step failsafe (twice the edge count).
  Malformed,
  /// The closed loop spans two or fewer unique nodes.
  Leaf,
}

/// One closed face of the projected graph, wound counter-clockwise.
#[derive(Clone, Debug)]
pub struct Cell {
  pub nodes: Vec<u32>,
  /// `edges[i]` connects `nodes[i]` to `nodes[(i + 1) % len]`.
  pub edges: Vec<u32>,
  pub area: f64,
  pub perimeter: f64,
  pub centroid: DVec2,
  pub compactness: f64,
  pub is_convex: bool,
}

impl Cell {
  /// Walk a cell starting at `seed.node` across `seed.edge`.
  pub fn build(seed: Link, cluster: &Cluster, projected: &[DVec2]) -> Result<Self, CellError> {
    let seed_edge = cluster.edge(seed.edge);
    let seed_to = {
      let other_row = seed_edge.other(cluster.node(seed.node).point_index);
      match cluster.node_index_of_point(other_row) {
        Some(index) => index,
        None => return Err(CellError::Open),
      }
    };

    let failsafe = cluster.edges().len() * 2;
    let mut nodes = vec![seed.node];
    let mut edges = vec![seed.edge];
    let mut seen: HashSet<(u32, u32)> = HashSet::new();
    seen.insert((seed.node, seed_to));

    let mut from = seed.node;
    let mut to = seed_to;
    let mut arrival_edge = seed.edge;
    let mut steps = 0usize;

    while to != seed.node {
      steps += 1;
      if steps > failsafe {
        return Err(CellError::Malformed);
      }

      nodes.push(to);

      let node = cluster.node(to);
      let next = if node.is_leaf() {
        // Dead end: U-turn back along the arrival edge
        Link::new(from, arrival_edge)
      } else {
        let back = projected[from as usize] - projected[to as usize];
        let mut best: Option<(f64, Link)> = None;
        for &link in &node.links {
          if link.edge == arrival_edge {
            continue;
          }
          let dir = projected[link.node as usize] - projected[to as usize];
          let angle = math::ccw_angle(back, dir);
          let better = match best {
            Some((best_angle, best_link)) => {
              angle < best_angle || (angle == best_angle && link.node < best_link.node)
            }
            None => true,
          };
          if better {
            best = Some((angle, link));
          }
        }
        match best {
          Some((_, link)) => link,
          None => Link::new(from, arrival_edge),
        }
      };

      if !seen.insert((to, next.node)) {
        return Err(CellError::Open);
      }
      edges.push(next.edge);
      from = to;
      to = next.node;
      arrival_edge = next.edge;
    }

    let unique: HashSet<u32> = nodes.iter().copied().collect();
    if unique.len() <= 2 {
      return Err(CellError::Leaf);
    }

    let mut polygon: Vec<DVec2> = nodes.iter().map(|&n| projected[n as usize]).collect();
    let signed = math::signed_area(&polygon);
    if signed < 0.0 {
      // Enforce counter-clockwise winding
      nodes.reverse();
      nodes.rotate_right(1);
      edges.reverse();
      polygon = nodes.iter().map(|&n| projected[n as usize]).collect();
    }

    let area = signed.abs();
    let perimeter = math::perimeter(&polygon);
    let compactness = if perimeter > 0.0 {
      4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
    } else {
      0.0
    };
    let centroid = polygon.iter().copied().sum::<DVec2>() / polygon.len() as f64;

    Ok(Self {
      is_convex: math::is_convex(&polygon),
      nodes,
      edges,
      area,
      perimeter,
      centroid,
      compactness,
    })
  }

  /// Order-independent identity of this cell's node set, for duplicate
  /// suppression.
  pub fn signature(&self) -> u64 {
    let mut sorted = self.nodes.clone();
    sorted.sort_unstable();
    sorted.dedup();
    let mut hasher = DefaultHasher::new();
    sorted.hash(&mut hasher);
    hasher.finish()
  }

  /// Directed half-edges this cell consumed while walking.
  fn half_edges(&self) -> Vec<(u32, u32)> {
    let n = self.nodes.len();
    (0..n).map(|i| (self.nodes[i], self.nodes[(i + 1) % n])).collect()
  }
}

/// Size and shape filters applied to discovered cells.
#[derive(Clone, Debug)]
pub struct CellConstraints {
  pub min_points: usize,
  pub max_points: usize,
  pub min_area: f64,
  pub max_area: f64,
  pub min_perimeter: f64,
  pub max_perimeter: f64,
  pub convex_only: bool,
  pub concave_only: bool,
}

impl Default for CellConstraints {
  fn default() -> Self {
    Self {
      min_points: 3,
      max_points: usize::MAX,
      min_area: 0.0,
      max_area: f64::INFINITY,
      min_perimeter: 0.0,
      max_perimeter: f64::INFINITY,
      convex_only: false,
      concave_only: false,
    }
  }
}

impl CellConstraints {
  pub fn accepts(&self, cell: &Cell) -> bool {
    let points = {
      let unique: HashSet<u32> = cell.nodes.iter().copied().collect();
      unique.len()
    };
    points >= self.min_points
      && points <= self.max_points
      && cell.area >= self.min_area
      && cell.area <= self.max_area
      && cell.perimeter >= self.min_perimeter
      && cell.perimeter <= self.max_perimeter
      && (!self.convex_only || cell.is_convex)
      && (!self.concave_only || !cell.is_convex)
  }
}

/// Project node positions onto the plane perpendicular to `up`.
pub fn project_positions(cluster: &Cluster, up: DVec3) -> Vec<DVec2> {
  let (u, v) = up.normalize_or_zero().any_orthonormal_pair();
  (0..cluster.nodes().len() as u32)
    .map(|i| {
      let p = cluster.node_position(i);
      DVec2::new(p.dot(u), p.dot(v))
    })
    .collect()
}

/// Discover every unique closed cell satisfying the constraints.
///
/// Each undirected edge seeds two directed walks; half-edges consumed by
/// an accepted cell are not walked again.
pub fn find_cells(cluster: &Cluster, projected: &[DVec2], constraints: &CellConstraints) -> Vec<Cell> {
  let mut consumed: HashSet<(u32, u32)> = HashSet::new();
  let mut signatures: HashSet<u64> = HashSet::new();
  let mut out = Vec::new();

  for node in cluster.nodes() {
    for link in &node.links {
      if consumed.contains(&(node.index, link.node)) {
        continue;
      }
      let Ok(cell) = Cell::build(Link::new(node.index, link.edge), cluster, projected) else {
        continue;
      };
      if !constraints.accepts(&cell) || !signatures.insert(cell.signature()) {
        continue;
      }
      consumed.extend(cell.half_edges());
      out.push(cell);
    }
  }

  out
}

/// The outer hull: the wrapper cell walked from a point outside the
/// cluster bounds.
pub fn find_wrapper(cluster: &mut Cluster, projected: &[DVec2]) -> Option<Cell> {
  let outside = cluster.bounds.min - DVec3::splat(10.0);
  let edge_index = cluster.find_closest_edge(outside)?;
  let edge = *cluster.edge(edge_index);
  let na = cluster.node_index_of_point(edge.start)?;
  let nb = cluster.node_index_of_point(edge.end)?;

  // Both directions of the boundary edge; the hull is the larger loop
  let a = Cell::build(Link::new(na, edge_index), cluster, projected).ok();
  let b = Cell::build(Link::new(nb, edge_index), cluster, projected).ok();
  match (a, b) {
    (Some(a), Some(b)) => Some(if a.area >= b.area { a } else { b }),
    (Some(a), None) => Some(a),
    (None, Some(b)) => Some(b),
    (None, None) => None,
  }
}

#[cfg(test)]
#[path = "topology_test.rs"]
mod topology_test;
