//! Graph edges and their cached bounding spheres.

use glam::DVec3;

use crate::octree::Aabb;

/// A graph edge referencing two vertex-table rows and one edge-table row.
///
/// Undirected in topology; `start`/`end` order is preserved for
/// direction-dependent consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
  pub index: u32,
  /// Vertex-table row of the start point.
  pub start: u32,
  /// Vertex-table row of the end point. Never equal to `start`.
  pub end: u32,
  pub edge_table_row: u32,
  pub io_index: i32,
}

impl Edge {
  pub fn new(index: u32, start: u32, end: u32, edge_table_row: u32, io_index: i32) -> Self {
    Self {
      index,
      start,
      end,
      edge_table_row,
      io_index,
    }
  }

  /// The opposite vertex row of `point`.
  #[inline]
  pub fn other(&self, point: u32) -> u32 {
    if point == self.start {
      self.end
    } else {
      self.start
    }
  }

  /// True when `point` is one of the two endpoints.
  #[inline]
  pub fn contains(&self, point: u32) -> bool {
    point == self.start || point == self.end
  }
}

/// Sphere bounds over an edge: centered on the midpoint, radius half the
/// edge length. Octree item for edge-proximity queries.
#[derive(Clone, Copy, Debug)]
pub struct BoundedEdge {
  pub index: u32,
  pub bounds: Aabb,
}

impl BoundedEdge {
  pub fn new(index: u32, start: DVec3, end: DVec3) -> Self {
    let center = (start + end) * 0.5;
    let radius = (end - start).length() * 0.5;
    Self {
      index,
      bounds: Aabb::from_sphere(center, radius),
    }
  }
}
