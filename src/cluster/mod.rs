//! Cluster graph: construction, mirroring and proximity queries.
//!
//! A cluster is built once from a vertex/edge table pair and then treated
//! as read-only topology. Spatial indexes (node and edge octrees) build
//! lazily on first access and are invalidated when positions change.
//!
//! # Usage
//!
//! ```ignore
//! let cluster = Cluster::build_from(points, &edges, &lookup, None, 0)?;
//! let seed = cluster.find_closest_node(seed_pos, ClosestSearchMode::Node, 0);
//! ```
//!
//! Lazy octree builds are not safe to trigger from multiple threads at
//! once; call [`Cluster::rebuild_octree`] before parallel reads.

pub mod edge;
pub mod node;

pub use edge::{BoundedEdge, Edge};
pub use node::{Link, Node};

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use glam::DVec3;

use crate::error::ClusterBuildError;
use crate::math;
use crate::octree::{Aabb, ItemOctree};
use crate::tables::{unpack_endpoints, EdgeTable, EndpointLookup, PointTable};

/// Padding applied to cluster bounds so boundary octree queries stay
/// well-conditioned.
const BOUNDS_PADDING: f64 = 10.0;

/// Which spatial index to (re)build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OctreeMode {
  Nodes,
  Edges,
}

/// How `find_closest_node` measures proximity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosestSearchMode {
  /// Distance to node positions.
  Node,
  /// Distance to edge segments, then the closer endpoint.
  Edge,
}

/// The in-memory graph over one vertex/edge table pair.
///
/// Node and edge sequences are behind `Arc` so mirrors can share them;
/// octrees and caches are always private to one instance.
pub struct Cluster {
  points: Arc<PointTable>,
  nodes: Arc<Vec<Node>>,
  edges: Arc<Vec<Edge>>,
  /// Vertex-table row to node index.
  point_lookup: HashMap<u32, u32>,
  pub bounds: Aabb,
  node_octree: Option<ItemOctree>,
  edge_octree: Option<ItemOctree>,
  bounded_edges: Option<Arc<Vec<BoundedEdge>>>,
  edge_lengths: Option<Vec<f64>>,
}

impl Cluster {
  /// Build a cluster from an edge table.
  ///
  /// Each edge row's packed endpoints resolve to vertex rows through
  /// `lookup`. Any dangling endpoint or self-loop fails the whole build
  /// with no partial state. `expected_adjacency` (indexed by vertex row)
  /// rejects nodes that came out with fewer links than expected; more is
  /// acceptable.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(edges = edge_table.len())))]
  pub fn build_from(
    points: Arc<PointTable>,
    edge_table: &EdgeTable,
    lookup: &EndpointLookup,
    expected_adjacency: Option<&[u32]>,
    io_index: i32,
  ) -> Result<Self, ClusterBuildError> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut point_lookup: HashMap<u32, u32> = HashMap::new();
    let mut edges: Vec<Edge> = Vec::with_capacity(edge_table.len());
    let mut bounds: Option<Aabb> = None;

    for (row, &packed) in edge_table.endpoints.iter().enumerate() {
      let row = row as u32;
      let (ea, eb) = unpack_endpoints(packed);

      let ra = *lookup
        .get(&ea)
        .ok_or(ClusterBuildError::DanglingEndpoint { edge_row: row, endpoint: ea })?;
      let rb = *lookup
        .get(&eb)
        .ok_or(ClusterBuildError::DanglingEndpoint { edge_row: row, endpoint: eb })?;

      if ra == rb {
        return Err(ClusterBuildError::SelfLoop { edge_row: row, row: ra });
      }

      let na = get_or_create_node(&mut nodes, &mut point_lookup, &mut bounds, &points, ra);
      let nb = get_or_create_node(&mut nodes, &mut point_lookup, &mut bounds, &points, rb);

      nodes[na as usize].link(Link::new(nb, row));
      nodes[nb as usize].link(Link::new(na, row));
      edges.push(Edge::new(row, ra, rb, row, io_index));
    }

    if let Some(expected) = expected_adjacency {
      for node in &nodes {
        let want = expected.get(node.point_index as usize).copied().unwrap_or(0);
        if (node.num_links() as u32) < want {
          return Err(ClusterBuildError::AdjacencyMismatch {
            row: node.point_index,
            expected: want,
            actual: node.num_links() as u32,
          });
        }
      }
    }

    let bounds = bounds
      .unwrap_or_else(|| Aabb::from_point(DVec3::ZERO))
      .expanded(BOUNDS_PADDING);

    Ok(Self {
      points,
      nodes: Arc::new(nodes),
      edges: Arc::new(edges),
      point_lookup,
      bounds,
      node_octree: None,
      edge_octree: None,
      bounded_edges: None,
      edge_lengths: None,
    })
  }

  /// Build a cluster from an already-partitioned edge set (e.g. one
  /// connected component), re-deriving dense node indices from the edge
  /// list alone. Edge endpoints are vertex rows here, no lookup needed.
  pub fn from_subgraph(points: Arc<PointTable>, sub_edges: &[Edge]) -> Self {
    let mut nodes: Vec<Node> = Vec::new();
    let mut point_lookup: HashMap<u32, u32> = HashMap::new();
    let mut edges: Vec<Edge> = Vec::with_capacity(sub_edges.len());
    let mut bounds: Option<Aabb> = None;

    for (i, e) in sub_edges.iter().enumerate() {
      let index = i as u32;
      let na = get_or_create_node(&mut nodes, &mut point_lookup, &mut bounds, &points, e.start);
      let nb = get_or_create_node(&mut nodes, &mut point_lookup, &mut bounds, &points, e.end);
      nodes[na as usize].link(Link::new(nb, index));
      nodes[nb as usize].link(Link::new(na, index));
      edges.push(Edge::new(index, e.start, e.end, e.edge_table_row, e.io_index));
    }

    let bounds = bounds
      .unwrap_or_else(|| Aabb::from_point(DVec3::ZERO))
      .expanded(BOUNDS_PADDING);

    Self {
      points,
      nodes: Arc::new(nodes),
      edges: Arc::new(edges),
      point_lookup,
      bounds,
      node_octree: None,
      edge_octree: None,
      bounded_edges: None,
      edge_lengths: None,
    }
  }

  /// Create a view over this cluster's topology with private octrees.
  ///
  /// Node/edge sequences are shared unless the corresponding copy flag is
  /// set (deep copies allow independent filtering/renumbering). The
  /// bounded-edge cache is shared only while edges are shared.
  pub fn mirror(&self, copy_nodes: bool, copy_edges: bool) -> Self {
    let nodes = if copy_nodes {
      Arc::new((*self.nodes).clone())
    } else {
      Arc::clone(&self.nodes)
    };
    let edges = if copy_edges {
      Arc::new((*self.edges).clone())
    } else {
      Arc::clone(&self.edges)
    };
    let bounded_edges = if copy_edges { None } else { self.bounded_edges.clone() };

    Self {
      points: Arc::clone(&self.points),
      nodes,
      edges,
      point_lookup: self.point_lookup.clone(),
      bounds: self.bounds,
      node_octree: None,
      edge_octree: None,
      bounded_edges,
      edge_lengths: self.edge_lengths.clone(),
    }
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  pub fn points(&self) -> &PointTable {
    &self.points
  }

  #[inline]
  pub fn node(&self, index: u32) -> &Node {
    &self.nodes[index as usize]
  }

  #[inline]
  pub fn edge(&self, index: u32) -> &Edge {
    &self.edges[index as usize]
  }

  /// Node index holding the given vertex row, if the row is in the graph.
  pub fn node_index_of_point(&self, row: u32) -> Option<u32> {
    self.point_lookup.get(&row).copied()
  }

  /// World position of a node.
  #[inline]
  pub fn node_position(&self, index: u32) -> DVec3 {
    self.points.position(self.nodes[index as usize].point_index)
  }

  /// Vertex rows of the given nodes.
  pub fn gather_point_indices(&self, node_indices: &[u32]) -> Vec<u32> {
    node_indices
      .iter()
      .map(|&i| self.nodes[i as usize].point_index)
      .collect()
  }

  // ===========================================================================
  // Spatial indexes
  // ===========================================================================

  /// (Re)build one spatial index. Idempotent unless `force` is set.
  pub fn rebuild_octree(&mut self, mode: OctreeMode, force: bool) {
    match mode {
      OctreeMode::Nodes => {
        if force {
          self.node_octree = None;
        }
        if self.node_octree.is_none() {
          self.node_octree = Some(build_node_octree(&self.points, &self.nodes, &self.bounds));
        }
      }
      OctreeMode::Edges => {
        if force {
          self.edge_octree = None;
          self.bounded_edges = None;
        }
        if self.edge_octree.is_none() {
          let bounded = self.bounded_edges_arc();
          self.edge_octree = Some(build_edge_octree(&bounded, &self.bounds));
        }
      }
    }
  }

  /// Node octree, built on first access.
  pub fn node_octree(&mut self) -> &ItemOctree {
    self.rebuild_octree(OctreeMode::Nodes, false);
    self.node_octree.as_ref().unwrap()
  }

  /// Edge octree, built on first access.
  pub fn edge_octree(&mut self) -> &ItemOctree {
    self.rebuild_octree(OctreeMode::Edges, false);
    self.edge_octree.as_ref().unwrap()
  }

  /// Edge bounding spheres, computed on first access.
  pub fn bounded_edges(&mut self) -> &[BoundedEdge] {
    let _ = self.bounded_edges_arc();
    self.bounded_edges.as_ref().unwrap()
  }

  fn bounded_edges_arc(&mut self) -> Arc<Vec<BoundedEdge>> {
    if self.bounded_edges.is_none() {
      let bounded: Vec<BoundedEdge> = self
        .edges
        .iter()
        .map(|e| {
          BoundedEdge::new(e.index, self.points.position(e.start), self.points.position(e.end))
        })
        .collect();
      self.bounded_edges = Some(Arc::new(bounded));
    }
    Arc::clone(self.bounded_edges.as_ref().unwrap())
  }

  /// Invalidate spatial indexes and caches before mutating positions.
  pub fn will_modify_positions(&mut self) {
    self.node_octree = None;
    self.edge_octree = None;
    self.bounded_edges = None;
    self.edge_lengths = None;
  }

  /// Release spatial indexes and caches once a batch is written back.
  pub fn flush(&mut self) {
    self.node_octree = None;
    self.edge_octree = None;
    self.bounded_edges = None;
    self.edge_lengths = None;
  }

  // ===========================================================================
  // Edge geometry
  // ===========================================================================

  /// Length of one edge, computed from current positions.
  #[inline]
  pub fn edge_length(&self, edge: u32) -> f64 {
    let e = &self.edges[edge as usize];
    (self.points.position(e.end) - self.points.position(e.start)).length()
  }

  /// Compute and cache all edge lengths. With `normalize`, lengths are
  /// divided by the longest edge.
  pub fn compute_edge_lengths(&mut self, normalize: bool) -> &[f64] {
    if self.edge_lengths.is_none() {
      let mut lengths: Vec<f64> = (0..self.edges.len() as u32)
        .map(|i| self.edge_length(i))
        .collect();
      if normalize {
        let max = lengths.iter().cloned().fold(0.0f64, f64::max);
        if max > 0.0 {
          for l in &mut lengths {
            *l /= max;
          }
        }
      }
      self.edge_lengths = Some(lengths);
    }
    self.edge_lengths.as_ref().unwrap()
  }

  /// Closest point to `position` on an edge segment.
  pub fn closest_point_on_edge(&self, edge: u32, position: DVec3) -> DVec3 {
    let e = &self.edges[edge as usize];
    math::closest_point_on_segment(position, self.points.position(e.start), self.points.position(e.end))
  }

  /// Squared distance from `position` to an edge segment.
  pub fn point_dist_to_edge_sq(&self, edge: u32, position: DVec3) -> f64 {
    let e = &self.edges[edge as usize];
    math::point_dist_to_segment_sq(position, self.points.position(e.start), self.points.position(e.end))
  }

  /// Distance between two edge segments.
  pub fn edge_dist_to_edge(&self, a: u32, b: u32) -> f64 {
    let ea = &self.edges[a as usize];
    let eb = &self.edges[b as usize];
    math::segment_dist_to_segment(
      self.points.position(ea.start),
      self.points.position(ea.end),
      self.points.position(eb.start),
      self.points.position(eb.end),
    )
  }

  // ===========================================================================
  // Proximity queries
  // ===========================================================================

  /// Closest node to a world position, optionally requiring a minimum
  /// link count. Builds the needed octree on first use.
  pub fn find_closest_node(
    &mut self,
    position: DVec3,
    mode: ClosestSearchMode,
    min_neighbors: usize,
  ) -> Option<u32> {
    match mode {
      ClosestSearchMode::Node => self.find_closest_node_by_position(position, min_neighbors),
      ClosestSearchMode::Edge => {
        let edge = self.find_closest_edge_filtered(position, min_neighbors)?;
        let e = &self.edges[edge as usize];
        let endpoints = [self.point_lookup[&e.start], self.point_lookup[&e.end]];
        self.best_node_of(endpoints.into_iter(), position, min_neighbors)
      }
    }
  }

  fn find_closest_node_by_position(&mut self, position: DVec3, min_neighbors: usize) -> Option<u32> {
    self.rebuild_octree(OctreeMode::Nodes, false);

    let mut candidates: Vec<u32> = Vec::new();
    if let Some(octree) = self.node_octree.as_ref() {
      octree.find_nearby(position, |index, _| candidates.push(index));
    }

    let best = self.best_node_of(candidates.into_iter(), position, min_neighbors);
    // No admissible candidate near the position: scan
    best.or_else(|| self.best_node_of(0..self.nodes.len() as u32, position, min_neighbors))
  }

  fn best_node_of(
    &self,
    nodes: impl Iterator<Item = u32>,
    position: DVec3,
    min_neighbors: usize,
  ) -> Option<u32> {
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for index in nodes {
      if self.nodes[index as usize].num_links() < min_neighbors {
        continue;
      }
      let d = (self.node_position(index) - position).length_squared();
      if d < best_dist {
        best_dist = d;
        best = Some(index);
      }
    }
    best
  }

  /// Closest edge segment to a world position.
  pub fn find_closest_edge(&mut self, position: DVec3) -> Option<u32> {
    self.find_closest_edge_filtered(position, 0)
  }

  /// Closest edge whose endpoints satisfy the degree filter. Edges with
  /// both endpoints below `min_neighbors` links are skipped entirely.
  fn find_closest_edge_filtered(&mut self, position: DVec3, min_neighbors: usize) -> Option<u32> {
    self.rebuild_octree(OctreeMode::Edges, false);

    let mut candidates: Vec<u32> = Vec::new();
    if let Some(octree) = self.edge_octree.as_ref() {
      octree.find_nearby(position, |index, _| candidates.push(index));
    }

    let best = self.best_edge_of(candidates.into_iter(), position, min_neighbors);
    // No admissible candidate near the position: scan
    best.or_else(|| self.best_edge_of(0..self.edges.len() as u32, position, min_neighbors))
  }

  fn best_edge_of(
    &self,
    edges: impl Iterator<Item = u32>,
    position: DVec3,
    min_neighbors: usize,
  ) -> Option<u32> {
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for index in edges {
      if min_neighbors > 0 {
        let e = &self.edges[index as usize];
        let na = self.point_lookup[&e.start];
        let nb = self.point_lookup[&e.end];
        if self.nodes[na as usize].num_links() < min_neighbors
          && self.nodes[nb as usize].num_links() < min_neighbors
        {
          continue;
        }
      }
      let d = self.point_dist_to_edge_sq(index, position);
      if d < best_dist {
        best_dist = d;
        best = Some(index);
      }
    }
    best
  }

  /// Linked neighbor of `node_index` minimizing point-to-segment distance
  /// to `position`, restricted to neighbors with at least
  /// `min_neighbor_count` links.
  pub fn find_closest_neighbor(
    &self,
    node_index: u32,
    position: DVec3,
    min_neighbor_count: usize,
  ) -> Option<u32> {
    self.find_closest_neighbor_impl(node_index, position, min_neighbor_count, None)
  }

  /// Same as [`Self::find_closest_neighbor`], skipping excluded nodes.
  pub fn find_closest_neighbor_excluding(
    &self,
    node_index: u32,
    position: DVec3,
    min_neighbor_count: usize,
    exclude: &HashSet<u32>,
  ) -> Option<u32> {
    self.find_closest_neighbor_impl(node_index, position, min_neighbor_count, Some(exclude))
  }

  fn find_closest_neighbor_impl(
    &self,
    node_index: u32,
    position: DVec3,
    min_neighbor_count: usize,
    exclude: Option<&HashSet<u32>>,
  ) -> Option<u32> {
    let origin = self.node_position(node_index);
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for link in &self.nodes[node_index as usize].links {
      if let Some(exclude) = exclude {
        if exclude.contains(&link.node) {
          continue;
        }
      }
      if self.nodes[link.node as usize].num_links() < min_neighbor_count {
        continue;
      }
      let d = math::point_dist_to_segment_sq(position, origin, self.node_position(link.node));
      if d < best_dist {
        best_dist = d;
        best = Some(link.node);
      }
    }
    best
  }

  /// Linked neighbor whose direction best matches `direction`.
  pub fn find_closest_neighbor_in_direction(&self, node_index: u32, direction: DVec3) -> Option<u32> {
    let origin = self.node_position(node_index);
    let dir = direction.normalize_or_zero();
    let mut best = None;
    let mut best_dot = f64::NEG_INFINITY;
    for link in &self.nodes[node_index as usize].links {
      let to = (self.node_position(link.node) - origin).normalize_or_zero();
      let dot = dir.dot(to);
      if dot > best_dot {
        best_dot = dot;
        best = Some(link.node);
      }
    }
    best
  }

  /// Pick the half-edge of `edge` to start a guided walk from.
  ///
  /// Leaf endpoints are preferred; otherwise the start is chosen so the
  /// walk direction keeps `guide` on the side selected by `up`.
  pub fn guided_half_edge(&self, edge: u32, guide: DVec3, up: DVec3) -> Link {
    let e = &self.edges[edge as usize];
    let na = self.point_lookup[&e.start];
    let nb = self.point_lookup[&e.end];
    let leaf_a = self.nodes[na as usize].is_leaf();
    let leaf_b = self.nodes[nb as usize].is_leaf();
    if leaf_a != leaf_b {
      return Link::new(if leaf_a { na } else { nb }, edge);
    }
    let pa = self.node_position(na);
    let pb = self.node_position(nb);
    let normal = (pb - pa).cross(guide - pa);
    if normal.dot(up) >= 0.0 {
      Link::new(na, edge)
    } else {
      Link::new(nb, edge)
    }
  }

  // ===========================================================================
  // Walks
  // ===========================================================================

  /// Nodes reachable from `from` within `max_depth` hops, including
  /// `from` itself, excluding anything in `skip`.
  pub fn connected_nodes(&self, from: u32, max_depth: usize, skip: &HashSet<u32>) -> Vec<u32> {
    let mut out = Vec::new();
    let mut seen: HashSet<u32> = skip.clone();
    let mut queue: VecDeque<(u32, usize)> = VecDeque::new();
    if seen.insert(from) {
      queue.push_back((from, 0));
      out.push(from);
    }
    while let Some((current, depth)) = queue.pop_front() {
      if depth == max_depth {
        continue;
      }
      for link in &self.nodes[current as usize].links {
        if seen.insert(link.node) {
          out.push(link.node);
          queue.push_back((link.node, depth + 1));
        }
      }
    }
    out
  }

  /// Edges reachable from `from` within `max_depth` hops.
  pub fn connected_edges(&self, from: u32, max_depth: usize, skip_edges: &HashSet<u32>) -> Vec<u32> {
    let mut out = Vec::new();
    let mut seen_edges: HashSet<u32> = skip_edges.clone();
    let mut seen_nodes: HashSet<u32> = HashSet::new();
    let mut queue: VecDeque<(u32, usize)> = VecDeque::new();
    seen_nodes.insert(from);
    queue.push_back((from, 0));
    while let Some((current, depth)) = queue.pop_front() {
      if depth == max_depth {
        continue;
      }
      for link in &self.nodes[current as usize].links {
        if seen_edges.insert(link.edge) {
          out.push(link.edge);
        }
        if seen_nodes.insert(link.node) {
          queue.push_back((link.node, depth + 1));
        }
      }
    }
    out
  }

  /// Mean position of a node's linked neighbors.
  pub fn centroid(&self, node_index: u32) -> DVec3 {
    let node = &self.nodes[node_index as usize];
    if node.links.is_empty() {
      return self.node_position(node_index);
    }
    let mut sum = DVec3::ZERO;
    for link in &node.links {
      sum += self.node_position(link.node);
    }
    sum / node.links.len() as f64
  }
}

fn get_or_create_node(
  nodes: &mut Vec<Node>,
  point_lookup: &mut HashMap<u32, u32>,
  bounds: &mut Option<Aabb>,
  points: &PointTable,
  row: u32,
) -> u32 {
  if let Some(&index) = point_lookup.get(&row) {
    return index;
  }
  let index = nodes.len() as u32;
  nodes.push(Node::new(index, row));
  point_lookup.insert(row, index);
  let position = points.position(row);
  match bounds {
    Some(b) => b.union_point(position),
    None => *bounds = Some(Aabb::from_point(position)),
  }
  index
}

fn build_node_octree(points: &PointTable, nodes: &[Node], bounds: &Aabb) -> ItemOctree {
  ItemOctree::build(
    *bounds,
    nodes.iter().map(|n| {
      let row = n.point_index as usize;
      let radius = (points.extents[row] * points.scales[row]).length().max(1e-3);
      (n.index, Aabb::from_sphere(points.positions[row], radius))
    }),
  )
}

fn build_edge_octree(bounded: &[BoundedEdge], bounds: &Aabb) -> ItemOctree {
  ItemOctree::build(*bounds, bounded.iter().map(|b| (b.index, b.bounds)))
}
