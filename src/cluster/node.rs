//! Graph nodes and their adjacency links.

use smallvec::SmallVec;

/// One directed adjacency entry: the neighbor node and the edge used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Link {
  pub node: u32,
  pub edge: u32,
}

impl Link {
  #[inline]
  pub fn new(node: u32, edge: u32) -> Self {
    Self { node, edge }
  }
}

/// A graph vertex referencing one vertex-table row.
///
/// `index` is dense and graph-local; `point_index` is the vertex-table row.
/// A node with zero links is valid (isolated).
#[derive(Clone, Debug)]
pub struct Node {
  pub index: u32,
  pub point_index: u32,
  pub links: SmallVec<[Link; 8]>,
}

impl Node {
  pub fn new(index: u32, point_index: u32) -> Self {
    Self {
      index,
      point_index,
      links: SmallVec::new(),
    }
  }

  /// Append a link unless the exact (node, edge) pair is already present.
  pub fn link(&mut self, link: Link) {
    if !self.links.contains(&link) {
      self.links.push(link);
    }
  }

  #[inline]
  pub fn num_links(&self) -> usize {
    self.links.len()
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.links.len() == 1
  }

  #[inline]
  pub fn is_binary(&self) -> bool {
    self.links.len() == 2
  }

  #[inline]
  pub fn is_complex(&self) -> bool {
    self.links.len() > 2
  }

  /// True when a link to `node` exists.
  pub fn is_adjacent_to(&self, node: u32) -> bool {
    self.links.iter().any(|l| l.node == node)
  }

  /// Edge index of the link to `node`, if any.
  pub fn edge_index_to(&self, node: u32) -> Option<u32> {
    self.links.iter().find(|l| l.node == node).map(|l| l.edge)
  }
}
