//! Tabular input/output surface of the engine.
//!
//! The engine consumes two parallel in-memory tables: a vertex table of
//! oriented points and an edge table where each row packs two 32-bit
//! endpoint identifiers into one `u64`. Identifiers resolve to vertex rows
//! through an [`EndpointLookup`] supplied by the caller.

use std::collections::HashMap;

use glam::{DQuat, DVec3};

/// Pack two endpoint identifiers into one edge-table value.
#[inline]
pub fn pack_endpoints(a: u32, b: u32) -> u64 {
  ((a as u64) << 32) | b as u64
}

/// Split an edge-table value into its two endpoint identifiers.
#[inline]
pub fn unpack_endpoints(packed: u64) -> (u32, u32) {
  ((packed >> 32) as u32, packed as u32)
}

/// Endpoint identifier to vertex-table row index.
pub type EndpointLookup = HashMap<u32, u32>;

/// Dense table of oriented points.
///
/// Rows are addressed by 0-based index. Extents are local half-sizes.
#[derive(Clone, Debug, Default)]
pub struct PointTable {
  pub positions: Vec<DVec3>,
  pub rotations: Vec<DQuat>,
  pub extents: Vec<DVec3>,
  pub scales: Vec<DVec3>,
  pub densities: Vec<f64>,
}

impl PointTable {
  /// Build a table from positions alone, with identity rotation, unit
  /// half-extents of 0.5, unit scale and density 1.
  pub fn from_positions(positions: Vec<DVec3>) -> Self {
    let n = positions.len();
    Self {
      positions,
      rotations: vec![DQuat::IDENTITY; n],
      extents: vec![DVec3::splat(0.5); n],
      scales: vec![DVec3::ONE; n],
      densities: vec![1.0; n],
    }
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  #[inline]
  pub fn position(&self, row: u32) -> DVec3 {
    self.positions[row as usize]
  }
}

/// Edge table: one packed endpoint pair per row.
#[derive(Clone, Debug, Default)]
pub struct EdgeTable {
  pub endpoints: Vec<u64>,
}

impl EdgeTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append an edge row from two endpoint identifiers.
  pub fn push(&mut self, a: u32, b: u32) {
    self.endpoints.push(pack_endpoints(a, b));
  }

  pub fn len(&self) -> usize {
    self.endpoints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.endpoints.is_empty()
  }
}

/// Build a lookup where identifier `i` maps to vertex row `i`.
///
/// Matches datasets whose endpoint identifiers are the row indices.
pub fn identity_lookup(rows: usize) -> EndpointLookup {
  (0..rows as u32).map(|i| (i, i)).collect()
}

/// Which diffusion result columns get written back.
#[derive(Clone, Copy, Debug)]
pub struct OutputToggles {
  pub depth: bool,
  pub order: bool,
  pub distance: bool,
  pub ending: bool,
}

impl Default for OutputToggles {
  fn default() -> Self {
    Self {
      depth: true,
      order: true,
      distance: true,
      ending: true,
    }
  }
}

/// Per-vertex-row diffusion results.
///
/// Rows untouched by any diffusion keep the sentinel values
/// (-1 / -1 / 0.0 / false). Disabled columns keep sentinels everywhere.
#[derive(Clone, Debug)]
pub struct DiffusionOutputs {
  pub depth: Vec<i32>,
  pub order: Vec<i32>,
  pub distance: Vec<f64>,
  pub ending: Vec<bool>,
  toggles: OutputToggles,
}

impl DiffusionOutputs {
  pub fn new(rows: usize, toggles: OutputToggles) -> Self {
    Self {
      depth: vec![-1; rows],
      order: vec![-1; rows],
      distance: vec![0.0; rows],
      ending: vec![false; rows],
      toggles,
    }
  }

  /// Write one row, honoring the column toggles.
  pub fn write(&mut self, row: u32, depth: i32, order: i32, distance: f64, ending: bool) {
    let row = row as usize;
    if self.toggles.depth {
      self.depth[row] = depth;
    }
    if self.toggles.order {
      self.order[row] = order;
    }
    if self.toggles.distance {
      self.distance[row] = distance;
    }
    if self.toggles.ending {
      self.ending[row] = ending;
    }
  }
}

/// One reconstructed path: vertex rows in travel order, with their
/// positions copied out and the seed's tags forwarded.
#[derive(Clone, Debug, Default)]
pub struct PathTable {
  pub rows: Vec<u32>,
  pub positions: Vec<DVec3>,
  pub tags: Vec<String>,
}

impl PathTable {
  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}
