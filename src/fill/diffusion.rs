//! One flood-fill wavefront growing from a single seed node.

use std::collections::{HashMap, HashSet};

use crate::cluster::{Cluster, Link};

use super::controls::{FillControls, FillRate, Influences, StopReason};

/// Lifecycle of a diffusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffusionState {
  Initial,
  Growing,
  Stopped,
}

/// How a diffusion orders its candidate neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateOrdering {
  /// Lowest node index first.
  Index,
  /// By accumulated path score; ties broken by lower node index.
  Score { ascending: bool },
}

impl Default for CandidateOrdering {
  fn default() -> Self {
    CandidateOrdering::Index
  }
}

/// Where candidate path scores come from.
#[derive(Clone, Debug)]
pub enum ScoreSource {
  /// Edge length (path score equals path distance).
  EdgeLength,
  /// Per vertex-table row values, accumulated along the path.
  PerPoint(Vec<f64>),
  /// Per edge-table row values, accumulated along the path.
  PerEdge(Vec<f64>),
}

impl Default for ScoreSource {
  fn default() -> Self {
    ScoreSource::EdgeLength
  }
}

impl ScoreSource {
  fn value(&self, cluster: &Cluster, link: Link) -> f64 {
    match self {
      ScoreSource::EdgeLength => cluster.edge_length(link.edge),
      ScoreSource::PerPoint(values) => {
        values[cluster.node(link.node).point_index as usize]
      }
      ScoreSource::PerEdge(values) => {
        values[cluster.edge(link.edge).edge_table_row as usize]
      }
    }
  }
}

/// A frontier entry: an unvisited neighbor this diffusion may capture.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
  pub node: u32,
  pub parent: u32,
  pub edge: u32,
  pub depth: i32,
  pub distance: f64,
  pub score: f64,
}

/// Per-node record of a successful capture.
#[derive(Clone, Copy, Debug)]
pub struct Capture {
  pub node: u32,
  pub depth: i32,
  pub order: i32,
  pub distance: f64,
  pub score: f64,
}

enum Attempt {
  Captured(usize),
  RateRejected,
  Collision,
}

/// One flood-fill wavefront.
///
/// Mutated only by the owning engine worker; read-only once `Stopped`.
pub struct Diffusion {
  pub seed_node: u32,
  /// Input row of the seed that spawned this diffusion.
  pub seed_index: u32,
  pub state: DiffusionState,
  /// Visited nodes in capture order; `visited_nodes[0]` is the seed.
  pub visited_nodes: Vec<u32>,
  /// Edges used, parallel to `visited_nodes[1..]`.
  pub visited_edges: Vec<u32>,
  pub stop_reason: Option<StopReason>,
  /// Deepest hop reached.
  pub hop_depth: i32,
  pub order_counter: i32,
  pub accumulated_distance: f64,

  captures: Vec<Capture>,
  capture_index: HashMap<u32, usize>,
  /// Per captured node: the link (parent node, edge) it was reached by.
  travel: HashMap<u32, Link>,
  endpoints: HashSet<u32>,
  /// Frontier, sorted with the best candidate last.
  candidates: Vec<Candidate>,
  queued: HashSet<u32>,
  limit_hit: Option<StopReason>,
}

impl Diffusion {
  pub fn new(seed_node: u32, seed_index: u32) -> Self {
    let seed_capture = Capture {
      node: seed_node,
      depth: 0,
      order: 0,
      distance: 0.0,
      score: 0.0,
    };
    let mut capture_index = HashMap::new();
    capture_index.insert(seed_node, 0);
    let mut endpoints = HashSet::new();
    endpoints.insert(seed_node);

    Self {
      seed_node,
      seed_index,
      state: DiffusionState::Initial,
      visited_nodes: vec![seed_node],
      visited_edges: Vec::new(),
      stop_reason: None,
      hop_depth: 0,
      order_counter: 0,
      accumulated_distance: 0.0,
      captures: vec![seed_capture],
      capture_index,
      travel: HashMap::new(),
      endpoints,
      candidates: Vec::new(),
      queued: HashSet::new(),
      limit_hit: None,
    }
  }

  /// Depth per the data model: one less than the visited count.
  #[inline]
  pub fn depth(&self) -> i32 {
    self.visited_nodes.len() as i32 - 1
  }

  #[inline]
  pub fn is_active(&self) -> bool {
    self.state != DiffusionState::Stopped
  }

  pub fn captures(&self) -> &[Capture] {
    &self.captures
  }

  pub fn capture_of(&self, node: u32) -> Option<&Capture> {
    self.capture_index.get(&node).map(|&i| &self.captures[i])
  }

  pub fn endpoints(&self) -> &HashSet<u32> {
    &self.endpoints
  }

  #[inline]
  pub fn is_endpoint(&self, node: u32) -> bool {
    self.endpoints.contains(&node)
  }

  /// The (parent node, edge) link a captured node was reached through.
  pub fn travel_link(&self, node: u32) -> Option<Link> {
    self.travel.get(&node).copied()
  }

  /// Probe the seed's neighborhood. Stops immediately when the seed has
  /// no admissible neighbor.
  pub fn init(
    &mut self,
    cluster: &Cluster,
    controls: &FillControls,
    score: &ScoreSource,
    ordering: CandidateOrdering,
  ) {
    self.probe_from(cluster, controls, score, 0);
    self.sort_candidates(ordering);
    if self.candidates.is_empty() {
      self.finish(false);
    }
  }

  /// Advance by one captured node (sequential mode). Returns false once
  /// the diffusion is stopped.
  pub fn grow_step(
    &mut self,
    cluster: &Cluster,
    rate: &FillRate,
    controls: &FillControls,
    influences: &Influences,
    score: &ScoreSource,
    ordering: CandidateOrdering,
  ) -> bool {
    if self.state == DiffusionState::Stopped {
      return false;
    }

    let mut rate_rejected = false;
    loop {
      let Some(candidate) = self.candidates.pop() else {
        self.finish(rate_rejected);
        return false;
      };
      self.queued.remove(&candidate.node);

      match self.attempt(cluster, &candidate, rate, controls, influences) {
        Attempt::Collision => return false,
        Attempt::RateRejected => {
          rate_rejected = true;
          continue;
        }
        Attempt::Captured(capture_idx) => {
          if let Some(reason) = controls.check_count(self.captures.len()) {
            self.stop(reason);
            return true;
          }
          self.probe_from(cluster, controls, score, capture_idx);
          self.sort_candidates(ordering);
          if self.candidates.is_empty() {
            self.finish(false);
          }
          return true;
        }
      }
    }
  }

  /// Advance one breadth ring (parallel mode): attempt every candidate
  /// currently on the frontier; neighbors probed during the ring wait for
  /// the next ring. Returns true when at least one node was captured.
  pub fn grow_ring(
    &mut self,
    cluster: &Cluster,
    rate: &FillRate,
    controls: &FillControls,
    influences: &Influences,
    score: &ScoreSource,
    ordering: CandidateOrdering,
  ) -> bool {
    if self.state == DiffusionState::Stopped {
      return false;
    }

    let ring = std::mem::take(&mut self.candidates);
    self.queued.clear();

    let mut grew = false;
    let mut rate_rejected = false;
    // Best candidate is stored last
    for candidate in ring.into_iter().rev() {
      if self.capture_index.contains_key(&candidate.node) {
        continue;
      }
      match self.attempt(cluster, &candidate, rate, controls, influences) {
        Attempt::Collision => return grew,
        Attempt::RateRejected => rate_rejected = true,
        Attempt::Captured(capture_idx) => {
          grew = true;
          if let Some(reason) = controls.check_count(self.captures.len()) {
            self.stop(reason);
            return grew;
          }
          self.probe_from(cluster, controls, score, capture_idx);
        }
      }
    }

    self.sort_candidates(ordering);
    if self.candidates.is_empty() {
      self.finish(rate_rejected && !grew);
    }
    grew
  }

  fn attempt(
    &mut self,
    cluster: &Cluster,
    candidate: &Candidate,
    rate: &FillRate,
    controls: &FillControls,
    influences: &Influences,
  ) -> Attempt {
    let point_row = cluster.node(candidate.node).point_index;

    if controls.forbids_merge() && influences.count(point_row) > 0 {
      self.stop(StopReason::Collision);
      return Attempt::Collision;
    }
    if !influences.try_claim(point_row, rate.limit(point_row)) {
      return Attempt::RateRejected;
    }

    self.state = DiffusionState::Growing;
    self.order_counter += 1;
    self.hop_depth = self.hop_depth.max(candidate.depth);
    self.accumulated_distance += cluster.edge_length(candidate.edge);
    self.visited_nodes.push(candidate.node);
    self.visited_edges.push(candidate.edge);
    self.travel
      .insert(candidate.node, Link::new(candidate.parent, candidate.edge));
    self.endpoints.remove(&candidate.parent);
    self.endpoints.insert(candidate.node);

    let capture_idx = self.captures.len();
    self.captures.push(Capture {
      node: candidate.node,
      depth: candidate.depth,
      order: self.order_counter,
      distance: candidate.distance,
      score: candidate.score,
    });
    self.capture_index.insert(candidate.node, capture_idx);
    Attempt::Captured(capture_idx)
  }

  fn probe_from(
    &mut self,
    cluster: &Cluster,
    controls: &FillControls,
    score: &ScoreSource,
    capture_idx: usize,
  ) {
    let from = self.captures[capture_idx];
    for &link in &cluster.node(from.node).links {
      if self.capture_index.contains_key(&link.node) || self.queued.contains(&link.node) {
        continue;
      }
      let depth = from.depth + 1;
      let distance = from.distance + cluster.edge_length(link.edge);
      let point_row = cluster.node(link.node).point_index;
      if let Some(reason) = controls.check_candidate(depth, distance, point_row) {
        self.limit_hit = Some(reason);
        continue;
      }
      self.candidates.push(Candidate {
        node: link.node,
        parent: from.node,
        edge: link.edge,
        depth,
        distance,
        score: from.score + score.value(cluster, link),
      });
      self.queued.insert(link.node);
    }
  }

  fn sort_candidates(&mut self, ordering: CandidateOrdering) {
    // Best-first comparator, reversed so pop() takes the best
    self.candidates.sort_by(|a, b| {
      let best_first = match ordering {
        CandidateOrdering::Index => a.node.cmp(&b.node),
        CandidateOrdering::Score { ascending: true } => {
          a.score.total_cmp(&b.score).then(a.node.cmp(&b.node))
        }
        CandidateOrdering::Score { ascending: false } => {
          b.score.total_cmp(&a.score).then(a.node.cmp(&b.node))
        }
      };
      best_first.reverse()
    });
  }

  fn finish(&mut self, starved: bool) {
    let reason = self
      .limit_hit
      .take()
      .unwrap_or(if starved { StopReason::Starved } else { StopReason::Exhausted });
    self.stop(reason);
  }

  fn stop(&mut self, reason: StopReason) {
    if self.state != DiffusionState::Stopped {
      self.state = DiffusionState::Stopped;
      self.stop_reason = Some(reason);
    }
  }
}
