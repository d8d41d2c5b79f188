//! The diffusion engine: seeding, scheduling and write-back.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::DVec3;
use rayon::prelude::*;

use crate::cluster::{ClosestSearchMode, Cluster};
use crate::error::FloodError;
use crate::tables::{DiffusionOutputs, OutputToggles};

use super::controls::{FillControls, FillRate, Influences};
use super::diffusion::{CandidateOrdering, Diffusion, DiffusionState, ScoreSource};

/// Scheduling policy for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillMode {
  /// All growing diffusions advance one breadth ring per iteration, with
  /// a barrier between rings. Contested nodes go to the first claimant
  /// within the ring.
  Parallel,
  /// Each diffusion runs to `Stopped` before the next starts, in seed
  /// order. Fully deterministic.
  Sequential,
}

/// Order in which seeds spawn their diffusions.
#[derive(Clone, Debug)]
pub enum SeedOrdering {
  /// Input row order.
  InputIndex,
  /// By per-seed sort keys, evaluated once up front.
  Sorted { keys: Vec<f64>, ascending: bool },
}

impl Default for SeedOrdering {
  fn default() -> Self {
    SeedOrdering::InputIndex
  }
}

/// Full parameter set for one flood-fill run.
#[derive(Clone, Debug)]
pub struct FloodConfig {
  pub mode: FillMode,
  pub rate: FillRate,
  pub controls: FillControls,
  pub ordering: CandidateOrdering,
  pub seed_ordering: SeedOrdering,
  /// Seeds farther than this from their closest node are skipped.
  pub max_seed_distance: f64,
  pub toggles: OutputToggles,
  pub score: ScoreSource,
}

impl Default for FloodConfig {
  fn default() -> Self {
    Self {
      mode: FillMode::Sequential,
      rate: FillRate::default(),
      controls: FillControls::default(),
      ordering: CandidateOrdering::default(),
      seed_ordering: SeedOrdering::default(),
      max_seed_distance: f64::INFINITY,
      toggles: OutputToggles::default(),
      score: ScoreSource::default(),
    }
  }
}

impl FloodConfig {
  pub fn with_mode(mut self, mode: FillMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_rate(mut self, rate: FillRate) -> Self {
    self.rate = rate;
    self
  }

  pub fn with_controls(mut self, controls: FillControls) -> Self {
    self.controls = controls;
    self
  }

  pub fn with_ordering(mut self, ordering: CandidateOrdering) -> Self {
    self.ordering = ordering;
    self
  }

  pub fn with_seed_ordering(mut self, seed_ordering: SeedOrdering) -> Self {
    self.seed_ordering = seed_ordering;
    self
  }

  pub fn with_max_seed_distance(mut self, distance: f64) -> Self {
    self.max_seed_distance = distance;
    self
  }

  pub fn with_toggles(mut self, toggles: OutputToggles) -> Self {
    self.toggles = toggles;
    self
  }

  pub fn with_score(mut self, score: ScoreSource) -> Self {
    self.score = score;
    self
  }
}

/// Completed run: the stopped diffusions plus the per-row output columns.
pub struct FloodResult {
  pub diffusions: Vec<Diffusion>,
  pub outputs: DiffusionOutputs,
}

/// Narrow seam to the external blending-operator framework: blend data
/// from the seed's vertex row onto a captured row.
pub trait BlendOp {
  fn blend(&mut self, seed_row: u32, target_row: u32);
}

/// Run a flood fill over `cluster` from the given seed positions.
///
/// Spatial indexes are built up front, single-threaded, before any
/// parallel work. Cancellation is checked between rings (parallel) or
/// between diffusions (sequential); a cancelled run returns an error and
/// writes nothing.
#[cfg_attr(
  feature = "tracing",
  tracing::instrument(skip_all, fields(seeds = seeds.len(), nodes = cluster.nodes().len()))
)]
pub fn flood_fill(
  cluster: &mut Cluster,
  seeds: &[DVec3],
  config: &FloodConfig,
  cancel: &AtomicBool,
) -> Result<FloodResult, FloodError> {
  let influences = Influences::new(cluster.points().len());
  let mut diffusions = seed_diffusions(cluster, seeds, config, &influences);
  if diffusions.is_empty() {
    return Err(FloodError::NoSeeds);
  }

  let cluster = &*cluster;
  for diffusion in &mut diffusions {
    diffusion.init(cluster, &config.controls, &config.score, config.ordering);
  }

  match config.mode {
    FillMode::Sequential => {
      for diffusion in &mut diffusions {
        if cancel.load(Ordering::Acquire) {
          return Err(FloodError::Cancelled);
        }
        while diffusion.grow_step(
          cluster,
          &config.rate,
          &config.controls,
          &influences,
          &config.score,
          config.ordering,
        ) {}
      }
    }
    FillMode::Parallel => {
      while diffusions.iter().any(Diffusion::is_active) {
        if cancel.load(Ordering::Acquire) {
          return Err(FloodError::Cancelled);
        }
        // One ring per pass; the loop boundary is the barrier
        diffusions
          .par_iter_mut()
          .filter(|d| d.is_active())
          .for_each(|diffusion| {
            diffusion.grow_ring(
              cluster,
              &config.rate,
              &config.controls,
              &influences,
              &config.score,
              config.ordering,
            );
          });
      }
    }
  }

  let mut outputs = DiffusionOutputs::new(cluster.points().len(), config.toggles);
  for diffusion in &diffusions {
    debug_assert_eq!(diffusion.state, DiffusionState::Stopped);
    for capture in diffusion.captures() {
      let row = cluster.node(capture.node).point_index;
      outputs.write(
        row,
        capture.depth,
        capture.order,
        capture.distance,
        diffusion.is_endpoint(capture.node),
      );
    }
  }

  Ok(FloodResult { diffusions, outputs })
}

/// Apply a blend operator from each diffusion's seed row onto every row
/// it captured. Call after the run completes.
pub fn apply_blend(cluster: &Cluster, result: &FloodResult, blend: &mut dyn BlendOp) {
  for diffusion in &result.diffusions {
    let seed_row = cluster.node(diffusion.seed_node).point_index;
    for capture in diffusion.captures().iter().skip(1) {
      blend.blend(seed_row, cluster.node(capture.node).point_index);
    }
  }
}

fn seed_diffusions(
  cluster: &mut Cluster,
  seeds: &[DVec3],
  config: &FloodConfig,
  influences: &Influences,
) -> Vec<Diffusion> {
  let mut order: Vec<usize> = (0..seeds.len()).collect();
  if let SeedOrdering::Sorted { keys, ascending } = &config.seed_ordering {
    order.sort_by(|&a, &b| {
      let key = keys[a].total_cmp(&keys[b]);
      let key = if *ascending { key } else { key.reverse() };
      // Ties always go to the earlier input row
      key.then(a.cmp(&b))
    });
  }

  let mut seeded = vec![false; cluster.nodes().len()];
  let mut diffusions = Vec::new();

  for seed_index in order {
    let position = seeds[seed_index];
    let Some(node) = cluster.find_closest_node(position, ClosestSearchMode::Node, 0) else {
      continue;
    };
    if (cluster.node_position(node) - position).length() > config.max_seed_distance {
      continue;
    }
    // One diffusion per node; first seed in order wins
    if seeded[node as usize] {
      continue;
    }
    let point_row = cluster.node(node).point_index;
    if !influences.try_claim(point_row, config.rate.limit(point_row)) {
      continue;
    }
    seeded[node as usize] = true;
    diffusions.push(Diffusion::new(node, seed_index as u32));
  }

  diffusions
}
