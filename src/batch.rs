//! Batch processing of independent vertex/edge table pairs.
//!
//! Following the stage pattern: Enqueue → Tick → Completions. Each batch
//! builds its own cluster, runs the flood fill and reconstructs paths;
//! batches are independent and run in parallel on rayon.
//!
//! Malformed datasets are skipped with a warning, not failed: the run
//! produces fewer outputs than inputs by design.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::DVec3;
use rayon::prelude::*;
use web_time::Instant;

use crate::cluster::Cluster;
use crate::error::{ClusterBuildError, FloodError};
use crate::fill::{flood_fill, FloodConfig, FloodResult};
use crate::paths::{build_paths, PathOutput};
use crate::tables::{EdgeTable, EndpointLookup, PathTable, PointTable};

/// One vertex/edge table pair plus its seeds and run parameters.
#[derive(Clone)]
pub struct FloodRequest {
  /// Unique identifier for this request
  pub id: u64,
  pub points: Arc<PointTable>,
  pub edges: EdgeTable,
  pub lookup: EndpointLookup,
  pub seeds: Vec<DVec3>,
  pub config: FloodConfig,
  pub path_output: PathOutput,
  /// Tags forwarded onto every emitted path table.
  pub tags: Vec<String>,
}

/// How one batch ended.
pub enum BatchOutcome {
  Completed {
    result: FloodResult,
    paths: Vec<PathTable>,
  },
  /// The dataset could not form a valid cluster and was excluded.
  Skipped(ClusterBuildError),
  /// The run was cancelled or found no usable seed.
  Failed(FloodError),
}

/// Completed batch result.
pub struct FloodCompletion {
  /// Request ID this completion corresponds to
  pub id: u64,
  pub outcome: BatchOutcome,
  /// Time spent in the flood fill itself, in microseconds. Zero for
  /// skipped datasets.
  pub fill_time_us: u64,
}

fn process(request: FloodRequest, cancel: &AtomicBool) -> FloodCompletion {
  let mut fill_time_us = 0;

  let outcome = match Cluster::build_from(
    Arc::clone(&request.points),
    &request.edges,
    &request.lookup,
    None,
    request.id as i32,
  ) {
    Err(err) => {
      #[cfg(feature = "tracing")]
      tracing::warn!(id = request.id, %err, "skipping dataset: invalid cluster");
      BatchOutcome::Skipped(err)
    }
    Ok(mut cluster) => {
      let start = Instant::now();
      let filled = flood_fill(&mut cluster, &request.seeds, &request.config, cancel);
      fill_time_us = start.elapsed().as_micros() as u64;
      match filled {
        Err(err) => BatchOutcome::Failed(err),
        Ok(result) => {
          let paths = result
            .diffusions
            .iter()
            .flat_map(|d| build_paths(&cluster, d, &request.path_output, &request.tags))
            .collect();
          cluster.flush();
          BatchOutcome::Completed { result, paths }
        }
      }
    }
  };

  FloodCompletion {
    id: request.id,
    outcome,
    fill_time_us,
  }
}

/// Flood stage that processes whole batches in parallel.
pub struct FloodStage {
  /// Pending requests waiting to be processed
  pending: Vec<FloodRequest>,
  /// Completed results ready to be collected
  completed: Vec<FloodCompletion>,
  /// Next request ID
  next_id: u64,
  cancel: Arc<AtomicBool>,
}

impl Default for FloodStage {
  fn default() -> Self {
    Self::new()
  }
}

impl FloodStage {
  /// Create a new flood stage.
  pub fn new() -> Self {
    Self {
      pending: Vec::new(),
      completed: Vec::new(),
      next_id: 0,
      cancel: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Enqueue a batch, returning the assigned ID.
  #[allow(clippy::too_many_arguments)]
  pub fn enqueue(
    &mut self,
    points: Arc<PointTable>,
    edges: EdgeTable,
    lookup: EndpointLookup,
    seeds: Vec<DVec3>,
    config: FloodConfig,
    path_output: PathOutput,
    tags: Vec<String>,
  ) -> u64 {
    let id = self.next_id;
    self.next_id += 1;

    self.pending.push(FloodRequest {
      id,
      points,
      edges,
      lookup,
      seeds,
      config,
      path_output,
      tags,
    });

    id
  }

  /// Process pending batches in parallel and move completions to output.
  /// Returns the number of batches processed this tick.
  pub fn tick(&mut self) -> usize {
    if self.pending.is_empty() {
      return 0;
    }

    let requests = std::mem::take(&mut self.pending);
    let count = requests.len();
    let cancel = Arc::clone(&self.cancel);

    let completions: Vec<FloodCompletion> = requests
      .into_par_iter()
      .map(|req| process(req, &cancel))
      .collect();

    self.completed.extend(completions);
    count
  }

  /// Take all completed batches.
  pub fn drain_completions(&mut self) -> Vec<FloodCompletion> {
    std::mem::take(&mut self.completed)
  }

  /// Raise the batch-wide cancellation flag. Batches already running
  /// abort between rings/diffusions; claimed state is discarded.
  pub fn cancel(&self) {
    self.cancel.store(true, Ordering::Release);
  }

  /// Number of pending batches.
  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  /// Number of completed results waiting to be drained.
  pub fn completed_count(&self) -> usize {
    self.completed.len()
  }

  /// True when no work remains.
  pub fn is_idle(&self) -> bool {
    self.pending.is_empty() && self.completed.is_empty()
  }
}

/// Non-blocking batch runner on rayon's thread pool.
///
/// Submissions return immediately; completions arrive on an internal
/// channel and are collected with [`FloodRunner::drain_completions`].
pub struct FloodRunner {
  tx: Sender<FloodCompletion>,
  rx: Receiver<FloodCompletion>,
  next_id: u64,
  cancel: Arc<AtomicBool>,
}

impl Default for FloodRunner {
  fn default() -> Self {
    Self::new()
  }
}

impl FloodRunner {
  pub fn new() -> Self {
    let (tx, rx) = unbounded();
    Self {
      tx,
      rx,
      next_id: 0,
      cancel: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Submit a batch for background processing, returning its ID.
  #[allow(clippy::too_many_arguments)]
  pub fn submit(
    &mut self,
    points: Arc<PointTable>,
    edges: EdgeTable,
    lookup: EndpointLookup,
    seeds: Vec<DVec3>,
    config: FloodConfig,
    path_output: PathOutput,
    tags: Vec<String>,
  ) -> u64 {
    let id = self.next_id;
    self.next_id += 1;

    let request = FloodRequest {
      id,
      points,
      edges,
      lookup,
      seeds,
      config,
      path_output,
      tags,
    };
    let tx = self.tx.clone();
    let cancel = Arc::clone(&self.cancel);

    rayon::spawn(move || {
      let completion = process(request, &cancel);
      // Receiver dropped means the runner is gone; nothing to deliver to
      let _ = tx.send(completion);
    });

    id
  }

  /// Collect every completion delivered so far (non-blocking).
  pub fn drain_completions(&self) -> Vec<FloodCompletion> {
    self.rx.try_iter().collect()
  }

  /// Raise the cancellation flag shared with all in-flight batches.
  pub fn cancel(&self) {
    self.cancel.store(true, Ordering::Release);
  }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
