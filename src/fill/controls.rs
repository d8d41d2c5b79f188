//! Admission and stop policy for diffusion wavefronts.

use std::sync::atomic::{AtomicI32, Ordering};

/// Why a diffusion reached `Stopped`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
  /// No unvisited neighbor left anywhere on the frontier.
  Exhausted,
  /// Every remaining candidate was rejected by the fill-rate policy.
  Starved,
  /// The depth budget cut off the last candidates.
  MaxDepth,
  /// The distance budget cut off the last candidates.
  MaxDistance,
  /// The captured-node count limit was reached.
  MaxCount,
  /// A per-node predicate cut off the last candidates.
  Predicate,
  /// The wavefront hit a node claimed by another diffusion and merging
  /// is forbidden.
  Collision,
}

/// Per-node cap on how many diffusions may enter a node.
///
/// A rate of 0 preserves a node from being diffused onto at all.
#[derive(Clone, Debug)]
pub enum FillRate {
  Constant(i32),
  /// Indexed by vertex-table row.
  PerPoint(Vec<i32>),
}

impl FillRate {
  #[inline]
  pub fn limit(&self, point_row: u32) -> i32 {
    match self {
      FillRate::Constant(limit) => *limit,
      FillRate::PerPoint(limits) => limits[point_row as usize],
    }
  }
}

impl Default for FillRate {
  fn default() -> Self {
    FillRate::Constant(1)
  }
}

/// One stop condition. `Predicate` is indexed by vertex-table row.
#[derive(Clone, Debug)]
pub enum FillControl {
  MaxDepth(i32),
  MaxDistance(f64),
  MaxCount(usize),
  Predicate(Vec<bool>),
  /// Stop when the frontier reaches a node already claimed by a
  /// different diffusion.
  NoMerge,
}

/// The configured stop-condition set, evaluated through one function per
/// check site (probe-time limits, capture-count, collisions).
#[derive(Clone, Debug, Default)]
pub struct FillControls {
  controls: Vec<FillControl>,
}

impl FillControls {
  pub fn new(controls: Vec<FillControl>) -> Self {
    Self { controls }
  }

  pub fn push(&mut self, control: FillControl) {
    self.controls.push(control);
  }

  /// Probe-time admission: may a candidate at `depth`/`distance` landing
  /// on `point_row` join the frontier? Returns the violated limit.
  pub fn check_candidate(&self, depth: i32, distance: f64, point_row: u32) -> Option<StopReason> {
    for control in &self.controls {
      match control {
        FillControl::MaxDepth(max) if depth > *max => return Some(StopReason::MaxDepth),
        FillControl::MaxDistance(max) if distance > *max => return Some(StopReason::MaxDistance),
        FillControl::Predicate(stop) if stop[point_row as usize] => {
          return Some(StopReason::Predicate)
        }
        _ => {}
      }
    }
    None
  }

  /// Capture-time check: must the diffusion stop after having captured
  /// `captured_count` nodes?
  pub fn check_count(&self, captured_count: usize) -> Option<StopReason> {
    for control in &self.controls {
      if let FillControl::MaxCount(max) = control {
        if captured_count >= *max {
          return Some(StopReason::MaxCount);
        }
      }
    }
    None
  }

  /// True when cross-diffusion merging is forbidden.
  pub fn forbids_merge(&self) -> bool {
    self.controls.iter().any(|c| matches!(c, FillControl::NoMerge))
  }
}

/// Shared per-node influence counters, one per vertex-table row.
///
/// Claims use a compare-exchange loop so the configured rate is never
/// exceeded regardless of scheduling.
pub struct Influences {
  counts: Vec<AtomicI32>,
}

impl Influences {
  pub fn new(rows: usize) -> Self {
    Self {
      counts: (0..rows).map(|_| AtomicI32::new(0)).collect(),
    }
  }

  /// Try to claim one influence slot on `point_row` under `limit`.
  pub fn try_claim(&self, point_row: u32, limit: i32) -> bool {
    self.counts[point_row as usize]
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
        if count < limit {
          Some(count + 1)
        } else {
          None
        }
      })
      .is_ok()
  }

  /// Current influence count for a row.
  pub fn count(&self, point_row: u32) -> i32 {
    self.counts[point_row as usize].load(Ordering::Acquire)
  }
}
