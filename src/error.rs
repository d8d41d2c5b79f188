//! Error types for cluster construction and flood-fill runs.
//!
//! Topology errors are recoverable per dataset: the batch layer logs them
//! and skips the offending vertex/edge pair. Diffusion stop conditions are
//! ordinary outcomes and live in [`crate::fill::StopReason`], not here.

use thiserror::Error;

/// A vertex/edge table pair that cannot form a valid cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClusterBuildError {
  /// An edge row references an endpoint identifier absent from the lookup.
  #[error("edge row {edge_row} references unknown endpoint {endpoint}")]
  DanglingEndpoint { edge_row: u32, endpoint: u32 },

  /// Both endpoints of an edge row resolve to the same vertex row.
  #[error("edge row {edge_row} is a self-loop on vertex row {row}")]
  SelfLoop { edge_row: u32, row: u32 },

  /// A node ended up with fewer neighbors than the caller expected,
  /// indicating edges were silently dropped upstream.
  #[error("vertex row {row} has {actual} links, expected at least {expected}")]
  AdjacencyMismatch { row: u32, expected: u32, actual: u32 },
}

/// Run-level failures of the diffusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FloodError {
  /// The batch-wide cancellation flag was raised; no outputs were written.
  #[error("flood fill cancelled")]
  Cancelled,

  /// No seed position resolved to a cluster node within the pick distance.
  #[error("no seed resolved to a cluster node")]
  NoSeeds,
}
