//! cluster_flood - Procedural cluster graph engine
//!
//! Builds in-memory graphs ("clusters") from paired vertex/edge tables
//! linked by 64-bit packed endpoint identifiers, spatially indexes them
//! with lazy octrees, and runs graph-propagation algorithms over them:
//!
//! - **Flood-fill diffusion**: wavefronts grow from seed nodes across
//!   edges under per-node fill-rate admission, in parallel (ring) or
//!   sequential scheduling
//! - **Path reconstruction**: full seed-to-endpoint paths or partitions
//!   that share only boundary nodes
//! - **Cell/hull topology**: closed faces and the outer hull of a
//!   planar-projected cluster via guided half-edge walking
//! - **Point-box cloud**: oriented per-point boxes in an octree for
//!   inside/sample/segment-cut queries
//!
//! # Example
//!
//! ```ignore
//! use cluster_flood::{flood_fill, Cluster, EdgeTable, FloodConfig, PointTable};
//!
//! let points = Arc::new(PointTable::from_positions(positions));
//! let mut cluster = Cluster::build_from(points, &edges, &lookup, None, 0)?;
//!
//! let cancel = AtomicBool::new(false);
//! let result = flood_fill(&mut cluster, &seeds, &FloodConfig::default(), &cancel)?;
//!
//! println!("{} diffusions stopped", result.diffusions.len());
//! ```

pub mod error;
pub mod math;
pub mod tables;

// Re-export commonly used items
pub use error::{ClusterBuildError, FloodError};
pub use tables::{
  identity_lookup, pack_endpoints, unpack_endpoints, DiffusionOutputs, EdgeTable, EndpointLookup,
  OutputToggles, PathTable, PointTable,
};

// Spatial indexing
pub mod octree;
pub use octree::{Aabb, ItemOctree};

// The cluster graph
pub mod cluster;
pub use cluster::{BoundedEdge, ClosestSearchMode, Cluster, Edge, Link, Node, OctreeMode};

// Oriented point-box cloud
pub mod boxcloud;
pub use boxcloud::{BoundsSource, Cut, Intersections, PointBox, PointBoxCloud, Sample};

// Flood-fill diffusion engine
pub mod fill;
pub use fill::{
  apply_blend, flood_fill, BlendOp, CandidateOrdering, Diffusion, DiffusionState, FillControl,
  FillControls, FillMode, FillRate, FloodConfig, FloodResult, ScoreSource, SeedOrdering,
  StopReason,
};

// Path reconstruction from stopped diffusions
pub mod paths;
pub use paths::{build_paths, PartitionKey, PathOutput};

// Cell and hull discovery
pub mod topology;
pub use topology::{find_cells, find_wrapper, project_positions, Cell, CellConstraints, CellError};

// Batch processing of independent table pairs
pub mod batch;
pub use batch::{BatchOutcome, FloodCompletion, FloodRequest, FloodRunner, FloodStage};
