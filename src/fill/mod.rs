//! Flood-fill diffusion over a cluster graph.
//!
//! One [`Diffusion`] grows per accepted seed, claiming nodes across edges
//! under the fill-rate admission policy until a stop condition fires or
//! the frontier runs dry.
//!
//! ```text
//!            ring 2      ring 1     seed     ring 1      ring 2
//!   o ---- o ---------- o ------- [seed] ------- o ---------- o
//!                                    |
//!                                    o  ring 1
//! ```
//!
//! Scheduling is either parallel (all diffusions advance one ring per
//! iteration, barrier between rings) or sequential (each diffusion runs
//! to completion before the next starts).

pub mod controls;
pub mod diffusion;
pub mod engine;

pub use controls::{FillControl, FillControls, FillRate, Influences, StopReason};
pub use diffusion::{
  Candidate, CandidateOrdering, Capture, Diffusion, DiffusionState, ScoreSource,
};
pub use engine::{apply_blend, flood_fill, BlendOp, FillMode, FloodConfig, FloodResult, SeedOrdering};
