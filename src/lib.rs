//! Underwater tether simulation core.
//!
//! This crate drives a conventional rigid-body physics engine to simulate a
//! physically-coupled tether (a multi-segment rope) between a vehicle and an
//! external object, plus the gravity/buoyancy forcing applied to submerged
//! bodies:
//!
//! - [`MixedBody`] - One capability surface over free rigid bodies and
//!   articulated-chain bodies, which engines expose as unrelated kinds
//! - [`ForcePointSet`] - Per-point gravity and buoyancy, distributed so the
//!   total force is independent of how finely a body is discretized
//! - [`RopeChain`] - Builds and tears down an ordered sequence of jointed
//!   rope segments with derived geometry and mass
//! - [`TopologyRewriter`] - Detects a taut (load-bearing) rope and atomically
//!   replaces the flexible chain with a single rigid stick
//!
//! # Design Philosophy
//!
//! The integrator, constraint solver, and collision pipeline are **external
//! collaborators**, consumed through the [`PhysicsEngine`] trait. This crate
//! owns the interesting invariants - segment derivation, force distribution,
//! and the chain topology rewrite - and treats the engine as a handle store.
//! The water surface is likewise injected via [`WaterSurface`] rather than
//! discovered globally.
//!
//! Everything runs on a single fixed-timestep update, synchronous with the
//! engine's step. Forces applied through [`ForcePointSet::apply`] act for the
//! current step only; there is no accumulation or catch-up.
//!
//! # Coordinate System
//!
//! Consistent with the rest of the simulation stack:
//!
//! - X: right
//! - Y: forward (rope chains extend along local +Y)
//! - Z: up (water height and buoyancy act along Z)
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_tether::RopeConfig;
//!
//! let config = RopeConfig {
//!     length: 2.0,
//!     segment_length: 0.2,
//!     diameter: 0.01,
//!     ..RopeConfig::default()
//! };
//!
//! // 2.0 m of rope at 0.2 m segments (less the diameter adjustment)
//! assert_eq!(config.segment_count(), 11);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-tether/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,   // Many methods can't be const due to nalgebra
    clippy::cast_precision_loss,    // usize to f64 is fine for point/segment counts
    clippy::missing_errors_doc,     // Error docs added where non-obvious
    clippy::suboptimal_flops        // mul_add style changes aren't always clearer
)]

mod body;
mod config;
mod engine;
mod error;
mod force;
mod pose;
mod rewrite;
mod rope;

#[cfg(test)]
pub(crate) mod testkit;

pub use body::MixedBody;
pub use config::RopeConfig;
pub use engine::{
    ArticulatedHandle, BodyRef, BodySpec, ColliderHandle, GroupHandle, JointHandle, JointSpec,
    PhysicsEngine, RigidHandle, WaterSurface,
};
pub use error::TetherError;
pub use force::{mesh_volume, ForcePoint, ForcePointConfig, ForcePointSet, VolumeSource};
pub use pose::Pose;
pub use rewrite::{RewriteState, RopeEvent, TopologyRewriter};
pub use rope::{RopeChain, RopeLink, StickTarget};

// Re-export math types for convenience
pub use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Result type for tether operations.
pub type Result<T> = std::result::Result<T, TetherError>;
