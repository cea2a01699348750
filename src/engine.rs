//! The consumed physical-body interface.
//!
//! The integrator, constraint solver, and collision pipeline live in an
//! external engine. This module defines the narrow surface this crate drives
//! it through: opaque handles, body/joint creation specs, and the
//! [`PhysicsEngine`] trait. Getters return `Option` so callers can re-check
//! handle liveness every step - chain entities can be destroyed at arbitrary
//! step boundaries and must never be assumed valid.
//!
//! The water surface is a separate injected collaborator, [`WaterSurface`],
//! queried fresh every step with no caching.

use crate::pose::Pose;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to a free rigid body in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidHandle(pub u64);

impl RigidHandle {
    /// Create a new handle from a raw ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to an articulated (chain) body in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArticulatedHandle(pub u64);

impl ArticulatedHandle {
    /// Create a new handle from a raw ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to a collider owned by some body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColliderHandle(pub u64);

/// Handle to a constraint joint between two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointHandle(pub u64);

/// Handle to a named entity group (the rope's container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupHandle(pub u64);

/// Reference to a physical body of either kind.
///
/// Engines expose free rigid bodies and articulated bodies as unrelated
/// types; everything in this crate that can attach to "some body" takes a
/// `BodyRef` and lets the engine route the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodyRef {
    /// A free rigid body.
    Rigid(RigidHandle),
    /// A link of an articulated chain.
    Articulated(ArticulatedHandle),
}

impl std::fmt::Display for BodyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rigid(h) => write!(f, "Rigid({})", h.raw()),
            Self::Articulated(h) => write!(f, "Articulated({})", h.raw()),
        }
    }
}

impl From<RigidHandle> for BodyRef {
    fn from(h: RigidHandle) -> Self {
        Self::Rigid(h)
    }
}

impl From<ArticulatedHandle> for BodyRef {
    fn from(h: ArticulatedHandle) -> Self {
        Self::Articulated(h)
    }
}

/// Specification for creating one rope-segment body.
///
/// Segments are capsules aligned with their local +Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodySpec {
    /// Initial world pose.
    pub pose: Pose,
    /// Simulation mass in kg.
    pub mass: f64,
    /// Capsule half-length along local +Y (m).
    pub half_length: f64,
    /// Capsule radius (m). This is the collision radius, which may be much
    /// larger than the visual rope diameter.
    pub radius: f64,
}

impl BodySpec {
    /// Create a capsule segment spec.
    #[must_use]
    pub const fn capsule(pose: Pose, mass: f64, half_length: f64, radius: f64) -> Self {
        Self {
            pose,
            mass,
            half_length,
            radius,
        }
    }
}

/// Specification for creating a constraint joint.
///
/// Anchors are given in each body's local frame. A `break_force` of `None`
/// makes the joint unbreakable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointSpec {
    /// The newly created segment body.
    pub child: RigidHandle,
    /// The body the segment connects to: the previous link or an anchor.
    pub parent: BodyRef,
    /// Anchor point in the parent body's local frame.
    pub parent_anchor: Point3<f64>,
    /// Anchor point in the child body's local frame.
    pub child_anchor: Point3<f64>,
    /// Force at which the joint breaks, if any.
    pub break_force: Option<f64>,
    /// Whether the solver may preprocess this joint. Disabled for the stick
    /// replacement's second joint and the buoy joint, which would otherwise
    /// fight the anchor joint.
    pub enable_preprocessing: bool,
}

impl JointSpec {
    /// Create a joint between a child segment and a parent body, anchored at
    /// both origins, unbreakable, with preprocessing enabled.
    #[must_use]
    pub fn new(child: RigidHandle, parent: impl Into<BodyRef>) -> Self {
        Self {
            child,
            parent: parent.into(),
            parent_anchor: Point3::origin(),
            child_anchor: Point3::origin(),
            break_force: None,
            enable_preprocessing: true,
        }
    }

    /// Set the anchor points (in their respective local frames).
    #[must_use]
    pub fn with_anchors(mut self, parent: Point3<f64>, child: Point3<f64>) -> Self {
        self.parent_anchor = parent;
        self.child_anchor = child;
        self
    }

    /// Set the break force threshold.
    #[must_use]
    pub fn with_break_force(mut self, force: f64) -> Self {
        self.break_force = Some(force);
        self
    }

    /// Disable solver preprocessing for this joint.
    #[must_use]
    pub fn without_preprocessing(mut self) -> Self {
        self.enable_preprocessing = false;
        self
    }
}

/// The capability surface this crate needs from a physics engine.
///
/// All getters return `Option`: a `None` means the handle is stale (the
/// entity was destroyed externally), which per-step code treats as "skip this
/// step" and construction-time code converts to
/// [`TetherError::BodyRemoved`](crate::TetherError::BodyRemoved).
pub trait PhysicsEngine {
    /// Check whether a body still exists.
    fn contains(&self, body: BodyRef) -> bool;

    /// Get a body's world pose.
    fn pose(&self, body: BodyRef) -> Option<Pose>;

    /// Set a body's world pose.
    fn set_pose(&mut self, body: BodyRef, pose: Pose);

    /// Get a body's mass in kg.
    fn mass(&self, body: BodyRef) -> Option<f64>;

    /// Set a body's mass in kg.
    fn set_mass(&mut self, body: BodyRef, mass: f64);

    /// Get a body's center of mass in its local frame.
    fn center_of_mass(&self, body: BodyRef) -> Option<Vector3<f64>>;

    /// Override a body's center of mass in its local frame.
    fn set_center_of_mass(&mut self, body: BodyRef, com: Vector3<f64>);

    /// Enable or disable the engine's own center-of-mass computation.
    fn set_automatic_center_of_mass(&mut self, body: BodyRef, enabled: bool);

    /// Check whether the engine applies gravity to this body.
    fn gravity_enabled(&self, body: BodyRef) -> Option<bool>;

    /// Enable or disable engine gravity for this body.
    fn set_gravity_enabled(&mut self, body: BodyRef, enabled: bool);

    /// Apply a continuous force at a world point, for the current step only.
    ///
    /// No accumulation across steps: a caller wanting sustained force must
    /// call this every step.
    fn apply_force_at_point(&mut self, body: BodyRef, force: Vector3<f64>, point: Point3<f64>);

    /// Create a rigid segment body.
    fn create_body(&mut self, spec: BodySpec) -> RigidHandle;

    /// Destroy a body and every joint attached to it. Returns `false` if the
    /// handle was already gone.
    fn destroy_body(&mut self, body: RigidHandle) -> bool;

    /// Create a constraint joint.
    fn create_joint(&mut self, spec: JointSpec) -> JointHandle;

    /// Get the collider owned by a body, if it has one.
    fn collider(&self, body: BodyRef) -> Option<ColliderHandle>;

    /// Permanently disable collision between two colliders.
    fn disable_collision_pair(&mut self, a: ColliderHandle, b: ColliderHandle);

    /// Find a named group under the simulation root.
    fn find_group(&self, name: &str) -> Option<GroupHandle>;

    /// Create a named group at the given pose.
    fn create_group(&mut self, name: &str, pose: Pose) -> GroupHandle;

    /// Get a group's world pose.
    fn group_pose(&self, group: GroupHandle) -> Option<Pose>;

    /// Parent a body under a group.
    fn attach_to_group(&mut self, group: GroupHandle, body: RigidHandle);
}

/// A queryable water surface.
///
/// Implemented by the host's height field; this crate only reads it.
pub trait WaterSurface {
    /// Local water-surface height (world Z) at a world position.
    ///
    /// Only the horizontal components of `position` are meaningful.
    fn height_at(&self, position: &Point3<f64>) -> f64;
}
