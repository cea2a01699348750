//! Uniform wrapper over the two physical-body kinds.
//!
//! Free rigid bodies and articulated (chain) bodies have no common ancestor
//! in the underlying engine even though they share almost all semantics this
//! crate cares about. [`MixedBody`] binds to exactly one of the two at
//! construction and exposes the shared capability set: mass, center of mass,
//! gravity flag, pose, and force application at a world point.

use crate::engine::{ArticulatedHandle, BodyRef, PhysicsEngine, RigidHandle};
use crate::error::TetherError;
use crate::pose::Pose;
use crate::Result;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A body of either kind, bound at construction.
///
/// Every accessor routes to whichever handle is bound and re-checks the
/// handle against the engine: a body destroyed externally yields
/// [`TetherError::BodyRemoved`] rather than stale data.
///
/// # Example
///
/// ```
/// use sim_tether::{MixedBody, RigidHandle};
///
/// let body = MixedBody::rigid(RigidHandle::new(0));
/// assert!(matches!(body.body_ref(), sim_tether::BodyRef::Rigid(_)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixedBody {
    binding: BodyRef,
}

impl MixedBody {
    /// Bind to exactly one of the two body kinds.
    ///
    /// Fails with [`TetherError::InvalidBinding`] when neither or both are
    /// supplied.
    pub fn new(
        rigid: Option<RigidHandle>,
        articulated: Option<ArticulatedHandle>,
    ) -> Result<Self> {
        match (rigid, articulated) {
            (Some(h), None) => Ok(Self::rigid(h)),
            (None, Some(h)) => Ok(Self::articulated(h)),
            (None, None) => Err(TetherError::InvalidBinding { supplied: 0 }),
            (Some(_), Some(_)) => Err(TetherError::InvalidBinding { supplied: 2 }),
        }
    }

    /// Bind to a free rigid body.
    #[must_use]
    pub const fn rigid(handle: RigidHandle) -> Self {
        Self {
            binding: BodyRef::Rigid(handle),
        }
    }

    /// Bind to an articulated body.
    #[must_use]
    pub const fn articulated(handle: ArticulatedHandle) -> Self {
        Self {
            binding: BodyRef::Articulated(handle),
        }
    }

    /// The bound handle.
    #[must_use]
    pub const fn body_ref(&self) -> BodyRef {
        self.binding
    }

    /// Check whether the bound body still exists in the engine.
    #[must_use]
    pub fn exists(&self, engine: &dyn PhysicsEngine) -> bool {
        engine.contains(self.binding)
    }

    fn removed(&self) -> TetherError {
        TetherError::BodyRemoved(self.binding)
    }

    /// Get the body's world pose.
    pub fn pose(&self, engine: &dyn PhysicsEngine) -> Result<Pose> {
        engine.pose(self.binding).ok_or_else(|| self.removed())
    }

    /// Get the body's mass in kg.
    pub fn mass(&self, engine: &dyn PhysicsEngine) -> Result<f64> {
        engine.mass(self.binding).ok_or_else(|| self.removed())
    }

    /// Set the body's mass in kg.
    pub fn set_mass(&self, engine: &mut dyn PhysicsEngine, mass: f64) -> Result<()> {
        if !engine.contains(self.binding) {
            return Err(self.removed());
        }
        engine.set_mass(self.binding, mass);
        Ok(())
    }

    /// Get the body's center of mass in its local frame.
    pub fn center_of_mass(&self, engine: &dyn PhysicsEngine) -> Result<Vector3<f64>> {
        engine
            .center_of_mass(self.binding)
            .ok_or_else(|| self.removed())
    }

    /// Override the body's center of mass in its local frame.
    pub fn set_center_of_mass(
        &self,
        engine: &mut dyn PhysicsEngine,
        com: Vector3<f64>,
    ) -> Result<()> {
        if !engine.contains(self.binding) {
            return Err(self.removed());
        }
        engine.set_center_of_mass(self.binding, com);
        Ok(())
    }

    /// Enable or disable the engine's own center-of-mass computation.
    pub fn set_automatic_center_of_mass(
        &self,
        engine: &mut dyn PhysicsEngine,
        enabled: bool,
    ) -> Result<()> {
        if !engine.contains(self.binding) {
            return Err(self.removed());
        }
        engine.set_automatic_center_of_mass(self.binding, enabled);
        Ok(())
    }

    /// Check whether the engine applies gravity to this body.
    pub fn gravity_enabled(&self, engine: &dyn PhysicsEngine) -> Result<bool> {
        engine
            .gravity_enabled(self.binding)
            .ok_or_else(|| self.removed())
    }

    /// Enable or disable engine gravity for this body.
    pub fn set_gravity_enabled(&self, engine: &mut dyn PhysicsEngine, enabled: bool) -> Result<()> {
        if !engine.contains(self.binding) {
            return Err(self.removed());
        }
        engine.set_gravity_enabled(self.binding, enabled);
        Ok(())
    }

    /// Apply a continuous force at a world point, for the current step only.
    pub fn apply_force_at_point(
        &self,
        engine: &mut dyn PhysicsEngine,
        force: Vector3<f64>,
        point: Point3<f64>,
    ) -> Result<()> {
        if !engine.contains(self.binding) {
            return Err(self.removed());
        }
        engine.apply_force_at_point(self.binding, force, point);
        Ok(())
    }
}
