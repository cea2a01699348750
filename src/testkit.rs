//! Test doubles for the external collaborators.
//!
//! [`MockEngine`] is a bookkeeping-only [`PhysicsEngine`]: it stores poses,
//! masses, joints, and applied forces without integrating anything, which is
//! all the tests in this crate need. [`FlatWater`] is a constant-height
//! [`WaterSurface`].

use crate::engine::{
    ArticulatedHandle, BodyRef, BodySpec, ColliderHandle, GroupHandle, JointHandle, JointSpec,
    PhysicsEngine, RigidHandle, WaterSurface,
};
use crate::pose::Pose;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct MockBody {
    pose: Pose,
    mass: f64,
    center_of_mass: Vector3<f64>,
    automatic_com: bool,
    gravity_enabled: bool,
    collider: ColliderHandle,
}

impl MockBody {
    fn new(pose: Pose, mass: f64, collider: ColliderHandle) -> Self {
        Self {
            pose,
            mass,
            center_of_mass: Vector3::zeros(),
            automatic_com: true,
            gravity_enabled: true,
            collider,
        }
    }
}

#[derive(Debug, Clone)]
struct MockGroup {
    name: String,
    pose: Pose,
    members: Vec<RigidHandle>,
}

/// A recording physics engine for tests.
#[derive(Debug, Default)]
pub struct MockEngine {
    next_id: u64,
    bodies: HashMap<BodyRef, MockBody>,
    joints: Vec<(JointHandle, JointSpec)>,
    groups: Vec<(GroupHandle, MockGroup)>,
    forces: Vec<(BodyRef, Vector3<f64>, Point3<f64>)>,
    disabled_pairs: Vec<(ColliderHandle, ColliderHandle)>,
}

impl MockEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a pre-existing rigid body (an anchor, a hook).
    pub fn add_rigid(&mut self, pose: Pose, mass: f64) -> RigidHandle {
        let id = self.next();
        let collider = ColliderHandle(self.next());
        let handle = RigidHandle::new(id);
        self.bodies
            .insert(BodyRef::Rigid(handle), MockBody::new(pose, mass, collider));
        handle
    }

    /// Add a pre-existing articulated body.
    pub fn add_articulated(&mut self, pose: Pose, mass: f64) -> ArticulatedHandle {
        let id = self.next();
        let collider = ColliderHandle(self.next());
        let handle = ArticulatedHandle::new(id);
        self.bodies.insert(
            BodyRef::Articulated(handle),
            MockBody::new(pose, mass, collider),
        );
        handle
    }

    /// Forces applied to a body since the last [`MockEngine::clear_forces`].
    pub fn applied_forces(&self, body: BodyRef) -> Vec<(Vector3<f64>, Point3<f64>)> {
        self.forces
            .iter()
            .filter(|(b, _, _)| *b == body)
            .map(|(_, force, point)| (*force, *point))
            .collect()
    }

    /// Forget all recorded forces, as a step boundary would.
    pub fn clear_forces(&mut self) {
        self.forces.clear();
    }

    /// Whether the engine's automatic center-of-mass is on for a body.
    pub fn automatic_com(&self, body: BodyRef) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.automatic_com)
    }

    /// Look up a joint's spec.
    pub fn joint(&self, handle: JointHandle) -> Option<&JointSpec> {
        self.joints
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, spec)| spec)
    }

    /// All joints whose child is the given body.
    pub fn joints_for(&self, body: RigidHandle) -> Vec<JointSpec> {
        self.joints
            .iter()
            .filter(|(_, spec)| spec.child == body)
            .map(|(_, spec)| *spec)
            .collect()
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of groups ever created.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of collision pairs disabled so far.
    pub fn disabled_pair_count(&self) -> usize {
        self.disabled_pairs.len()
    }
}

impl PhysicsEngine for MockEngine {
    fn contains(&self, body: BodyRef) -> bool {
        self.bodies.contains_key(&body)
    }

    fn pose(&self, body: BodyRef) -> Option<Pose> {
        self.bodies.get(&body).map(|b| b.pose)
    }

    fn set_pose(&mut self, body: BodyRef, pose: Pose) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pose = pose;
        }
    }

    fn mass(&self, body: BodyRef) -> Option<f64> {
        self.bodies.get(&body).map(|b| b.mass)
    }

    fn set_mass(&mut self, body: BodyRef, mass: f64) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.mass = mass;
        }
    }

    fn center_of_mass(&self, body: BodyRef) -> Option<Vector3<f64>> {
        self.bodies.get(&body).map(|b| b.center_of_mass)
    }

    fn set_center_of_mass(&mut self, body: BodyRef, com: Vector3<f64>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.center_of_mass = com;
        }
    }

    fn set_automatic_center_of_mass(&mut self, body: BodyRef, enabled: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.automatic_com = enabled;
        }
    }

    fn gravity_enabled(&self, body: BodyRef) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.gravity_enabled)
    }

    fn set_gravity_enabled(&mut self, body: BodyRef, enabled: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.gravity_enabled = enabled;
        }
    }

    fn apply_force_at_point(&mut self, body: BodyRef, force: Vector3<f64>, point: Point3<f64>) {
        if self.bodies.contains_key(&body) {
            self.forces.push((body, force, point));
        }
    }

    fn create_body(&mut self, spec: BodySpec) -> RigidHandle {
        self.add_rigid(spec.pose, spec.mass)
    }

    fn destroy_body(&mut self, body: RigidHandle) -> bool {
        let key = BodyRef::Rigid(body);
        if self.bodies.remove(&key).is_none() {
            return false;
        }
        self.joints
            .retain(|(_, spec)| spec.child != body && spec.parent != key);
        true
    }

    fn create_joint(&mut self, spec: JointSpec) -> JointHandle {
        let handle = JointHandle(self.next());
        self.joints.push((handle, spec));
        handle
    }

    fn collider(&self, body: BodyRef) -> Option<ColliderHandle> {
        self.bodies.get(&body).map(|b| b.collider)
    }

    fn disable_collision_pair(&mut self, a: ColliderHandle, b: ColliderHandle) {
        self.disabled_pairs.push((a, b));
    }

    fn find_group(&self, name: &str) -> Option<GroupHandle> {
        self.groups
            .iter()
            .find(|(_, g)| g.name == name)
            .map(|(h, _)| *h)
    }

    fn create_group(&mut self, name: &str, pose: Pose) -> GroupHandle {
        let handle = GroupHandle(self.next());
        self.groups.push((
            handle,
            MockGroup {
                name: name.to_owned(),
                pose,
                members: Vec::new(),
            },
        ));
        handle
    }

    fn group_pose(&self, group: GroupHandle) -> Option<Pose> {
        self.groups
            .iter()
            .find(|(h, _)| *h == group)
            .map(|(_, g)| g.pose)
    }

    fn attach_to_group(&mut self, group: GroupHandle, body: RigidHandle) {
        if let Some((_, g)) = self.groups.iter_mut().find(|(h, _)| *h == group) {
            g.members.push(body);
        }
    }
}

/// A water surface at one constant height.
#[derive(Debug, Clone, Copy)]
pub struct FlatWater {
    level: f64,
}

impl FlatWater {
    /// Create a flat surface at the given world Z.
    pub fn new(level: f64) -> Self {
        Self { level }
    }
}

impl WaterSurface for FlatWater {
    fn height_at(&self, _position: &Point3<f64>) -> f64 {
        self.level
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_removes_attached_joints() {
        let mut engine = MockEngine::new();
        let a = engine.add_rigid(Pose::identity(), 1.0);
        let b = engine.create_body(BodySpec::capsule(Pose::identity(), 1.0, 0.1, 0.05));
        engine.create_joint(JointSpec::new(b, a));
        assert_eq!(engine.joints_for(b).len(), 1);

        engine.destroy_body(b);
        assert!(engine.joints_for(b).is_empty());
        assert!(!engine.contains(BodyRef::Rigid(b)));
    }

    #[test]
    fn test_flat_water() {
        let water = FlatWater::new(1.5);
        assert_eq!(water.height_at(&Point3::new(10.0, -3.0, 0.0)), 1.5);
    }
}
