//! Rope chain construction and teardown.
//!
//! A [`RopeChain`] spawns an ordered sequence of capsule segments, each
//! jointed to its predecessor, with the first segment jointed to an external
//! anchor body. Geometry and masses are derived from a [`RopeConfig`] so the
//! pieces stay mutually consistent. The chain also owns the taut-rope
//! endgame: [`RopeChain::replace_with_stick`] swaps the whole flexible chain
//! for one rigid segment spanning the same two endpoints.

use crate::body::MixedBody;
use crate::config::RopeConfig;
use crate::engine::{
    BodyRef, BodySpec, ColliderHandle, GroupHandle, JointHandle, JointSpec, PhysicsEngine,
    RigidHandle,
};
use crate::error::TetherError;
use crate::pose::Pose;
use crate::Result;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name of the reusable container group the chain spawns under.
const CONTAINER_NAME: &str = "rope";

/// The body and local point a taut rope should be re-homed onto.
///
/// Captured by whatever senses the rope attaching to (or breaking away from)
/// another object; the rewriter has no other way to know what to reconnect
/// to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StickTarget {
    /// The other body the rope most recently connected to.
    pub body: BodyRef,
    /// Connection point in that body's local frame.
    pub local_point: Point3<f64>,
}

impl StickTarget {
    /// Create a target at a local point on a body.
    #[must_use]
    pub fn new(body: impl Into<BodyRef>, local_point: Point3<f64>) -> Self {
        Self {
            body: body.into(),
            local_point,
        }
    }
}

/// One instantiated rope segment.
///
/// Links are owned by their chain and never outlive it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RopeLink {
    /// Ordinal index: physical order along the rope, 0 at the anchor.
    pub index: usize,
    /// The segment's rigid body.
    pub body: RigidHandle,
    /// Joint to the predecessor link, or to the anchor for index 0.
    pub joint: JointHandle,
    /// Position in the container's local frame at spawn time.
    pub local_position: Point3<f64>,
    /// Whether this is the end buoy rather than a rope segment.
    pub is_buoy: bool,
}

/// Builds and tears down the jointed segment chain.
#[derive(Debug)]
pub struct RopeChain {
    config: RopeConfig,
    anchor: MixedBody,
    base_collider: Option<ColliderHandle>,
    links: Vec<RopeLink>,
    container: Option<GroupHandle>,
    hook: Option<StickTarget>,
}

impl RopeChain {
    /// Create a chain for the given configuration and anchor.
    ///
    /// `base_collider` is the collider of the body the rope hangs off;
    /// collision between it and the first segment is disabled at spawn so the
    /// rope does not fight its own attachment. Configuration problems are
    /// reported here, eagerly.
    pub fn new(
        config: RopeConfig,
        anchor: MixedBody,
        base_collider: Option<ColliderHandle>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            anchor,
            base_collider,
            links: Vec::new(),
            container: None,
            hook: None,
        })
    }

    /// The chain's configuration.
    #[must_use]
    pub fn config(&self) -> &RopeConfig {
        &self.config
    }

    /// The anchor the first link connects to.
    #[must_use]
    pub fn anchor(&self) -> &MixedBody {
        &self.anchor
    }

    /// The instantiated links, in physical order.
    #[must_use]
    pub fn links(&self) -> &[RopeLink] {
        &self.links
    }

    /// Whether the chain currently has any links.
    #[must_use]
    pub fn is_spawned(&self) -> bool {
        !self.links.is_empty()
    }

    /// The container group, once one exists.
    #[must_use]
    pub fn container(&self) -> Option<GroupHandle> {
        self.container
    }

    /// Retain the most recent attachment target for a later stick swap.
    pub fn set_hook(&mut self, target: StickTarget) {
        self.hook = Some(target);
    }

    /// The retained attachment target, if any.
    #[must_use]
    pub fn hook(&self) -> Option<StickTarget> {
        self.hook
    }

    /// Look up the container group by name, or create it at the anchor pose.
    ///
    /// The container is created lazily on first spawn and reused afterwards,
    /// so respawning the chain repeatedly does not leak parent entities.
    fn ensure_container(&mut self, engine: &mut dyn PhysicsEngine, anchor_pose: Pose) -> Pose {
        let existing = self
            .container
            .filter(|g| engine.group_pose(*g).is_some())
            .or_else(|| engine.find_group(CONTAINER_NAME));

        let group = existing.unwrap_or_else(|| engine.create_group(CONTAINER_NAME, anchor_pose));
        self.container = Some(group);
        engine.group_pose(group).unwrap_or(anchor_pose)
    }

    /// Spawn the full chain.
    ///
    /// Links are instantiated in strict index order: link 0 jointed to the
    /// anchor, each subsequent link jointed to its predecessor. Any links
    /// from an earlier spawn are torn down first.
    pub fn spawn(&mut self, engine: &mut dyn PhysicsEngine) -> Result<()> {
        self.teardown(engine);

        let anchor_pose = self.anchor.pose(engine)?;
        let anchor_mass = self.anchor.mass(engine)?;
        let container_pose = self.ensure_container(engine, anchor_pose);

        let sim_mass = self.config.segment_sim_mass(anchor_mass);
        let count = self.config.segment_count();
        let half_length = self.config.segment_length / 2.0;

        // Link 0 starts flush with the anchor
        let mut local = Point3::new(0.0, half_length, 0.0);
        let first = self.spawn_segment(
            engine,
            &container_pose,
            local,
            anchor_pose.rotation,
            sim_mass,
            half_length,
            self.anchor.body_ref(),
        );
        self.exclude_base_collision(engine, first.body);
        self.links.push(first);

        for index in 1..count {
            let prev = self.links[index - 1];
            local = Point3::new(0.0, prev.local_position.y + self.config.segment_spacing(), 0.0);
            let prev_rotation = engine
                .pose(BodyRef::Rigid(prev.body))
                .map_or(anchor_pose.rotation, |p| p.rotation);

            let link = self.spawn_segment(
                engine,
                &container_pose,
                local,
                prev_rotation,
                sim_mass,
                half_length,
                BodyRef::Rigid(prev.body),
            );
            self.links.push(RopeLink { index, ..link });
        }

        if self.config.buoy_mass > 0.0 {
            self.spawn_buoy(engine, &container_pose, count);
        }

        Ok(())
    }

    /// Instantiate one segment at a container-local position and joint it to
    /// `parent`.
    #[allow(clippy::too_many_arguments)]
    fn spawn_segment(
        &self,
        engine: &mut dyn PhysicsEngine,
        container_pose: &Pose,
        local: Point3<f64>,
        rotation: nalgebra::UnitQuaternion<f64>,
        mass: f64,
        half_length: f64,
        parent: BodyRef,
    ) -> RopeLink {
        let pose = Pose::from_position_rotation(container_pose.transform_point(&local), rotation);
        let body = engine.create_body(BodySpec::capsule(
            pose,
            mass,
            half_length,
            self.config.collision_diameter / 2.0,
        ));
        if let Some(group) = self.container {
            engine.attach_to_group(group, body);
        }

        let mut spec = JointSpec::new(body, parent)
            .with_anchors(Point3::origin(), Point3::new(0.0, -half_length, 0.0));
        if let Some(force) = self.config.joint_break_force {
            spec = spec.with_break_force(force);
        }
        let joint = engine.create_joint(spec);

        RopeLink {
            index: 0,
            body,
            joint,
            local_position: local,
            is_buoy: false,
        }
    }

    /// Disable collision between the first link and the base body, once.
    fn exclude_base_collision(&self, engine: &mut dyn PhysicsEngine, first_link: RigidHandle) {
        if let (Some(base), Some(link)) = (
            self.base_collider,
            engine.collider(BodyRef::Rigid(first_link)),
        ) {
            engine.disable_collision_pair(link, base);
        }
    }

    /// Instantiate the end buoy after the last link.
    fn spawn_buoy(&mut self, engine: &mut dyn PhysicsEngine, container_pose: &Pose, index: usize) {
        let Some(last) = self.links.last().copied() else {
            return;
        };

        let radius = self.config.collision_diameter / 2.0;
        let local = Point3::new(
            0.0,
            last.local_position.y + self.config.segment_spacing(),
            0.0,
        );
        let rotation = engine
            .pose(BodyRef::Rigid(last.body))
            .map_or(container_pose.rotation, |p| p.rotation);

        let pose = Pose::from_position_rotation(container_pose.transform_point(&local), rotation);
        let body = engine.create_body(BodySpec::capsule(
            pose,
            self.config.buoy_mass,
            radius,
            radius,
        ));
        if let Some(group) = self.container {
            engine.attach_to_group(group, body);
        }

        let joint = engine.create_joint(
            JointSpec::new(body, last.body)
                .with_anchors(
                    Point3::new(0.0, self.config.segment_length / 2.0, 0.0),
                    Point3::origin(),
                )
                .without_preprocessing(),
        );

        self.links.push(RopeLink {
            index,
            body,
            joint,
            local_position: local,
            is_buoy: true,
        });
    }

    /// Destroy every chain entity, in reverse index order.
    ///
    /// Reverse order means destruction never references an already-destroyed
    /// predecessor. Idempotent: tearing down an empty chain is a no-op.
    pub fn teardown(&mut self, engine: &mut dyn PhysicsEngine) {
        for link in self.links.drain(..).rev() {
            engine.destroy_body(link.body);
        }
    }

    /// World position of the chain's far end (the terminal link's tip).
    #[must_use]
    pub fn end_position(&self, engine: &dyn PhysicsEngine) -> Option<Point3<f64>> {
        let last = self.links.last()?;
        let pose = engine.pose(BodyRef::Rigid(last.body))?;
        let tip = if last.is_buoy {
            Point3::origin()
        } else {
            Point3::new(0.0, self.config.segment_length / 2.0, 0.0)
        };
        Some(pose.transform_point(&tip))
    }

    /// Euclidean distance from the anchor to the chain's far end.
    ///
    /// Physical slack makes this vary at runtime; it is what the topology
    /// rewriter watches. `None` when the chain is not spawned or a body is
    /// gone.
    #[must_use]
    pub fn end_to_end_distance(&self, engine: &dyn PhysicsEngine) -> Option<f64> {
        let anchor_pos = engine.pose(self.anchor.body_ref())?.position;
        let end = self.end_position(engine)?;
        Some((end - anchor_pos).norm())
    }

    /// Whether the end-to-end distance has reached the taut threshold.
    #[must_use]
    pub fn is_taut(&self, engine: &dyn PhysicsEngine) -> bool {
        self.end_to_end_distance(engine)
            .is_some_and(|d| d >= self.config.taut_distance())
    }

    /// Replace the flexible chain with one rigid stick between the anchor
    /// and the target connection point.
    ///
    /// Atomic from the caller's view: all current links are destroyed, then
    /// exactly one full-rope-length segment is synthesized at the midpoint of
    /// the two endpoints, oriented to face the target. Its anchor joint is
    /// set up as link 0's would be, plus a second, non-breakable joint to the
    /// target body.
    pub fn replace_with_stick(
        &mut self,
        engine: &mut dyn PhysicsEngine,
        target: &StickTarget,
    ) -> Result<()> {
        let target_pose = engine
            .pose(target.body)
            .ok_or(TetherError::BodyRemoved(target.body))?;
        let target_point = target_pose.transform_point(&target.local_point);
        let anchor_pose = self.anchor.pose(engine)?;
        let anchor_mass = self.anchor.mass(engine)?;

        self.teardown(engine);

        let length = self.config.length;
        let half = length / 2.0;
        let midpoint = Point3::from((anchor_pose.position.coords + target_point.coords) / 2.0);
        let pose = Pose::looking_at(midpoint, target_point);

        let body = engine.create_body(BodySpec::capsule(
            pose,
            self.config.segment_sim_mass(anchor_mass),
            half,
            self.config.collision_diameter / 2.0,
        ));
        if let Some(group) = self.container.filter(|g| engine.group_pose(*g).is_some()) {
            engine.attach_to_group(group, body);
        }
        self.exclude_base_collision(engine, body);

        // Anchor joint, exactly as link 0 gets it
        let mut anchor_spec = JointSpec::new(body, self.anchor.body_ref())
            .with_anchors(Point3::origin(), Point3::new(0.0, -half, 0.0));
        if let Some(force) = self.config.joint_break_force {
            anchor_spec = anchor_spec.with_break_force(force);
        }
        let joint = engine.create_joint(anchor_spec);

        // The stick is load-bearing by definition; its far joint never breaks
        engine.create_joint(
            JointSpec::new(body, target.body)
                .with_anchors(target.local_point, Point3::new(0.0, half, 0.0))
                .without_preprocessing(),
        );

        self.links.push(RopeLink {
            index: 0,
            body,
            joint,
            local_position: Point3::origin(),
            is_buoy: false,
        });

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::testkit::MockEngine;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn test_chain(config: RopeConfig) -> (MockEngine, RopeChain) {
        let mut engine = MockEngine::new();
        let anchor = engine.add_articulated(Pose::identity(), 15.0);
        let chain = RopeChain::new(config, MixedBody::articulated(anchor), None).unwrap();
        (engine, chain)
    }

    fn scenario_config() -> RopeConfig {
        RopeConfig {
            length: 2.0,
            segment_length: 0.2,
            diameter: 0.01,
            ..RopeConfig::default()
        }
    }

    #[test]
    fn test_spawn_scenario_eleven_segments() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();

        assert_eq!(chain.links().len(), 11);
        assert_eq!(chain.links()[0].index, 0);
        assert_eq!(chain.links()[10].index, 10);
        assert!(!chain.links()[10].is_buoy);

        // Link 0 joints to the external anchor, the rest to their predecessor
        let first_joint = engine.joint(chain.links()[0].joint).unwrap();
        assert_eq!(first_joint.parent, chain.anchor().body_ref());
        for pair in chain.links().windows(2) {
            let joint = engine.joint(pair[1].joint).unwrap();
            assert_eq!(joint.parent, BodyRef::Rigid(pair[0].body));
        }
    }

    #[test]
    fn test_link_positions_follow_spacing() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();

        let config = scenario_config();
        for link in chain.links() {
            let expected =
                config.segment_length / 2.0 + link.index as f64 * config.segment_spacing();
            assert_relative_eq!(link.local_position.y, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sim_mass_uses_anchor_ratio_floor() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();

        // anchor 15 kg at ratio 0.01 beats the ideal mass of a 0.2 m segment
        for link in chain.links() {
            let mass = engine.mass(BodyRef::Rigid(link.body)).unwrap();
            assert_relative_eq!(mass, 0.15, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_base_collision_excluded_once() {
        let mut engine = MockEngine::new();
        let anchor = engine.add_articulated(Pose::identity(), 15.0);
        let base_collider = engine.collider(BodyRef::Articulated(anchor)).unwrap();
        let mut chain = RopeChain::new(
            scenario_config(),
            MixedBody::articulated(anchor),
            Some(base_collider),
        )
        .unwrap();

        chain.spawn(&mut engine).unwrap();
        assert_eq!(engine.disabled_pair_count(), 1);
    }

    #[test]
    fn test_buoy_spawned_after_terminal_link() {
        let config = RopeConfig {
            buoy_mass: 0.4,
            ..scenario_config()
        };
        let (mut engine, mut chain) = test_chain(config);
        chain.spawn(&mut engine).unwrap();

        assert_eq!(chain.links().len(), 12);
        let buoy = chain.links().last().unwrap();
        assert!(buoy.is_buoy);
        assert_eq!(buoy.index, 11);
        assert_relative_eq!(
            engine.mass(BodyRef::Rigid(buoy.body)).unwrap(),
            0.4,
            epsilon = 1e-12
        );

        let joint = engine.joint(buoy.joint).unwrap();
        assert!(!joint.enable_preprocessing);
        assert_eq!(joint.parent, BodyRef::Rigid(chain.links()[10].body));
    }

    #[test]
    fn test_teardown_idempotent() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        let before = engine.body_count();
        chain.spawn(&mut engine).unwrap();
        assert_eq!(engine.body_count(), before + 11);

        chain.teardown(&mut engine);
        assert_eq!(engine.body_count(), before);
        assert!(!chain.is_spawned());

        // Second teardown is a no-op, not an error
        chain.teardown(&mut engine);
        assert_eq!(engine.body_count(), before);
    }

    #[test]
    fn test_container_reused_across_respawns() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();
        let container = chain.container().unwrap();

        chain.teardown(&mut engine);
        chain.spawn(&mut engine).unwrap();

        assert_eq!(chain.container(), Some(container));
        assert_eq!(engine.group_count(), 1);
    }

    #[test]
    fn test_respawn_replaces_existing_links() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        let before = engine.body_count();
        chain.spawn(&mut engine).unwrap();
        chain.spawn(&mut engine).unwrap();

        assert_eq!(chain.links().len(), 11);
        assert_eq!(engine.body_count(), before + 11);
    }

    #[test]
    fn test_end_to_end_distance_when_laid_out_straight() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();

        // Freshly spawned along +Y: tip of the last link
        let distance = chain.end_to_end_distance(&engine).unwrap();
        let config = scenario_config();
        let expected = config.segment_length / 2.0
            + 10.0 * config.segment_spacing()
            + config.segment_length / 2.0;
        assert_relative_eq!(distance, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_is_taut_threshold() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();

        // Chain spawns straight, so it starts beyond 95% of its length
        assert!(chain.is_taut(&engine));

        // Fold the terminal link back near the anchor: slack again
        let last = chain.links()[10].body;
        engine.set_pose(
            BodyRef::Rigid(last),
            Pose::from_position(Point3::new(0.0, 0.1, 0.0)),
        );
        assert!(!chain.is_taut(&engine));
    }

    #[test]
    fn test_replace_with_stick_geometry() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();

        // Hook exactly one rope length (2.0 m) from the anchor, off-axis
        let target_pos = Point3::new(0.0, 1.2, -1.6);
        let hook = engine.add_rigid(Pose::from_position(target_pos), 2.0);
        let target = StickTarget::new(hook, Point3::origin());
        let anchor_pos = engine.pose(chain.anchor().body_ref()).unwrap().position;

        chain.replace_with_stick(&mut engine, &target).unwrap();

        assert_eq!(chain.links().len(), 1);
        let stick = chain.links()[0];
        let pose = engine.pose(BodyRef::Rigid(stick.body)).unwrap();

        // Midpoint between the two connection points, facing the target
        assert_relative_eq!(
            pose.position.coords,
            (anchor_pos.coords + target_pos.coords) / 2.0,
            epsilon = 1e-12
        );
        let expected_dir = (target_pos - pose.position).normalize();
        assert_relative_eq!(pose.forward(), expected_dir, epsilon = 1e-12);

        // Endpoints preserved: the stick-side joint anchors land back on the
        // pre-replacement connection points
        let joints = engine.joints_for(stick.body);
        let near = joints
            .iter()
            .find(|j| j.parent == chain.anchor().body_ref())
            .unwrap();
        assert_relative_eq!(
            pose.transform_point(&near.child_anchor),
            anchor_pos,
            epsilon = 1e-12
        );
        let far = joints
            .iter()
            .find(|j| j.parent == BodyRef::Rigid(hook))
            .unwrap();
        assert_relative_eq!(
            pose.transform_point(&far.child_anchor),
            target_pos,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_replace_with_stick_joints() {
        let (mut engine, mut chain) = test_chain(RopeConfig {
            joint_break_force: Some(600.0),
            ..scenario_config()
        });
        chain.spawn(&mut engine).unwrap();

        let hook = engine.add_rigid(Pose::from_position(Point3::new(0.0, 2.0, 0.0)), 2.0);
        let target = StickTarget::new(hook, Point3::new(0.0, 0.0, 0.1));
        chain.replace_with_stick(&mut engine, &target).unwrap();

        let stick = chain.links()[0];
        let joints = engine.joints_for(stick.body);
        assert_eq!(joints.len(), 2);

        let anchor_joint = joints
            .iter()
            .find(|j| j.parent == chain.anchor().body_ref())
            .unwrap();
        assert_eq!(anchor_joint.break_force, Some(600.0));

        let hook_joint = joints
            .iter()
            .find(|j| j.parent == BodyRef::Rigid(hook))
            .unwrap();
        assert_eq!(hook_joint.break_force, None);
        assert!(!hook_joint.enable_preprocessing);
        assert_relative_eq!(
            hook_joint.parent_anchor.coords,
            Vector3::new(0.0, 0.0, 0.1),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_replace_errors_when_target_gone() {
        let (mut engine, mut chain) = test_chain(scenario_config());
        chain.spawn(&mut engine).unwrap();

        let hook = engine.add_rigid(Pose::identity(), 2.0);
        engine.destroy_body(hook);
        let target = StickTarget::new(hook, Point3::origin());

        let err = chain.replace_with_stick(&mut engine, &target).unwrap_err();
        assert!(err.is_body_removed());
    }

    #[test]
    fn test_hook_retention() {
        let (_, mut chain) = test_chain(scenario_config());
        assert!(chain.hook().is_none());

        let target = StickTarget::new(RigidHandle::new(9), Point3::origin());
        chain.set_hook(target);
        assert_eq!(chain.hook(), Some(target));
    }
}
