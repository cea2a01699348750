//! Per-point gravity and buoyancy forcing.
//!
//! A body is discretized into force points; each point contributes `1/N` of
//! the body's gravity and buoyancy so that the total force and torque are
//! independent of how finely the body is split up. Buoyancy ramps in over a
//! small depth band below the waterline instead of stepping discontinuously
//! to full magnitude:
//!
//! ```text
//! depth = water_height - point_z
//! F_z   = min(F_max, V * rho * |g_z| * clamp01(depth / d_submerged) / N)
//! ```
//!
//! Forces act for the current step only; [`ForcePointSet::apply`] must run
//! once per fixed step, before the engine integrates.

use crate::body::MixedBody;
use crate::engine::{PhysicsEngine, WaterSurface};
use crate::error::TetherError;
use crate::Result;
use nalgebra::{Point3, Vector3};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a force point's displaced volume comes from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VolumeSource {
    /// Explicit volume in m³. Zero disables buoyancy for the point.
    Explicit(f64),
    /// Volume computed once at construction from a triangle mesh.
    Mesh {
        /// Mesh vertices in the body's local frame.
        vertices: Vec<Point3<f64>>,
        /// Triangle indices into `vertices`.
        indices: Vec<[usize; 3]>,
        /// The owning object's world scale.
        scale: Vector3<f64>,
    },
}

impl Default for VolumeSource {
    fn default() -> Self {
        Self::Explicit(0.0)
    }
}

/// Volume of a closed triangle mesh under a per-axis scale.
///
/// Sum of signed tetrahedron volumes against the origin; the absolute value
/// makes the result independent of winding order.
#[must_use]
pub fn mesh_volume(vertices: &[Point3<f64>], indices: &[[usize; 3]], scale: &Vector3<f64>) -> f64 {
    let scaled = |i: usize| -> Vector3<f64> {
        let v = vertices[i].coords;
        Vector3::new(v.x * scale.x, v.y * scale.y, v.z * scale.z)
    };

    let signed: f64 = indices
        .iter()
        .filter(|tri| tri.iter().all(|&i| i < vertices.len()))
        .map(|tri| {
            let (a, b, c) = (scaled(tri[0]), scaled(tri[1]), scaled(tri[2]));
            a.dot(&b.cross(&c)) / 6.0
        })
        .sum();

    signed.abs()
}

/// Configuration for one force point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForcePointConfig {
    /// Displaced volume for buoyancy.
    pub volume: VolumeSource,
    /// Water density in kg/m³.
    pub water_density: f64,
    /// Depth over which buoyancy ramps from zero to full (m).
    pub depth_before_submerged: f64,
    /// Clamp on the per-point vertical buoyancy force (N).
    pub max_buoyancy_force: f64,
    /// Whether this point also contributes gravity. When any point on a body
    /// does, the engine's own gravity for that body is disabled.
    pub add_gravity: bool,
    /// Gravity mass in kg. Zero means "use the owning body's total mass".
    pub mass: f64,
}

impl Default for ForcePointConfig {
    fn default() -> Self {
        Self {
            volume: VolumeSource::default(),
            water_density: 997.0,
            depth_before_submerged: 0.03,
            max_buoyancy_force: 1000.0,
            add_gravity: false,
            mass: 0.0,
        }
    }
}

impl ForcePointConfig {
    /// Set an explicit displaced volume.
    #[must_use]
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = VolumeSource::Explicit(volume);
        self
    }

    /// Make this point contribute gravity too.
    #[must_use]
    pub fn with_gravity(mut self) -> Self {
        self.add_gravity = true;
        self
    }

    /// Set an explicit gravity mass.
    #[must_use]
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.water_density <= 0.0 {
            return Err(TetherError::invalid_config("water density must be positive"));
        }
        if self.depth_before_submerged <= 0.0 {
            return Err(TetherError::invalid_config(
                "depth before submerged must be positive",
            ));
        }
        if self.max_buoyancy_force < 0.0 || self.mass < 0.0 {
            return Err(TetherError::invalid_config(
                "forces and masses cannot be negative",
            ));
        }
        Ok(())
    }
}

/// One resolved force point on a body.
///
/// Volume and gravity mass are fixed at construction; only the world position
/// (via the body pose) varies per step.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcePoint {
    local_position: Point3<f64>,
    volume: f64,
    gravity_mass: f64,
    water_density: f64,
    depth_before_submerged: f64,
    max_buoyancy_force: f64,
    add_gravity: bool,
}

impl ForcePoint {
    /// Position in the owning body's local frame.
    #[must_use]
    pub fn local_position(&self) -> Point3<f64> {
        self.local_position
    }

    /// Resolved displaced volume in m³.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Resolved gravity mass in kg.
    #[must_use]
    pub fn gravity_mass(&self) -> f64 {
        self.gravity_mass
    }

    /// Vertical buoyancy magnitude for this point at the given depth.
    ///
    /// Zero for `depth <= 0`, ramping linearly to full displacement over
    /// `depth_before_submerged`, clamped at the configured maximum. Shared by
    /// `point_count` points on the same body.
    #[must_use]
    pub fn buoyancy_force(&self, depth: f64, gravity_z: f64, point_count: usize) -> f64 {
        if depth <= 0.0 || point_count == 0 {
            return 0.0;
        }
        let submersion = (depth / self.depth_before_submerged).clamp(0.0, 1.0);
        let raw =
            self.volume * self.water_density * gravity_z.abs() * submersion / point_count as f64;
        raw.min(self.max_buoyancy_force)
    }
}

/// All force points on one body, applied once per fixed simulation step.
///
/// The point count is discovered once at construction and fixed for the
/// body's lifetime; there is no dynamic addition or removal of points.
#[derive(Debug, Clone)]
pub struct ForcePointSet {
    body: MixedBody,
    points: Vec<ForcePoint>,
}

impl ForcePointSet {
    /// Build the force-point set for a body.
    ///
    /// Initialization-time side effects on the body, each applied once:
    /// - when any point adds gravity, the engine's own gravity is disabled;
    /// - when `auto_center_of_mass` is set, the engine's automatic
    ///   center-of-mass computation is disabled and the center of mass is
    ///   overridden with the average of the point local positions.
    ///
    /// Mesh volumes are resolved here; a zero explicit mass resolves to the
    /// body's total mass.
    pub fn new(
        body: MixedBody,
        points: Vec<(Point3<f64>, ForcePointConfig)>,
        auto_center_of_mass: bool,
        engine: &mut dyn PhysicsEngine,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(TetherError::invalid_config(
                "a force point set needs at least one point",
            ));
        }

        let body_mass = body.mass(engine)?;
        let any_gravity = points.iter().any(|(_, config)| config.add_gravity);

        let mut resolved = Vec::with_capacity(points.len());
        for (local_position, config) in points {
            config.validate()?;

            let volume = match &config.volume {
                VolumeSource::Explicit(v) => *v,
                VolumeSource::Mesh {
                    vertices,
                    indices,
                    scale,
                } => mesh_volume(vertices, indices, scale),
            };

            let gravity_mass = if config.mass == 0.0 {
                body_mass
            } else {
                config.mass
            };

            resolved.push(ForcePoint {
                local_position,
                volume,
                gravity_mass,
                water_density: config.water_density,
                depth_before_submerged: config.depth_before_submerged,
                max_buoyancy_force: config.max_buoyancy_force,
                add_gravity: config.add_gravity,
            });
        }

        // The points take over gravity from the engine
        if any_gravity {
            body.set_gravity_enabled(engine, false)?;
        }

        if auto_center_of_mass {
            body.set_automatic_center_of_mass(engine, false)?;
            let sum: Vector3<f64> = resolved
                .iter()
                .map(|p| p.local_position.coords)
                .sum();
            body.set_center_of_mass(engine, sum / resolved.len() as f64)?;
        }

        Ok(Self {
            body,
            points: resolved,
        })
    }

    /// The owning body.
    #[must_use]
    pub fn body(&self) -> &MixedBody {
        &self.body
    }

    /// The resolved points.
    #[must_use]
    pub fn points(&self) -> &[ForcePoint] {
        &self.points
    }

    /// How many points share this body's forces.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Apply this step's gravity and buoyancy contribution.
    ///
    /// `gravity` is the world gravity vector (e.g. `(0, 0, -9.81)`). A body
    /// that has been destroyed externally makes the set inert for the step
    /// rather than erroring; "point above water" is a normal branch that
    /// simply skips buoyancy.
    pub fn apply(
        &self,
        engine: &mut dyn PhysicsEngine,
        water: &dyn WaterSurface,
        gravity: &Vector3<f64>,
    ) -> Result<()> {
        let Ok(pose) = self.body.pose(engine) else {
            debug!(body = %self.body.body_ref(), "force point body gone, skipping step");
            return Ok(());
        };

        let count = self.points.len();
        for point in &self.points {
            let world = pose.transform_point(&point.local_position);

            if point.add_gravity {
                let gravity_force = gravity * (point.gravity_mass / count as f64);
                self.body.apply_force_at_point(engine, gravity_force, world)?;
            }

            let depth = water.height_at(&world) - world.z;
            let magnitude = point.buoyancy_force(depth, gravity.z, count);
            if magnitude > 0.0 {
                self.body
                    .apply_force_at_point(engine, Vector3::new(0.0, 0.0, magnitude), world)?;
            }
        }

        Ok(())
    }

    /// Apply a water-current force, split across the submerged points.
    ///
    /// Points above the surface contribute nothing.
    pub fn apply_current(
        &self,
        engine: &mut dyn PhysicsEngine,
        water: &dyn WaterSurface,
        current: &Vector3<f64>,
    ) -> Result<()> {
        let Ok(pose) = self.body.pose(engine) else {
            debug!(body = %self.body.body_ref(), "force point body gone, skipping step");
            return Ok(());
        };

        let count = self.points.len() as f64;
        for point in &self.points {
            let world = pose.transform_point(&point.local_position);
            if world.z < water.height_at(&world) {
                self.body
                    .apply_force_at_point(engine, current / count, world)?;
            }
        }

        Ok(())
    }
}
