//! Rope configuration and derived segment parameters.
//!
//! A [`RopeConfig`] is immutable per spawn: every geometric and mass
//! parameter of the chain (segment count, spacing, per-segment masses) is
//! derived from it so the pieces stay consistent with each other.

use crate::error::TetherError;
use crate::Result;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Segment counts above this suggest an overly fine discretization.
///
/// Non-fatal: the chain still spawns, but the constraint solver will have to
/// work through that many coupled joints every step.
pub const SEGMENT_COUNT_WARN_THRESHOLD: usize = 30;

/// Parameters of one rope, fixed at spawn time.
///
/// # Example
///
/// ```
/// use sim_tether::RopeConfig;
///
/// let config = RopeConfig {
///     length: 2.0,
///     segment_length: 0.2,
///     diameter: 0.01,
///     ..RopeConfig::default()
/// };
/// assert_eq!(config.segment_count(), 11);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RopeConfig {
    /// Rope diameter in meters.
    pub diameter: f64,
    /// Diameter of the segment collision capsules in meters. Larger is more
    /// stable for the solver; it does not need to match the visual diameter.
    pub collision_diameter: f64,
    /// Target total rope length in meters. Rounded up to whole segments.
    pub length: f64,
    /// Target length of each segment in meters. Smaller is more realistic
    /// but harder to simulate.
    pub segment_length: f64,
    /// Rope mass per meter in kg/m. Used for the per-segment gravity mass.
    pub mass_per_meter: f64,
    /// Mass of the buoy at the rope's end in kg. Zero means no buoy.
    pub buoy_mass: f64,
    /// Each segment's simulation mass as a fraction of the anchor body's
    /// mass. A floor for solver stability only, never a gravity mass.
    pub segment_mass_ratio: f64,
    /// Fraction of the rope length at which end-to-end distance counts as
    /// taut and triggers stick replacement.
    pub replacement_tolerance: f64,
    /// Break force for the inter-segment joints, if they should be breakable.
    pub joint_break_force: Option<f64>,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            diameter: 0.01,
            collision_diameter: 0.1,
            length: 1.0,
            segment_length: 0.1,
            mass_per_meter: 0.0005, // 0.5 g/m, a thin line
            buoy_mass: 0.0,
            segment_mass_ratio: 0.01,
            replacement_tolerance: 0.95,
            joint_break_force: None,
        }
    }
}

impl RopeConfig {
    /// Number of segments the chain will spawn with.
    ///
    /// `ceil(length / (segment_length - diameter))`: rounding up means the
    /// spawned chain never comes up short of the target length.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        let spacing = self.segment_length - self.diameter;
        if spacing <= 0.0 || self.length <= 0.0 {
            return 0;
        }
        (self.length / spacing).ceil() as usize
    }

    /// Distance between consecutive segment origins along the chain.
    ///
    /// `length / segment_count()`: the count rounds up, so the segments
    /// divide the rope evenly and a freshly spawned chain spans exactly the
    /// configured length rather than overshooting it.
    #[must_use]
    pub fn segment_spacing(&self) -> f64 {
        let count = self.segment_count();
        if count == 0 {
            return 0.0;
        }
        self.length / count as f64
    }

    /// Gravity mass of one segment in kg: `mass_per_meter * segment_length`.
    ///
    /// Distinct from the simulation mass, which has a stability floor
    /// relative to the anchor (see [`RopeConfig::segment_sim_mass`]).
    #[must_use]
    pub fn ideal_segment_mass(&self) -> f64 {
        self.mass_per_meter * self.segment_length
    }

    /// Simulation mass of one segment given the anchor body's mass.
    ///
    /// Very light segments next to a heavy anchor destabilize constraint
    /// resolution, so the mass is floored at `anchor_mass * segment_mass_ratio`.
    #[must_use]
    pub fn segment_sim_mass(&self, anchor_mass: f64) -> f64 {
        self.ideal_segment_mass()
            .max(anchor_mass * self.segment_mass_ratio)
    }

    /// End-to-end distance at which the rope counts as taut.
    #[must_use]
    pub fn taut_distance(&self) -> f64 {
        self.length * self.replacement_tolerance
    }

    /// Validate the configuration.
    ///
    /// Fatal problems (non-positive lengths, a segment shorter than the rope
    /// is thick, zero segments) are errors. An oversized segment count is
    /// only warned about.
    pub fn validate(&self) -> Result<()> {
        if !self.diameter.is_finite() || self.diameter <= 0.0 {
            return Err(TetherError::invalid_config("diameter must be positive"));
        }
        if !self.segment_length.is_finite() || self.segment_length <= 0.0 {
            return Err(TetherError::invalid_config(
                "segment length must be positive",
            ));
        }
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(TetherError::invalid_config("rope length must be positive"));
        }
        if self.segment_length <= self.diameter {
            return Err(TetherError::invalid_config(
                "segment length must exceed the rope diameter",
            ));
        }
        if self.collision_diameter <= 0.0 {
            return Err(TetherError::invalid_config(
                "collision diameter must be positive",
            ));
        }
        if self.mass_per_meter < 0.0 || self.buoy_mass < 0.0 || self.segment_mass_ratio < 0.0 {
            return Err(TetherError::invalid_config("masses cannot be negative"));
        }
        if !(0.0..=1.0).contains(&self.replacement_tolerance) || self.replacement_tolerance == 0.0 {
            return Err(TetherError::invalid_config(
                "replacement tolerance must be in (0, 1]",
            ));
        }

        let count = self.segment_count();
        if count == 0 {
            return Err(TetherError::invalid_config(
                "configuration yields zero segments",
            ));
        }
        if count > SEGMENT_COUNT_WARN_THRESHOLD {
            warn!(
                segments = count,
                "rope will spawn with many segments, might be too many"
            );
        }

        Ok(())
    }
}
