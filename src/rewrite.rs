//! Taut-rope topology rewrite.
//!
//! A slack rope is simulated as a chain of jointed segments; once it goes
//! taut and load-bearing, that chain is numerically hostile to the constraint
//! solver. The [`TopologyRewriter`] watches for tautness (or an outright
//! joint break) and swaps the flexible chain for a single rigid stick
//! spanning the same two endpoints, exactly once per chain instance.
//!
//! The rewrite is an explicit state machine:
//!
//! ```text
//! Intact -> (taut or break event) -> Replacing -> Replaced
//! ```
//!
//! `Replacing` is atomic from the caller's point of view; no force or joint
//! computation observes the chain mid-rebuild. Once `Replaced`, further
//! events are ignored. There is no automatic reversal: respawning a fresh
//! flexible chain is a separate, caller-initiated action.

use crate::engine::PhysicsEngine;
use crate::error::TetherError;
use crate::rope::{RopeChain, StickTarget};
use crate::Result;
use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where the rewriter is in the chain's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RewriteState {
    /// The flexible chain is live and being observed.
    #[default]
    Intact,
    /// Mid-swap: the chain is being destroyed and the stick synthesized.
    Replacing,
    /// The stick is in place; tautness is no longer observed.
    Replaced,
}

/// An observed rope condition that can trigger the rewrite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RopeEvent {
    /// End-to-end distance reached the taut threshold.
    Taut {
        /// The measured end-to-end distance in meters.
        distance: f64,
    },
    /// The engine reported a joint break, carrying the body the rope had
    /// most recently connected to.
    JointBroken {
        /// The connection to re-home the stick onto.
        target: StickTarget,
    },
}

/// Reacts to tautness/break events by re-homing the rope endpoints onto a
/// single rigid replacement segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyRewriter {
    state: RewriteState,
    missing_target_reported: bool,
}

impl TopologyRewriter {
    /// Create a rewriter in the `Intact` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> RewriteState {
        self.state
    }

    /// Measure the chain and fire the taut trigger when the end-to-end
    /// distance reaches the configured fraction of the rope length.
    ///
    /// Call once per step while `Intact`; does nothing in any other state.
    /// Returns `true` when this call performed the replacement.
    pub fn observe(
        &mut self,
        chain: &mut RopeChain,
        engine: &mut dyn PhysicsEngine,
    ) -> Result<bool> {
        if self.state != RewriteState::Intact {
            return Ok(false);
        }
        let Some(distance) = chain.end_to_end_distance(engine) else {
            return Ok(false);
        };
        if distance < chain.config().taut_distance() {
            return Ok(false);
        }
        self.on_event(RopeEvent::Taut { distance }, chain, engine)
    }

    /// Handle a rope event.
    ///
    /// Exactly one event per chain instance performs the swap; everything
    /// after is a no-op returning `false`. A taut event with no retained
    /// connection target cannot be honored - the chain stays intact and the
    /// caller gets [`TetherError::MissingTarget`] on the first occurrence.
    /// While the condition persists, further taut events are inert no-ops;
    /// a target set later re-arms the swap.
    pub fn on_event(
        &mut self,
        event: RopeEvent,
        chain: &mut RopeChain,
        engine: &mut dyn PhysicsEngine,
    ) -> Result<bool> {
        if self.state != RewriteState::Intact {
            return Ok(false);
        }

        let target = match event {
            RopeEvent::JointBroken { target } => target,
            RopeEvent::Taut { distance } => match chain.hook() {
                Some(target) => {
                    info!(distance, "rope taut, replacing chain with stick");
                    target
                }
                None => {
                    if self.missing_target_reported {
                        return Ok(false);
                    }
                    self.missing_target_reported = true;
                    warn!(distance, "rope taut but no connection target retained");
                    return Err(TetherError::MissingTarget);
                }
            },
        };

        self.state = RewriteState::Replacing;
        match chain.replace_with_stick(engine, &target) {
            Ok(()) => {
                self.state = RewriteState::Replaced;
                Ok(true)
            }
            Err(err) => {
                // The chain is gone either way; do not observe it again
                self.state = RewriteState::Replaced;
                Err(err)
            }
        }
    }
}
