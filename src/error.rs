//! Error types for tether operations.

use crate::engine::BodyRef;
use thiserror::Error;

/// Errors that can occur while building or driving a tether.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TetherError {
    /// Invalid rope or force-point configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A body binding needs exactly one of the rigid or articulated kinds.
    #[error("body binding requires exactly one of rigid or articulated, got {supplied}")]
    InvalidBinding {
        /// How many kinds were supplied (0 or 2).
        supplied: usize,
    },

    /// A body handle is no longer known to the engine.
    ///
    /// Chain entities can be torn down at arbitrary step boundaries, so
    /// handles are re-checked before use each step; this error surfaces when
    /// an operation cannot proceed without the body.
    #[error("body {0} no longer exists in the engine")]
    BodyRemoved(BodyRef),

    /// Stick replacement was requested but no connection target is known.
    ///
    /// The target is captured by the link that senses the attach/break event;
    /// without it the rewriter has nothing to reconnect to.
    #[error("no connection target retained for stick replacement")]
    MissingTarget,
}

impl TetherError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this error means a body vanished out from under us.
    #[must_use]
    pub fn is_body_removed(&self) -> bool {
        matches!(self, Self::BodyRemoved(_))
    }
}
