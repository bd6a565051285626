//! Error types for simulator operations.

use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while operating on the simulated backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Container not found.
    #[error("No such container: {0}")]
    ContainerNotFound(String),

    /// Image not found.
    #[error("No such image: {0}")]
    ImageNotFound(String),

    /// Operation is illegal for the resource's current lifecycle state.
    #[error("container {id}: {reason}")]
    InvalidState {
        /// Offending container id.
        id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Internal runtime failure (missing async runtime, dropped completion).
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl SimError {
    /// Creates a new invalid state error.
    #[must_use]
    pub fn invalid_state(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for either not-found variant.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ContainerNotFound(_) | Self::ImageNotFound(_))
    }
}
