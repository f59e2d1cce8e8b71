//! Microsimulation error type.

use thiserror::Error;

/// Fatal conditions the simulation core can report upward.
#[derive(Debug, Error)]
pub enum SimError {
    /// Surfaced when the road graph has no edges to simulate over; the
    /// orchestrator falls back to the closed-form estimator.
    #[error("road graph has no edges to simulate over")]
    GraphEmpty,

    /// Cancellation or an internal panic cut the run short.
    #[error("simulation aborted: {reason}")]
    Aborted { reason: String },
}

pub type SimResult<T> = Result<T, SimError>;
