//! Mobility-layer error type.

use thiserror::Error;

/// Errors surfaced at the marker/demand boundary.
///
/// Demand generation and marker application never propagate per-vehicle
/// failures internally — malformed vehicles are skipped at demand time.
/// This type exists for the one place a caller-supplied value can be
/// rejected outright: a malformed [`crate::Marker`] crossing the service
/// boundary.
#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("invalid marker: {reason}")]
    InvalidMarker { reason: String },
}

pub type MobilityResult<T> = Result<T, MobilityError>;
