//! `tw-mobility` — vehicle demand generation, marker impact, and the
//! vehicle state model for the traffic microsimulation engine.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                         |
//! |------------|--------------------------------------------------------------------|
//! | [`vehicle`]| `Vehicle`, `VehicleState` — per-vehicle state                      |
//! | [`demand`] | `generate_demand` — population-proportional demand                 |
//! | [`marker`] | `Marker`, construction + facility impact passes                    |
//! | [`error`]  | `MobilityError`, `MobilityResult<T>`                                |

pub mod demand;
pub mod error;
pub mod marker;
pub mod vehicle;

pub use demand::generate_demand;
pub use error::{MobilityError, MobilityResult};
pub use marker::{
    apply_construction_markers, apply_facility_markers, ConstructionImpact, ConstructionReport, Marker, MarkerKind,
};
pub use vehicle::{Vehicle, VehicleState};
