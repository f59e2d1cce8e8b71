//! `tw-core` — foundational types for the traffic microsimulation engine.
//!
//! This crate is a dependency of every other crate in the workspace. It
//! intentionally has no sibling-crate dependencies and minimal external ones
//! (only `rand`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                    |
//! |-------------|----------------------------------------------|
//! | [`ids`]     | `NodeId`, `EdgeId`                            |
//! | [`geo`]     | `Coord`, `BBox`, densify, bearing, distance   |
//! | [`config`]  | `SimConfig`                                   |
//! | [`time`]    | wall-clock formatting for progress logs       |
//! | [`rng`]     | `SimRng`, the run's single seedable RNG       |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                         |
//! |---------|-------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to public types.  |

pub mod config;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;

pub use config::SimConfig;
pub use geo::{BBox, Coord};
pub use ids::{EdgeId, NodeId};
pub use rng::SimRng;
