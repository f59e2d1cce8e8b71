//! `tw-graph` — road graph, route builder, and pluggable data providers.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                        |
//! |---------------|------------------------------------------------------------------|
//! | [`network`]   | `Road`, `Edge`, `RoadGraph`, `RoadGraphBuilder`                   |
//! | [`router`]    | `RouteBuilder` — stochastic length-targeted routing              |
//! | [`providers`] | Provider traits, `NetworkData`/`TrafficData`/`PopulationData`, `RoadCache` |
//! | [`error`]     | `GraphError`, `GraphResult<T>`                                    |

pub mod error;
pub mod network;
pub mod providers;
pub mod router;

pub use error::{GraphError, GraphResult};
pub use network::{Edge, Road, RoadGraph, RoadGraphBuilder};
pub use providers::{
    CongestionLevel, Flow, Incident, NetworkData, PopulationData, PopulationProvider,
    PopulationSource, RoadCache, RoadNetworkProvider, TrafficData, TrafficProvider,
};
pub use router::RouteBuilder;
