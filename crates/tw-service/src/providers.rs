//! Concrete provider wiring for the orchestrator.
//!
//! OSM extraction and real-time traffic/population fetch are external
//! collaborators this engine consumes but does not implement. These
//! providers always return `None`, so every run deterministically
//! exercises `tw_graph`'s `fallback_road_network`/`fallback_traffic`/
//! `fallback_population` rather than reaching out over the network.

use tw_core::{BBox, Coord};
use tw_graph::{NetworkData, PopulationData, PopulationProvider, RoadNetworkProvider, TrafficData, TrafficProvider};

#[derive(Default)]
pub struct FallbackOnlyProvider;

impl RoadNetworkProvider for FallbackOnlyProvider {
    fn fetch_road_network(&self, _center: Coord, _radius_km: f64) -> Option<NetworkData> {
        None
    }
}

impl TrafficProvider for FallbackOnlyProvider {
    fn fetch_traffic(&self, _bbox: BBox) -> Option<TrafficData> {
        None
    }
}

impl PopulationProvider for FallbackOnlyProvider {
    fn fetch_population(&self, _bbox: BBox) -> Option<PopulationData> {
        None
    }
}
