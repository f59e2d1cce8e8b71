//! Orchestrator: wires the data providers, road graph, marker impacts,
//! demand generation, and the microsimulation loop into the single `run`
//! entry point the HTTP layer calls. Owns the process's one seedable RNG
//! and the `SimConfig` defaults the CLI supplies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use tw_core::{BBox, Coord, SimConfig, SimRng};
use tw_graph::{
    NetworkData, PopulationData, PopulationProvider, RoadCache, RoadGraphBuilder, RoadNetworkProvider, RouteBuilder,
    TrafficData, TrafficProvider,
};
use tw_mobility::{apply_construction_markers, apply_facility_markers, generate_demand, Marker, MarkerKind};
use tw_sim::{build_live_snapshot, LiveSnapshot, StreamHub, TickObserver};

use crate::metrics::FinalMetrics;

/// Live snapshot congestion-segment cap used by every run; the
/// orchestrator doesn't expose a per-request override.
const CONGESTION_SEGMENT_CAP: usize = 20;
/// Bounding box margin applied around a run's markers before the provider
/// fetch.
const BBOX_MARGIN_DEG: f64 = 0.01;

pub struct Orchestrator {
    config: SimConfig,
    road_provider: Arc<dyn RoadNetworkProvider + Send + Sync>,
    traffic_provider: Arc<dyn TrafficProvider + Send + Sync>,
    population_provider: Arc<dyn PopulationProvider + Send + Sync>,
    road_cache: Mutex<RoadCache>,
    rng: Mutex<SimRng>,
    run_counter: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        config: SimConfig,
        road_provider: Arc<dyn RoadNetworkProvider + Send + Sync>,
        traffic_provider: Arc<dyn TrafficProvider + Send + Sync>,
        population_provider: Arc<dyn PopulationProvider + Send + Sync>,
    ) -> Self {
        let road_cache = Mutex::new(RoadCache::new(std::time::Duration::from_secs(config.road_cache_ttl_secs)));
        let rng = Mutex::new(SimRng::new(config.seed));
        Self { config, road_provider, traffic_provider, population_provider, road_cache, rng, run_counter: AtomicU64::new(0) }
    }

    /// Derive this run's own RNG sub-stream. Every run still traces back to
    /// the one configured seed, but draws independently of whatever other
    /// runs are in flight once derived.
    fn child_rng(&self) -> SimRng {
        let offset = self.run_counter.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        guard.child(offset)
    }

    /// `POST /simulate`: always returns a usable [`FinalMetrics`], falling
    /// back to the closed-form estimator on any pipeline failure. The
    /// caller is responsible for the `empty_input` 400 case before calling
    /// this — that's a client error, not a fallback.
    pub fn run_sync(&self, markers: &[Marker], duration_minutes: u32, radius_km: f64) -> FinalMetrics {
        let mut rng = self.child_rng();
        match self.execute(markers, duration_minutes, radius_km, &mut rng, None) {
            Ok(metrics) => metrics,
            Err(reason) => {
                warn!(reason, "simulation pipeline failed, falling back to closed-form estimate");
                self.fallback(markers, &mut rng)
            }
        }
    }

    /// `GET /simulate/stream` / `GET /simulate/live`: runs the same
    /// pipeline, pushing `status`/`live_data` events through `hub` as it
    /// goes, and consuming `hub` to deliver exactly one terminal `complete`
    /// event. Synchronous end to end — meant to be called from inside
    /// `spawn_blocking`.
    pub fn run_streaming(&self, markers: Vec<Marker>, duration_minutes: u32, radius_km: f64, hub: StreamHub<FinalMetrics>) {
        let mut rng = self.child_rng();
        hub.status("fetching road network, traffic, and population data");
        match self.execute(&markers, duration_minutes, radius_km, &mut rng, Some(&hub)) {
            Ok(metrics) => hub.complete(metrics),
            Err(reason) => {
                warn!(reason, "simulation pipeline failed, falling back to closed-form estimate");
                let metrics = self.fallback(&markers, &mut rng);
                hub.complete(metrics);
            }
        }
    }

    /// Builds the graph, applies marker impacts, generates demand, and
    /// runs the microsimulation. Returns `Err` only for `graph_empty` —
    /// provider failures are already absorbed by each provider's own
    /// fallback and never reach here as an error.
    fn execute(
        &self,
        markers: &[Marker],
        duration_minutes: u32,
        radius_km: f64,
        rng: &mut SimRng,
        hub: Option<&StreamHub<FinalMetrics>>,
    ) -> Result<FinalMetrics, &'static str> {
        let bbox = expanded_bbox(markers);
        let center = mean_center(markers);

        let (network, traffic, population) = self.fetch_providers(center, bbox, radius_km, rng);
        info!(
            roads = network.roads.len(),
            incidents = traffic.incidents.len(),
            population = population.total,
            "providers resolved"
        );

        let mut builder = RoadGraphBuilder::with_capacity(network.roads.len());
        for road in network.roads.iter() {
            builder.add_road(road.clone());
        }
        let mut graph = builder.build().map_err(|_| "road graph has no edges after ingestion")?;

        let construction = apply_construction_markers(&mut graph, markers, rng);
        if let Some(hub) = hub {
            hub.status(format!("{} edge(s) affected by construction markers", construction.affected_edges.len()));
        }

        let mut routes = RouteBuilder::new(&graph);
        let mut vehicles = generate_demand(&graph, &mut routes, &population, traffic.congestion_level, &self.config, rng);
        let facility_vehicles = apply_facility_markers(&graph, &mut routes, markers, &population, rng);
        vehicles.extend(facility_vehicles);

        if let Some(hub) = hub {
            hub.status(format!("simulating {} vehicle(s) over {} minute(s)", vehicles.len(), duration_minutes));
        }

        let observer = HubObserver { hub, config: &self.config };
        let outcome = tw_sim::run(&graph, vehicles, &traffic, duration_minutes as u64, self.config.live_tick_seconds, observer);

        let incidents_count = traffic.incidents.len();
        let affected_edges = construction.affected_edges.len();
        let roads_count = graph.edge_count();
        let nodes_count = graph.node_count();

        Ok(FinalMetrics::from_run(
            outcome.driving_distance_km,
            outcome.congestion_length_km,
            outcome.co2_emissions_kg,
            roads_count,
            nodes_count,
            incidents_count,
            affected_edges,
            &outcome.vehicles,
            construction.construction_log,
            population,
            rng,
        ))
    }

    /// The deterministic closed-form estimate, used whenever the real
    /// pipeline fails.
    fn fallback(&self, markers: &[Marker], rng: &mut SimRng) -> FinalMetrics {
        let construction = markers.iter().filter(|m| m.kind == MarkerKind::Construction).count();
        let facility = markers.iter().filter(|m| m.kind == MarkerKind::Facility).count();
        FinalMetrics::fallback_estimate(construction, facility, rng)
    }

    /// Fetch road network, traffic, and population concurrently, each
    /// falling back to its own deterministic estimate on a cache miss plus
    /// an absent/failed upstream fetch. Road-network results are cached by
    /// `(lat, lng, radius)`.
    fn fetch_providers(&self, center: Coord, bbox: BBox, radius_km: f64, rng: &mut SimRng) -> (Arc<NetworkData>, TrafficData, PopulationData) {
        let road_fallback_seed: u64 = rng.random();

        std::thread::scope(|scope| {
            let road_handle = scope.spawn(|| self.fetch_road_network(center, radius_km, road_fallback_seed));
            let traffic_handle =
                scope.spawn(|| self.traffic_provider.fetch_traffic(bbox).unwrap_or_else(|| self.traffic_provider.fallback_traffic(bbox)));
            let population_handle = scope.spawn(|| {
                self.population_provider.fetch_population(bbox).unwrap_or_else(|| self.population_provider.fallback_population(bbox))
            });

            let network = road_handle.join().unwrap_or_else(|_| Arc::new(NetworkData { roads: Vec::new() }));
            let traffic = traffic_handle.join().unwrap_or_else(|_| self.traffic_provider.fallback_traffic(bbox));
            let population = population_handle.join().unwrap_or_else(|_| self.population_provider.fallback_population(bbox));
            (network, traffic, population)
        })
    }

    fn fetch_road_network(&self, center: Coord, radius_km: f64, fallback_seed: u64) -> Arc<NetworkData> {
        if let Some(cached) = self.road_cache.lock().unwrap_or_else(|e| e.into_inner()).lookup(center, radius_km) {
            return cached;
        }
        let data = match self.road_provider.fetch_road_network(center, radius_km) {
            Some(data) => data,
            None => {
                let mut fallback_rng = SimRng::new(fallback_seed);
                self.road_provider.fallback_road_network(center, radius_km, &mut fallback_rng)
            }
        };
        self.road_cache.lock().unwrap_or_else(|e| e.into_inner()).set(center, radius_km, data)
    }
}

/// Bbox over the markers, expanded by a fixed margin. Panics if `markers`
/// is empty — callers must reject that case at the HTTP
/// boundary before reaching the orchestrator.
fn expanded_bbox(markers: &[Marker]) -> BBox {
    let raw = BBox::from_points(markers.iter().map(|m| m.coordinate)).expect("at least one marker is required");
    BBox {
        min: Coord::new(raw.min.lng - BBOX_MARGIN_DEG, raw.min.lat - BBOX_MARGIN_DEG),
        max: Coord::new(raw.max.lng + BBOX_MARGIN_DEG, raw.max.lat + BBOX_MARGIN_DEG),
    }
}

/// Arithmetic mean of the markers' coordinates (spec.md §4.9 step 2: "center
/// as mean lat/lng"), distinct from the expanded bbox's own midpoint — the
/// two coincide only when the markers are symmetric around their bbox.
/// Panics if `markers` is empty, for the same reason `expanded_bbox` does.
fn mean_center(markers: &[Marker]) -> Coord {
    assert!(!markers.is_empty(), "at least one marker is required");
    let n = markers.len() as f64;
    let lng_sum: f64 = markers.iter().map(|m| m.coordinate.lng).sum();
    let lat_sum: f64 = markers.iter().map(|m| m.coordinate.lat).sum();
    Coord::new(lng_sum / n, lat_sum / n)
}

/// Bridges the microsimulation's [`TickObserver`] hook to the streaming
/// layer's [`StreamHub`], translating live ticks into snapshots and
/// progress ticks into status lines. `hub` is `None` for the synchronous
/// `/simulate` path, in which case every callback is a no-op.
struct HubObserver<'a> {
    hub: Option<&'a StreamHub<FinalMetrics>>,
    config: &'a SimConfig,
}

impl<'a> TickObserver for HubObserver<'a> {
    fn on_live_tick(&mut self, graph: &tw_graph::RoadGraph, vehicles: &[tw_mobility::Vehicle], t: u64) {
        if let Some(hub) = self.hub {
            let snapshot: LiveSnapshot = build_live_snapshot(graph, vehicles, t, self.config.live_sample_size, CONGESTION_SEGMENT_CAP);
            hub.publish_live(snapshot);
        }
    }

    fn on_progress(&mut self, t: u64, active: usize) {
        if let Some(hub) = self.hub {
            hub.status(format!("t={} active_vehicles={active}", tw_core::time::format_duration(t)));
        }
    }

    fn should_stop(&self) -> bool {
        self.hub.map(|h| h.is_cancelled()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(kind: MarkerKind, lng: f64, lat: f64) -> Marker {
        Marker { kind, coordinate: Coord::new(lng, lat) }
    }

    #[test]
    fn mean_center_is_the_arithmetic_mean_not_the_bbox_midpoint() {
        // Three asymmetric markers: the bbox midpoint and the mean diverge
        // once a point sits off-center within the bbox.
        let markers = vec![
            marker(MarkerKind::Construction, 0.0, 0.0),
            marker(MarkerKind::Facility, 0.0, 0.0),
            marker(MarkerKind::Facility, 10.0, 10.0),
        ];

        let mean = mean_center(&markers);
        let bbox_mid = BBox::from_points(markers.iter().map(|m| m.coordinate)).unwrap().center();

        assert!((mean.lng - 10.0 / 3.0).abs() < 1e-9);
        assert!((mean.lat - 10.0 / 3.0).abs() < 1e-9);
        assert!((mean.lng - bbox_mid.lng).abs() > 1.0, "mean and bbox midpoint should diverge here");
    }

    #[test]
    fn mean_center_matches_bbox_center_for_two_symmetric_markers() {
        let markers =
            vec![marker(MarkerKind::Construction, 139.6917, 35.6895), marker(MarkerKind::Facility, 139.7017, 35.6995)];

        let mean = mean_center(&markers);
        let bbox_mid = BBox::from_points(markers.iter().map(|m| m.coordinate)).unwrap().center();

        assert!((mean.lng - bbox_mid.lng).abs() < 1e-9);
        assert!((mean.lat - bbox_mid.lat).abs() < 1e-9);
    }
}
