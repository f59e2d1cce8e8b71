//! Data Providers: abstract interfaces to fetch road topology, real-time
//! traffic, and population statistics for a bounding box.
//!
//! Each provider is internally allowed to fail; failures never propagate —
//! they are caught and replaced with a deterministic fallback so the
//! orchestrator always has something to build a graph and demand from.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tw_core::{BBox, Coord, SimRng};

use crate::network::Road;

// ── Traffic ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CongestionLevel {
    Low,
    Medium,
    High,
    Severe,
}

impl CongestionLevel {
    /// Demand multiplier applied in §4.3's `traffic_multiplier` table.
    pub fn demand_multiplier(self) -> f64 {
        match self {
            CongestionLevel::Severe => 1.3,
            CongestionLevel::High => 1.2,
            CongestionLevel::Medium => 1.1,
            CongestionLevel::Low => 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Incident {
    pub description: String,
    pub coordinate: Coord,
    pub severity: u8,
}

#[derive(Clone, Debug)]
pub struct Flow {
    pub road_name: String,
    pub current_speed: f64,
    pub free_flow_speed: f64,
    pub confidence: f64,
    pub coordinates: Vec<Coord>,
}

#[derive(Clone, Debug)]
pub struct TrafficData {
    pub incidents: Vec<Incident>,
    pub flows: Vec<Flow>,
    pub average_delay_secs: f64,
    pub congestion_level: CongestionLevel,
}

// ── Population ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PopulationSource {
    Primary,
    RegionalFallback,
    Estimate,
}

#[derive(Clone, Debug)]
pub struct PopulationData {
    pub total: u64,
    pub density_per_km2: f64,
    pub estimated_vehicles: u64,
    /// Fraction of the population's vehicles active in the peak window.
    pub peak_hour_factor: f64,
    pub age_distribution: HashMap<String, f64>,
    pub working_population: u64,
    pub source: PopulationSource,
}

// ── Road network ──────────────────────────────────────────────────────────────

pub struct NetworkData {
    pub roads: Vec<Road>,
}

// ── Provider traits ───────────────────────────────────────────────────────────

pub trait RoadNetworkProvider {
    fn fetch_road_network(&self, center: Coord, radius_km: f64) -> Option<NetworkData>;

    /// Deterministic fallback, used when `fetch_road_network` returns `None`
    /// or the implementer's upstream call fails. Generates a small synthetic
    /// grid around `center` so the rest of the pipeline always has edges to
    /// work with.
    fn fallback_road_network(&self, center: Coord, radius_km: f64, rng: &mut SimRng) -> NetworkData {
        synthetic_grid(center, radius_km, rng)
    }
}

pub trait TrafficProvider {
    fn fetch_traffic(&self, bbox: BBox) -> Option<TrafficData>;

    fn fallback_traffic(&self, _bbox: BBox) -> TrafficData {
        TrafficData {
            incidents: Vec::new(),
            flows: Vec::new(),
            average_delay_secs: 0.0,
            congestion_level: CongestionLevel::Medium,
        }
    }
}

pub trait PopulationProvider {
    fn fetch_population(&self, bbox: BBox) -> Option<PopulationData>;

    fn fallback_population(&self, bbox: BBox) -> PopulationData {
        let area_km2 = bbox.area_km2().max(0.01);
        let density = 4000.0; // plausible dense-urban default, people/km^2
        let total = (density * area_km2).round() as u64;
        PopulationData {
            total,
            density_per_km2: density,
            estimated_vehicles: (total as f64 * 0.4).round() as u64,
            peak_hour_factor: 0.12,
            age_distribution: HashMap::new(),
            working_population: (total as f64 * 0.6).round() as u64,
            source: PopulationSource::Estimate,
        }
    }
}

/// Build a small synthetic road grid centered on `center`, used both as the
/// road-network fallback and by tests that don't want to stand up a real
/// provider.
fn synthetic_grid(center: Coord, radius_km: f64, _rng: &mut SimRng) -> NetworkData {
    let step_deg = (radius_km / 111.0).max(0.002);
    let n = 4i64;
    let mut roads = Vec::new();
    let node_id = |x: i64, y: i64| (x + n) * 100 + (y + n);
    let tags_for = |highway: &str| {
        let mut t = HashMap::new();
        t.insert("highway".to_string(), highway.to_string());
        t
    };

    let coord_at = |x: i64, y: i64| Coord::new(center.lng + x as f64 * step_deg, center.lat + y as f64 * step_deg);

    for x in -n..=n {
        for y in -n..n {
            let a = coord_at(x, y);
            let b = coord_at(x, y + 1);
            roads.push(Road {
                id: format!("grid-v-{x}-{y}"),
                node_ids: vec![node_id(x, y), node_id(x, y + 1)],
                tags: tags_for(if x == 0 { "primary" } else { "residential" }),
                geometry: vec![a, b],
            });
        }
    }
    for y in -n..=n {
        for x in -n..n {
            let a = coord_at(x, y);
            let b = coord_at(x + 1, y);
            roads.push(Road {
                id: format!("grid-h-{x}-{y}"),
                node_ids: vec![node_id(x, y), node_id(x + 1, y)],
                tags: tags_for(if y == 0 { "secondary" } else { "residential" }),
                geometry: vec![a, b],
            });
        }
    }

    NetworkData { roads }
}

// ── Road-network cache ────────────────────────────────────────────────────────

/// Process-wide cache keyed by `(lat, lng, radius_km)` rounded to 4 decimal
/// places. The only process-wide state the core depends on; lifetime is
/// explicit (`new`/`lookup`/`set`/`clear`), no implicit ambient mutation.
pub struct RoadCache {
    ttl: Duration,
    entries: HashMap<(i64, i64, i64), (Instant, std::sync::Arc<NetworkData>)>,
}

impl RoadCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    fn key(center: Coord, radius_km: f64) -> (i64, i64, i64) {
        let round4 = |v: f64| (v * 10_000.0).round() as i64;
        (round4(center.lat), round4(center.lng), round4(radius_km))
    }

    pub fn lookup(&self, center: Coord, radius_km: f64) -> Option<std::sync::Arc<NetworkData>> {
        let key = Self::key(center, radius_km);
        self.entries.get(&key).and_then(|(inserted, data)| {
            if inserted.elapsed() < self.ttl {
                Some(std::sync::Arc::clone(data))
            } else {
                None
            }
        })
    }

    pub fn set(&mut self, center: Coord, radius_km: f64, data: NetworkData) -> std::sync::Arc<NetworkData> {
        let key = Self::key(center, radius_km);
        let arc = std::sync::Arc::new(data);
        self.entries.insert(key, (Instant::now(), std::sync::Arc::clone(&arc)));
        arc
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFailsProvider;
    impl RoadNetworkProvider for AlwaysFailsProvider {
        fn fetch_road_network(&self, _center: Coord, _radius_km: f64) -> Option<NetworkData> {
            None
        }
    }

    #[test]
    fn fallback_network_has_edges() {
        let provider = AlwaysFailsProvider;
        let mut rng = SimRng::new(1);
        let center = Coord::new(139.69, 35.68);
        let data = provider.fallback_road_network(center, 2.0, &mut rng);
        assert!(!data.roads.is_empty());
    }

    #[test]
    fn cache_roundtrip_and_ttl_expiry() {
        let mut cache = RoadCache::new(Duration::from_millis(20));
        let center = Coord::new(1.0, 2.0);
        assert!(cache.lookup(center, 3.0).is_none());
        cache.set(center, 3.0, NetworkData { roads: Vec::new() });
        assert!(cache.lookup(center, 3.0).is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.lookup(center, 3.0).is_none());
    }

    #[test]
    fn demand_multiplier_table() {
        assert_eq!(CongestionLevel::Severe.demand_multiplier(), 1.3);
        assert_eq!(CongestionLevel::Low.demand_multiplier(), 1.0);
    }
}
