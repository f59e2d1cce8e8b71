//! Wire types for the HTTP/SSE service boundary. Kept distinct from the
//! in-process `FinalMetrics`/`Marker` types so a wire-format change (e.g.
//! the string-formatted metrics fields below) never forces a change to
//! the simulation core's own types.

use serde::{Deserialize, Serialize};

use tw_core::Coord;
use tw_graph::PopulationSource;
use tw_mobility::MarkerKind;
use tw_sim::{CongestionSegment, CongestionSegmentLevel, LiveSnapshot, VehiclePosition};

use crate::metrics::FinalMetrics;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerTypeDto {
    Construction,
    Facility,
}

impl From<MarkerTypeDto> for MarkerKind {
    fn from(value: MarkerTypeDto) -> Self {
        match value {
            MarkerTypeDto::Construction => MarkerKind::Construction,
            MarkerTypeDto::Facility => MarkerKind::Facility,
        }
    }
}

impl From<MarkerKind> for MarkerTypeDto {
    fn from(value: MarkerKind) -> Self {
        match value {
            MarkerKind::Construction => MarkerTypeDto::Construction,
            MarkerKind::Facility => MarkerTypeDto::Facility,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct CoordDto {
    pub lng: f64,
    pub lat: f64,
}

impl From<CoordDto> for Coord {
    fn from(value: CoordDto) -> Self {
        Coord::new(value.lng, value.lat)
    }
}

impl From<Coord> for CoordDto {
    fn from(value: Coord) -> Self {
        CoordDto { lng: value.lng, lat: value.lat }
    }
}

/// `POST /markers` request body.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateMarkerRequest {
    #[serde(rename = "type")]
    pub kind: MarkerTypeDto,
    pub coordinates: CoordDto,
}

/// A marker as returned by `GET /markers`/`POST /markers`, carrying the
/// server-assigned id and creation timestamp.
#[derive(Clone, Debug, Serialize)]
pub struct StoredMarkerDto {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MarkerTypeDto,
    pub coordinates: CoordDto,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageDto {
    pub message: String,
}

/// `POST /simulate` and the streaming endpoints' query/body: duration in
/// minutes (default 60), radius in km (default 3).
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct SimulateRequest {
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub radius: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VehicleSummaryDto {
    pub id: String,
    pub speed: f64,
    pub progress: f64,
    pub distance_traveled_m: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConstructionImpactDto {
    pub edge_id: u32,
    pub original_speed: f64,
    pub reduced_speed: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PopulationSummaryDto {
    pub total: u64,
    pub density_per_km2: f64,
    pub estimated_vehicles: u64,
    pub peak_hour_factor: f64,
    pub working_population: u64,
    pub source: &'static str,
}

impl From<PopulationSource> for &'static str {
    fn from(value: PopulationSource) -> Self {
        match value {
            PopulationSource::Primary => "primary",
            PopulationSource::RegionalFallback => "regional_fallback",
            PopulationSource::Estimate => "estimate",
        }
    }
}

/// The HTTP-facing `final_metrics` shape. `driving_distance_km`,
/// `congestion_length`, and `co2_emissions` are deliberately `String`, not
/// `f64` — formatted as `"N km"`/`"N.N km"`/`"N kg"` on the wire, even
/// though the in-process [`FinalMetrics`] keeps them numeric.
#[derive(Clone, Debug, Serialize)]
pub struct FinalMetricsDto {
    pub driving_distance_km: String,
    pub congestion_length: String,
    pub co2_emissions: String,
    pub roads_count: usize,
    pub nodes_count: usize,
    pub incidents_count: usize,
    pub affected_edges: usize,
    pub vehicle_sample: Vec<VehicleSummaryDto>,
    pub construction_impacts: Vec<ConstructionImpactDto>,
    pub population_summary: PopulationSummaryDto,
}

impl From<&FinalMetrics> for FinalMetricsDto {
    fn from(m: &FinalMetrics) -> Self {
        FinalMetricsDto {
            driving_distance_km: format!("{} km", m.driving_distance_km.round() as i64),
            congestion_length: format!("{:.1} km", m.congestion_length_km),
            co2_emissions: format!("{} kg", m.co2_emissions_kg.round() as i64),
            roads_count: m.roads_count,
            nodes_count: m.nodes_count,
            incidents_count: m.incidents_count,
            affected_edges: m.affected_edges,
            vehicle_sample: m
                .vehicle_sample
                .iter()
                .map(|v| VehicleSummaryDto {
                    id: v.id.clone(),
                    speed: v.speed,
                    progress: v.progress,
                    distance_traveled_m: v.distance_traveled_m,
                })
                .collect(),
            construction_impacts: m
                .construction_impacts
                .iter()
                .map(|c| ConstructionImpactDto {
                    edge_id: c.edge_id.0,
                    original_speed: c.original_speed,
                    reduced_speed: c.reduced_speed,
                })
                .collect(),
            population_summary: PopulationSummaryDto {
                total: m.population_summary.total,
                density_per_km2: m.population_summary.density_per_km2,
                estimated_vehicles: m.population_summary.estimated_vehicles,
                peak_hour_factor: m.population_summary.peak_hour_factor,
                working_population: m.population_summary.working_population,
                source: m.population_summary.source.into(),
            },
        }
    }
}

/// `POST /simulate` response: `{ metrics, ai_summary, risk_assessment,
/// recommendations }`.
#[derive(Clone, Debug, Serialize)]
pub struct SimulateResponse {
    pub metrics: FinalMetricsDto,
    pub ai_summary: String,
    pub risk_assessment: String,
    pub recommendations: Vec<String>,
}

/// A sampled vehicle's position within a `live_data` frame.
#[derive(Clone, Debug, Serialize)]
pub struct VehiclePositionDto {
    pub id: String,
    pub coordinates: CoordDto,
    pub speed: f64,
    pub bearing: f64,
    pub progress: f64,
    pub edge_trail: Vec<u32>,
    pub polyline: Vec<CoordDto>,
}

impl From<&VehiclePosition> for VehiclePositionDto {
    fn from(v: &VehiclePosition) -> Self {
        VehiclePositionDto {
            id: v.id.clone(),
            coordinates: v.coordinate.into(),
            speed: v.speed,
            bearing: v.bearing,
            progress: v.progress,
            edge_trail: v.edge_trail.iter().map(|e| e.0).collect(),
            polyline: v.polyline.iter().map(|&c| c.into()).collect(),
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionSegmentLevelDto {
    High,
    Medium,
    Low,
}

impl From<CongestionSegmentLevel> for CongestionSegmentLevelDto {
    fn from(level: CongestionSegmentLevel) -> Self {
        match level {
            CongestionSegmentLevel::High => Self::High,
            CongestionSegmentLevel::Medium => Self::Medium,
            CongestionSegmentLevel::Low => Self::Low,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CongestionSegmentDto {
    pub coordinates: Vec<CoordDto>,
    pub level: CongestionSegmentLevelDto,
}

impl From<&CongestionSegment> for CongestionSegmentDto {
    fn from(s: &CongestionSegment) -> Self {
        CongestionSegmentDto { coordinates: s.coordinates.iter().map(|&c| c.into()).collect(), level: s.level.into() }
    }
}

/// `live_data` SSE frame payload.
#[derive(Clone, Debug, Serialize)]
pub struct LiveSnapshotDto {
    pub timestamp: u64,
    pub vehicles: Vec<VehiclePositionDto>,
    pub congestion_segments: Vec<CongestionSegmentDto>,
    pub total_vehicles: usize,
    pub average_speed: f64,
}

impl From<&LiveSnapshot> for LiveSnapshotDto {
    fn from(s: &LiveSnapshot) -> Self {
        LiveSnapshotDto {
            timestamp: s.timestamp_s,
            vehicles: s.vehicles.iter().map(VehiclePositionDto::from).collect(),
            congestion_segments: s.congestion_segments.iter().map(CongestionSegmentDto::from).collect(),
            total_vehicles: s.total_vehicles,
            average_speed: s.average_speed,
        }
    }
}
