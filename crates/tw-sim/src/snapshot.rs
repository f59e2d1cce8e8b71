//! Positional snapshots of active vehicles plus congested-edge overlays,
//! sized for cheap network transport.

use tw_core::geo::point_at_progress;
use tw_core::{Coord, EdgeId};
use tw_graph::RoadGraph;
use tw_mobility::Vehicle;

use crate::congestion::{edge_occupancy, utilization};

/// Default vehicles included per live snapshot, configurable via
/// `SimConfig::live_sample_size`.
pub const DEFAULT_LIVE_SAMPLE_SIZE: usize = 50;
/// Default cap on congestion segments per snapshot.
pub const DEFAULT_CONGESTION_SEGMENT_CAP: usize = 20;

/// Offset (as a progress fraction) used to compute a vehicle's heading by
/// sampling a second point slightly ahead along its polyline.
const BEARING_LOOKAHEAD_PROGRESS: f64 = 0.001;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CongestionSegmentLevel {
    High,
    Medium,
    Low,
}

impl CongestionSegmentLevel {
    /// Classify a utilization value into a display level, or `None` below
    /// the display threshold: high (>0.8), medium (>0.5), low (>0.3).
    fn from_utilization(u: f64) -> Option<Self> {
        if u > 0.8 {
            Some(Self::High)
        } else if u > 0.5 {
            Some(Self::Medium)
        } else if u > 0.3 {
            Some(Self::Low)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct CongestionSegment {
    pub coordinates: Vec<Coord>,
    pub level: CongestionSegmentLevel,
}

/// A single vehicle's interpolated position within a [`LiveSnapshot`].
#[derive(Clone, Debug)]
pub struct VehiclePosition {
    pub id: String,
    pub coordinate: Coord,
    pub speed: f64,
    /// Great-circle bearing, degrees, 0 = north, clockwise.
    pub bearing: f64,
    pub progress: f64,
    /// Remaining edges to traverse, current edge first.
    pub edge_trail: Vec<EdgeId>,
    /// The vehicle's full densified route polyline, for client-side
    /// smoothing between ticks.
    pub polyline: Vec<Coord>,
}

#[derive(Clone, Debug)]
pub struct LiveSnapshot {
    pub timestamp_s: u64,
    pub vehicles: Vec<VehiclePosition>,
    pub congestion_segments: Vec<CongestionSegment>,
    /// Uncapped active-vehicle count, distinct from `vehicles.len()` which
    /// is capped at the sample size.
    pub total_vehicles: usize,
    pub average_speed: f64,
}

/// Build a live snapshot of all currently-active vehicles.
///
/// The vehicle sample is taken in storage order (first `sample_size`
/// active vehicles) rather than shuffled — storage order never changes
/// once demand generation finishes, so the sample composition is stable
/// tick to tick, which is what keeps client-side animation smooth.
pub fn build_live_snapshot(
    graph: &RoadGraph,
    vehicles: &[Vehicle],
    t: u64,
    sample_size: usize,
    segment_cap: usize,
) -> LiveSnapshot {
    let active: Vec<&Vehicle> = vehicles.iter().filter(|v| v.is_active(t)).collect();
    let total_vehicles = active.len();

    let average_speed = if total_vehicles > 0 {
        let raw = active.iter().map(|v| v.speed).sum::<f64>() / total_vehicles as f64;
        (raw * 10.0).round() / 10.0
    } else {
        0.0
    };

    let sampled = active.into_iter().take(sample_size).map(build_position).collect();

    let occupancy = edge_occupancy(vehicles, t);
    let congestion_segments = build_congestion_segments(graph, &occupancy, segment_cap);

    LiveSnapshot { timestamp_s: t, vehicles: sampled, congestion_segments, total_vehicles, average_speed }
}

fn build_position(v: &Vehicle) -> VehiclePosition {
    let progress = v.progress();
    let coordinate = point_at_progress(&v.route_coordinates, progress);
    let lookahead = point_at_progress(&v.route_coordinates, (progress + BEARING_LOOKAHEAD_PROGRESS).min(1.0));
    let bearing = coordinate.bearing(lookahead);

    VehiclePosition {
        id: v.id.clone(),
        coordinate,
        speed: v.speed,
        bearing,
        progress,
        edge_trail: v.route.clone(),
        polyline: v.route_coordinates.clone(),
    }
}

fn build_congestion_segments(
    graph: &RoadGraph,
    occupancy: &std::collections::HashMap<EdgeId, u32>,
    cap: usize,
) -> Vec<CongestionSegment> {
    let mut segments = Vec::with_capacity(cap);
    for edge in graph.edges() {
        if segments.len() >= cap {
            break;
        }
        let n = occupancy.get(&edge.id).copied().unwrap_or(0);
        if let Some(level) = CongestionSegmentLevel::from_utilization(utilization(edge.capacity, n)) {
            segments.push(CongestionSegment { coordinates: edge.geometry.clone(), level });
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tw_graph::{Road, RoadGraphBuilder};

    fn one_edge_graph() -> RoadGraph {
        let mut b = RoadGraphBuilder::new();
        let mut tags = HashMap::new();
        tags.insert("highway".to_string(), "primary".to_string());
        b.add_road(Road {
            id: "r0".into(),
            node_ids: vec![0, 1],
            tags,
            geometry: vec![Coord::new(0.0, 0.0), Coord::new(0.0, 0.02)],
        });
        b.build().unwrap()
    }

    #[test]
    fn empty_vehicle_list_yields_zero_totals() {
        let g = one_edge_graph();
        let snap = build_live_snapshot(&g, &[], 0, DEFAULT_LIVE_SAMPLE_SIZE, DEFAULT_CONGESTION_SEGMENT_CAP);
        assert_eq!(snap.total_vehicles, 0);
        assert_eq!(snap.average_speed, 0.0);
        assert!(snap.vehicles.is_empty());
    }

    #[test]
    fn sample_is_capped_but_total_is_not() {
        let g = one_edge_graph();
        let edge = g.edge(EdgeId(0));
        let mut vehicles = Vec::new();
        for i in 0..5 {
            let mut v = Vehicle::build(format!("v{i}"), &g, vec![edge.id], 0, 20.0).unwrap();
            v.speed = 20.0;
            vehicles.push(v);
        }
        let snap = build_live_snapshot(&g, &vehicles, 0, 2, DEFAULT_CONGESTION_SEGMENT_CAP);
        assert_eq!(snap.total_vehicles, 5);
        assert_eq!(snap.vehicles.len(), 2);
    }

    #[test]
    fn high_occupancy_edge_is_reported_congested() {
        let g = one_edge_graph();
        // base_capacity for "primary" is 1200; 1 lane => capacity 1200.
        // capacity/3600 = 0.333, floored to 1.0 vehicle denominator, so we
        // need >0.8 vehicles per slot -> at least 1 occupant already clears
        // the high threshold only if capacity is small. Use many vehicles
        // to push utilization past 0.8 regardless of the floor.
        let edge_id = g.edge(EdgeId(0)).id;
        let vehicles: Vec<Vehicle> = (0..10)
            .map(|i| Vehicle::build(format!("v{i}"), &g, vec![edge_id], 0, 20.0).unwrap())
            .collect();
        let snap = build_live_snapshot(&g, &vehicles, 0, 50, 20);
        assert!(snap.congestion_segments.iter().any(|s| s.level == CongestionSegmentLevel::High));
    }
}
