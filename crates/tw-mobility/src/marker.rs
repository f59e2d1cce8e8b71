//! Marker Impact Applier: mutates edge attributes near construction markers
//! and injects facility-proximate trips.
//!
//! Split into two passes rather than one combined function: construction
//! needs `&mut RoadGraph`, while facility trips need a [`RouteBuilder`],
//! which borrows the graph immutably for its whole lifetime. The
//! orchestrator runs construction to completion, drops that borrow, then
//! builds the (loop-local) `RouteBuilder` it also uses for demand
//! generation and calls the facility pass through it.

use std::collections::HashSet;

use tw_core::{Coord, EdgeId, SimRng};
use tw_graph::{PopulationData, RoadGraph, RouteBuilder};

use crate::vehicle::Vehicle;

/// Radius within which a construction marker affects an edge's start point.
const CONSTRUCTION_RADIUS_M: f64 = 500.0;
/// Probability of the construction marker's severe override (speed=5,
/// capacity=10) instead of the standard 0.4x/0.6x reduction.
const CONSTRUCTION_SEVERE_PROB: f64 = 0.05;

/// Radius within which a facility marker pulls in nearby edges as trip
/// origins.
const FACILITY_RADIUS_M: f64 = 200.0;
/// Minimum distant-edge separation for facility-trip destinations.
const FACILITY_DEST_MIN_DIST_M: f64 = 1000.0;
/// Upper bound of the uniform departure-time window for facility trips.
const FACILITY_DEPART_WINDOW_SECS: f64 = 3600.0;
/// Hard per-facility cap on additional vehicles.
const FACILITY_VEHICLE_CAP: u64 = 100;

/// Rough metres-per-degree-of-latitude conversion, used only to turn a
/// radius in metres into the degree threshold `Coord::within_bbox` needs
/// for a cheap pre-filter ahead of the exact `distance_m` check below.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Degree threshold for `within_bbox` that is never tighter than `radius_m`
/// actually requires: longitude degrees shrink toward the poles (by
/// `cos(lat)`), so the threshold is widened by the same factor to stay a
/// safe over-approximation at any latitude in range.
fn half_deg_for(radius_m: f64, at_lat_deg: f64) -> f64 {
    let lat_margin = radius_m / METERS_PER_DEGREE;
    let lng_margin = lat_margin / at_lat_deg.to_radians().cos().abs().max(0.1);
    lat_margin.max(lng_margin)
}

/// Kind of a user-placed marker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    Construction,
    Facility,
}

/// A user-placed point marker. Never stored by the core — supplied fresh
/// by the orchestrator on each run.
#[derive(Copy, Clone, Debug)]
pub struct Marker {
    pub kind: MarkerKind,
    pub coordinate: Coord,
}

/// Append-only construction-impact log entry.
#[derive(Clone, Debug)]
pub struct ConstructionImpact {
    pub edge_id: EdgeId,
    pub original_speed: f64,
    pub reduced_speed: f64,
}

/// Result of the construction pass: the affected-edge set (also the seam
/// the facility pass and the microsimulation's congestion accounting read)
/// plus the append-only impact log.
#[derive(Default)]
pub struct ConstructionReport {
    pub affected_edges: HashSet<EdgeId>,
    pub construction_log: Vec<ConstructionImpact>,
}

/// Apply every construction marker's effect to `graph` in place.
pub fn apply_construction_markers(graph: &mut RoadGraph, markers: &[Marker], rng: &mut SimRng) -> ConstructionReport {
    let mut report = ConstructionReport::default();
    for marker in markers.iter().filter(|m| m.kind == MarkerKind::Construction) {
        apply_construction(graph, marker.coordinate, rng, &mut report);
    }
    report
}

fn apply_construction(graph: &mut RoadGraph, marker_coord: Coord, rng: &mut SimRng, report: &mut ConstructionReport) {
    let half_deg = half_deg_for(CONSTRUCTION_RADIUS_M, marker_coord.lat);
    let nearby: Vec<EdgeId> = graph
        .edges()
        .iter()
        .filter(|e| e.start().within_bbox(marker_coord, half_deg))
        .filter(|e| e.start().distance_m(marker_coord) <= CONSTRUCTION_RADIUS_M)
        .map(|e| e.id)
        .collect();

    for edge_id in nearby {
        if report.affected_edges.contains(&edge_id) {
            continue;
        }

        let edge = graph.edge_mut(edge_id);
        let original_speed = edge.speed;

        let (new_speed, new_capacity) = if rng.gen_bool(CONSTRUCTION_SEVERE_PROB) {
            (5.0, 10)
        } else {
            ((edge.speed * 0.4).max(5.0), ((edge.capacity as f64 * 0.6) as u32).max(50))
        };

        edge.speed = new_speed;
        edge.capacity = new_capacity;

        report.construction_log.push(ConstructionImpact {
            edge_id,
            original_speed,
            reduced_speed: new_speed,
        });
        report.affected_edges.insert(edge_id);
    }
}

/// Build the extra facility-proximate trips for every facility marker.
///
/// Facility markers are deduplicated by coordinate rounded to 6 decimal
/// places before processing, so two markers placed at (near) the same
/// point only spawn one facility's worth of vehicles. Must run
/// after the construction pass, against the graph's final (post-mutation)
/// speeds, since `routes` and the facility vehicles' initial speeds both
/// read current edge state.
pub fn apply_facility_markers(
    graph: &RoadGraph,
    routes: &mut RouteBuilder,
    markers: &[Marker],
    population: &PopulationData,
    rng: &mut SimRng,
) -> Vec<Vehicle> {
    let mut extra_vehicles = Vec::new();
    let mut seen_coords: HashSet<(i64, i64)> = HashSet::new();
    let mut facility_trip_counter: u64 = 0;

    for marker in markers.iter().filter(|m| m.kind == MarkerKind::Facility) {
        if !seen_coords.insert(round6(marker.coordinate)) {
            continue;
        }
        apply_facility(
            graph,
            routes,
            marker.coordinate,
            population,
            rng,
            &mut facility_trip_counter,
            &mut extra_vehicles,
        );
    }

    extra_vehicles
}

fn round6(c: Coord) -> (i64, i64) {
    let r = |v: f64| (v * 1_000_000.0).round() as i64;
    (r(c.lng), r(c.lat))
}

#[allow(clippy::too_many_arguments)]
fn apply_facility(
    graph: &RoadGraph,
    routes: &mut RouteBuilder,
    marker_coord: Coord,
    population: &PopulationData,
    rng: &mut SimRng,
    facility_trip_counter: &mut u64,
    extra_vehicles: &mut Vec<Vehicle>,
) {
    let half_deg = half_deg_for(FACILITY_RADIUS_M, marker_coord.lat);
    let nearby: Vec<EdgeId> = graph
        .edges()
        .iter()
        .filter(|e| e.start().within_bbox(marker_coord, half_deg))
        .filter(|e| e.start().distance_m(marker_coord) <= FACILITY_RADIUS_M)
        .map(|e| e.id)
        .collect();
    if nearby.is_empty() {
        return;
    }

    let extra_count = ((population.density_per_km2 * 4.0 * 0.05).round() as u64).min(FACILITY_VEHICLE_CAP);

    for _ in 0..extra_count {
        let origin = *rng.choose(&nearby).unwrap();
        let dest = routes.pick_distant_edge(rng, origin, FACILITY_DEST_MIN_DIST_M);
        let route = if dest != origin { routes.build_route(rng, origin, dest) } else { vec![origin] };

        let depart_time_s = rng.gen_range(0.0..FACILITY_DEPART_WINDOW_SECS).round() as u64;
        let origin_edge = graph.edge(origin);
        let initial_speed = (origin_edge.speed * 0.6).max(10.0);

        let id = format!("facility_trip_{facility_trip_counter}");
        *facility_trip_counter += 1;

        if let Some(v) = Vehicle::build(id, graph, route, depart_time_s, initial_speed) {
            extra_vehicles.push(v);
        }
    }
}
