//! Vehicle state and the shared constructor used by both the demand
//! generator and the marker impact applier's facility trips.

use tw_core::geo::densify;
use tw_core::{Coord, EdgeId};
use tw_graph::RoadGraph;

/// Minimum route length, in metres, below which a candidate vehicle is
/// discarded entirely rather than created.
const MIN_ROUTE_LENGTH_M: f64 = 200.0;

/// Densification step used when building a vehicle's route polyline.
const ROUTE_POLYLINE_STEP_M: f64 = 5.0;

/// A vehicle's lifecycle phase, derived from `depart_time_s`/`arrival_time_s`
/// rather than stored — there is exactly one source of truth for each
/// transition and no way for the two to disagree: `SCHEDULED -> ACTIVE ->
/// ARRIVED`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VehicleState {
    Scheduled,
    Active,
    Arrived,
}

/// A single simulated vehicle.
///
/// `route` holds the *remaining* edges to traverse, front-to-back —
/// `route[0]` is always the current edge. It shrinks as the microsimulation
/// hands the vehicle off from edge to edge and is empty exactly
/// when the vehicle has arrived. `route_coordinates` is the full densified
/// polyline for the vehicle's entire original trip and never mutates; it is
/// what the live snapshot builder interpolates along using
/// `distance_traveled_m / route_length_m` as the progress fraction.
#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: String,
    pub route: Vec<EdgeId>,
    pub route_coordinates: Vec<Coord>,
    pub route_length_m: f64,
    pub depart_time_s: u64,
    pub arrival_time_s: Option<u64>,
    /// Current speed, km/h.
    pub speed: f64,
    /// Progress along the current edge, in `[0.0, 0.95]`. Capped below 1.0
    /// so the vehicle always has forward progress left on the next tick
    /// even under extreme congestion.
    pub current_edge_progress: f64,
    pub distance_traveled_m: f64,
    pub emissions_g: f64,
}

impl Vehicle {
    /// Build a vehicle from an ordered edge route, or return `None` if the
    /// route is empty or shorter than [`MIN_ROUTE_LENGTH_M`].
    pub fn build(
        id: String,
        graph: &RoadGraph,
        route: Vec<EdgeId>,
        depart_time_s: u64,
        initial_speed: f64,
    ) -> Option<Vehicle> {
        if route.is_empty() {
            return None;
        }

        let route_length_m: f64 = route.iter().map(|&e| graph.edge(e).length_m).sum();
        if route_length_m < MIN_ROUTE_LENGTH_M {
            return None;
        }

        let mut polyline: Vec<Coord> = Vec::new();
        for (i, &edge_id) in route.iter().enumerate() {
            let geom = &graph.edge(edge_id).geometry;
            if i == 0 {
                polyline.extend_from_slice(geom);
            } else {
                // Drop the first point of every subsequent edge — it
                // duplicates the previous edge's last point at the join.
                polyline.extend_from_slice(&geom[1..]);
            }
        }
        let route_coordinates = densify(&polyline, ROUTE_POLYLINE_STEP_M);

        Some(Vehicle {
            id,
            route,
            route_coordinates,
            route_length_m,
            depart_time_s,
            arrival_time_s: None,
            speed: initial_speed,
            current_edge_progress: 0.0,
            distance_traveled_m: 0.0,
            emissions_g: 0.0,
        })
    }

    #[inline]
    pub fn current_edge(&self) -> Option<EdgeId> {
        self.route.first().copied()
    }

    pub fn state(&self, t: u64) -> VehicleState {
        if self.arrival_time_s.is_some() {
            VehicleState::Arrived
        } else if self.depart_time_s <= t {
            VehicleState::Active
        } else {
            VehicleState::Scheduled
        }
    }

    #[inline]
    pub fn is_active(&self, t: u64) -> bool {
        matches!(self.state(t), VehicleState::Active)
    }

    /// Fraction of the trip completed, clamped to `[0, 1]`. Used by the live
    /// snapshot builder to interpolate along `route_coordinates`.
    pub fn progress(&self) -> f64 {
        if self.route_length_m <= 0.0 {
            return 1.0;
        }
        (self.distance_traveled_m / self.route_length_m).min(1.0)
    }
}
