//! Microsimulation core: the per-tick vehicle state update and the outer
//! loop that drives it, sampling congestion and logging progress along
//! the way.

use tw_core::EdgeId;
use tw_graph::providers::{Flow, TrafficData};
use tw_graph::RoadGraph;
use tw_mobility::Vehicle;

use crate::congestion::{edge_occupancy, instantaneous_congestion_length_km, utilization};
use crate::metrics::SimOutcome;

/// Active-vehicle count above which the outer loop ticks at 1 s resolution
/// instead of 10 s — the dense-traffic path needs the finer step to keep
/// speed smoothing stable.
const DENSE_TRAFFIC_THRESHOLD: usize = 100;
const FINE_STEP_SECS: u64 = 1;
const COARSE_STEP_SECS: u64 = 10;

const CONGESTION_SAMPLE_INTERVAL_SECS: u64 = 300;
const PROGRESS_LOG_INTERVAL_SECS: u64 = 600;
const EMISSIONS_INTERVAL_SECS: u64 = 10;

const FLOW_PROXIMITY_M: f64 = 1000.0;
const UTILIZATION_DERATE_THRESHOLD: f64 = 0.7;
const SPEED_SMOOTHING_FACTOR: f64 = 0.2;
const ANTI_STALL_FLOOR_SPEED: f64 = 5.0;
const ANTI_STALL_TARGET_FRACTION: f64 = 0.3;

const EMISSION_BASE_G_PER_KM: f64 = 120.0;

/// A multiplier on the 120 g/km base emission rate, banded by current
/// speed.
fn emission_factor(speed_kmh: f64) -> f64 {
    if speed_kmh < 20.0 {
        1.6
    } else if speed_kmh < 40.0 {
        1.2
    } else if speed_kmh > 80.0 {
        1.3
    } else {
        1.0
    }
}

/// Everything the outer loop needs to hand a single vehicle through one
/// `advance()` call, gathered once per tick rather than recomputed per
/// vehicle.
struct TickContext<'a> {
    graph: &'a RoadGraph,
    flows: &'a [Flow],
    occupancy: &'a std::collections::HashMap<EdgeId, u32>,
    t: u64,
    dt: u64,
}

/// Advance one vehicle by `dt` seconds at simulated time `t`. No-op if the
/// vehicle has no current edge (already arrived).
fn advance(vehicle: &mut Vehicle, ctx: &TickContext) {
    let Some(edge_id) = vehicle.current_edge() else { return };
    let edge = ctx.graph.edge(edge_id);

    let mut target = edge.free_flow_speed;

    if let Some(flow) = ctx
        .flows
        .iter()
        .find(|f| f.coordinates.first().is_some_and(|c| c.distance_m(edge.start()) < FLOW_PROXIMITY_M))
    {
        target = target.min(flow.current_speed);
    }

    let occupants = ctx.occupancy.get(&edge_id).copied().unwrap_or(0);
    let util = utilization(edge.capacity, occupants);
    if util > UTILIZATION_DERATE_THRESHOLD {
        target *= (1.0 - (util - UTILIZATION_DERATE_THRESHOLD) * 0.5).max(0.1);
    }

    vehicle.speed = (vehicle.speed + SPEED_SMOOTHING_FACTOR * (target - vehicle.speed)).max(0.0);
    if target > 0.0 && vehicle.speed < ANTI_STALL_FLOOR_SPEED {
        vehicle.speed = (target * ANTI_STALL_TARGET_FRACTION).max(ANTI_STALL_FLOOR_SPEED);
    }

    let distance_m = vehicle.speed * ctx.dt as f64 / 3.6;
    let remaining_m = edge.length_m * (1.0 - vehicle.current_edge_progress);

    if distance_m >= remaining_m {
        vehicle.distance_traveled_m += remaining_m;
        vehicle.route.remove(0);
        if vehicle.route.is_empty() {
            vehicle.arrival_time_s = Some(ctx.t);
            vehicle.current_edge_progress = 0.0;
        } else {
            let carry_m = distance_m - remaining_m;
            let next_len = ctx.graph.edge(vehicle.route[0]).length_m;
            vehicle.current_edge_progress = (carry_m / next_len.max(1.0)).min(0.95);
        }
    } else {
        vehicle.distance_traveled_m += distance_m;
        vehicle.current_edge_progress = (vehicle.current_edge_progress + distance_m / edge.length_m).min(0.95);
    }

    if ctx.t % EMISSIONS_INTERVAL_SECS == 0 {
        let grams = EMISSION_BASE_G_PER_KM * emission_factor(vehicle.speed) * (vehicle.speed / 3600.0);
        vehicle.emissions_g += grams;
    }
}

/// A hook the outer loop invokes at fixed points in the tick so callers
/// (the orchestrator, in particular) can emit live snapshots and progress
/// logs without the engine knowing anything about streaming or tracing.
pub trait TickObserver {
    /// Called every `live_tick_seconds` of simulated time (`run`'s own
    /// parameter, itself `SimConfig::live_tick_seconds`).
    fn on_live_tick(&mut self, _graph: &RoadGraph, _vehicles: &[Vehicle], _t: u64) {}

    /// Called every [`PROGRESS_LOG_INTERVAL_SECS`] of simulated time with
    /// the count of currently active vehicles.
    fn on_progress(&mut self, _t: u64, _active: usize) {}

    /// Polled once per outer tick; returning `true` stops the loop at the
    /// next tick boundary.
    fn should_stop(&self) -> bool {
        false
    }
}

/// A [`TickObserver`] that does nothing — used when no streaming
/// subscriber is attached.
pub struct NoopObserver;
impl TickObserver for NoopObserver {}

/// Run the microsimulation to completion (or until `observer.should_stop()`
/// returns `true`), mutating `graph` only through marker impacts applied
/// before this call — the loop itself treats edges as read-only aside from
/// occupancy counting.
///
/// `live_tick_seconds` is the live-snapshot cadence (`SimConfig::live_tick_seconds`,
/// default 10 s per spec §6); it does not affect the 300 s congestion-sampling
/// or 600 s progress-log cadences, which are fixed.
pub fn run<O: TickObserver>(
    graph: &RoadGraph,
    mut vehicles: Vec<Vehicle>,
    traffic: &TrafficData,
    duration_minutes: u64,
    live_tick_seconds: u64,
    mut observer: O,
) -> SimOutcome {
    let duration_s = duration_minutes * 60;
    let live_tick_seconds = live_tick_seconds.max(1);
    let mut t: u64 = 0;
    let mut congestion_samples: Vec<f64> = Vec::new();
    let mut next_congestion_sample = 0u64;
    let mut next_progress_log = 0u64;
    let mut next_live_tick = 0u64;

    while t < duration_s {
        if observer.should_stop() {
            break;
        }

        let active_count = vehicles.iter().filter(|v| v.is_active(t)).count();
        let dt = if active_count > DENSE_TRAFFIC_THRESHOLD { FINE_STEP_SECS } else { COARSE_STEP_SECS };

        let occupancy = edge_occupancy(&vehicles, t);
        let ctx = TickContext { graph, flows: &traffic.flows, occupancy: &occupancy, t, dt };

        for vehicle in vehicles.iter_mut().filter(|v| v.is_active(t)) {
            advance(vehicle, &ctx);
        }

        if t >= next_congestion_sample {
            congestion_samples.push(instantaneous_congestion_length_km(graph, &occupancy));
            next_congestion_sample = t + CONGESTION_SAMPLE_INTERVAL_SECS;
        }

        if t >= next_live_tick {
            observer.on_live_tick(graph, &vehicles, t);
            next_live_tick = t + live_tick_seconds;
        }

        if t >= next_progress_log {
            observer.on_progress(t, active_count);
            next_progress_log = t + PROGRESS_LOG_INTERVAL_SECS;
        }

        t += dt;
    }

    SimOutcome::assemble(vehicles, congestion_samples, duration_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tw_core::{Coord, SimRng};
    use tw_graph::providers::CongestionLevel;
    use tw_graph::{Road, RoadGraphBuilder};

    fn long_edge_graph() -> RoadGraph {
        let mut b = RoadGraphBuilder::new();
        let mut tags = HashMap::new();
        tags.insert("highway".to_string(), "primary".to_string());
        b.add_road(Road {
            id: "r0".into(),
            node_ids: vec![0, 1],
            tags,
            geometry: vec![Coord::new(0.0, 0.0), Coord::new(0.0, 0.1)], // ~11.1 km
        });
        b.build().unwrap()
    }

    fn empty_traffic() -> TrafficData {
        TrafficData { incidents: vec![], flows: vec![], average_delay_secs: 0.0, congestion_level: CongestionLevel::Low }
    }

    #[test]
    fn vehicle_progress_is_monotone_and_bounded() {
        let g = long_edge_graph();
        let edge = g.edge(EdgeId(0));
        let v = Vehicle::build("v0".into(), &g, vec![edge.id], 0, 30.0).unwrap();

        let outcome = run(&g, vec![v], &empty_traffic(), 30, 10, NoopObserver);
        let vehicle = &outcome.vehicles[0];
        assert!(vehicle.distance_traveled_m >= 0.0);
        assert!(vehicle.current_edge_progress <= 0.95 + 1e-9);
    }

    #[test]
    fn vehicle_arrives_when_edge_is_short_enough() {
        let mut b = RoadGraphBuilder::new();
        let mut tags = HashMap::new();
        tags.insert("highway".to_string(), "primary".to_string());
        b.add_road(Road {
            id: "r0".into(),
            node_ids: vec![0, 1],
            tags,
            geometry: vec![Coord::new(0.0, 0.0), Coord::new(0.0, 0.002)], // ~222 m
        });
        let g = b.build().unwrap();
        let v = Vehicle::build("v0".into(), &g, vec![EdgeId(0)], 0, 50.0).unwrap();

        let outcome = run(&g, vec![v], &empty_traffic(), 15, 10, NoopObserver);
        assert!(outcome.vehicles[0].arrival_time_s.is_some());
    }

    #[test]
    fn emission_factor_bands_by_speed() {
        assert_eq!(emission_factor(10.0), 1.6);
        assert_eq!(emission_factor(25.0), 1.2);
        assert_eq!(emission_factor(50.0), 1.0);
        assert_eq!(emission_factor(90.0), 1.3);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let g = long_edge_graph();
        let edge_id = g.edge(EdgeId(0)).id;
        let mut rng1 = SimRng::new(9);
        let mut rng2 = SimRng::new(9);
        let _ = rng1.gen_range(0..1); // parity with orchestrator draw order, unused here
        let _ = rng2.gen_range(0..1);

        let v1 = Vehicle::build("v0".into(), &g, vec![edge_id], 0, 30.0).unwrap();
        let v2 = Vehicle::build("v0".into(), &g, vec![edge_id], 0, 30.0).unwrap();

        let out1 = run(&g, vec![v1], &empty_traffic(), 10, 10, NoopObserver);
        let out2 = run(&g, vec![v2], &empty_traffic(), 10, 10, NoopObserver);
        assert_eq!(out1.vehicles[0].distance_traveled_m, out2.vehicles[0].distance_traveled_m);
    }

    struct RecordingObserver {
        live_ticks: std::rc::Rc<std::cell::RefCell<Vec<u64>>>,
    }

    impl TickObserver for RecordingObserver {
        fn on_live_tick(&mut self, _graph: &RoadGraph, _vehicles: &[Vehicle], t: u64) {
            self.live_ticks.borrow_mut().push(t);
        }
    }

    #[test]
    fn live_tick_seconds_controls_the_snapshot_cadence() {
        let g = long_edge_graph();
        let edge = g.edge(EdgeId(0));
        let v = Vehicle::build("v0".into(), &g, vec![edge.id], 0, 30.0).unwrap();

        let live_ticks = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let observer = RecordingObserver { live_ticks: live_ticks.clone() };
        run(&g, vec![v], &empty_traffic(), 5, 30, observer);

        assert_eq!(*live_ticks.borrow(), vec![0, 30, 60, 90, 120, 150, 180, 210, 240, 270]);
    }
}
