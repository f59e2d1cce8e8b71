//! Demand Generator: converts population and congestion level into a vehicle
//! count and assigns each vehicle a departure time and route.

use tw_core::{EdgeId, SimConfig, SimRng};
use tw_graph::{CongestionLevel, PopulationData, RoadGraph, RouteBuilder};

use crate::vehicle::Vehicle;

/// Distant-edge minimum separation used for the demand generator's own
/// origin/destination pairing — distinct from the route builder's
/// internal 1000 m dead-end escape and the facility applier's 1000 m.
const DEMAND_DEST_MIN_DIST_M: f64 = 2000.0;

/// Upper bound of the uniform departure-time window, in simulated seconds.
const DEPART_WINDOW_SECS: f64 = 2400.0;

/// Generate the base population-proportional vehicle demand.
///
/// `raw = round(population.estimated_vehicles * peak_hour_factor *
/// traffic_multiplier)`, capped at `config.max_vehicles`. Each candidate
/// draws a random origin/destination pair, builds a route via `routes`, and
/// is discarded if the resulting route is under 200 m (handled inside
/// [`Vehicle::build`]).
pub fn generate_demand(
    graph: &RoadGraph,
    routes: &mut RouteBuilder,
    population: &PopulationData,
    congestion_level: CongestionLevel,
    config: &SimConfig,
    rng: &mut SimRng,
) -> Vec<Vehicle> {
    let edges = graph.edges();
    if edges.is_empty() {
        return Vec::new();
    }

    let raw = (population.estimated_vehicles as f64
        * population.peak_hour_factor
        * congestion_level.demand_multiplier())
    .round();
    let demand = (raw as u64).min(config.max_vehicles as u64);

    let mut vehicles = Vec::with_capacity(demand as usize);
    for i in 0..demand {
        let depart_time_s = rng.gen_range(0.0..DEPART_WINDOW_SECS).round() as u64;

        let origin_idx = rng.gen_range(0..edges.len());
        let origin = edges[origin_idx].id;
        let dest = routes.pick_distant_edge(rng, origin, DEMAND_DEST_MIN_DIST_M);

        let route: Vec<EdgeId> = if dest != origin {
            routes.build_route(rng, origin, dest)
        } else {
            vec![origin]
        };

        let origin_edge = graph.edge(origin);
        let initial_speed = (origin_edge.free_flow_speed * (0.6 + rng.gen_range(0.0..0.4))).max(15.0);

        if let Some(v) = Vehicle::build(format!("vehicle_{i}"), graph, route, depart_time_s, initial_speed) {
            vehicles.push(v);
        }
    }

    vehicles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tw_core::Coord;
    use tw_graph::{PopulationSource, Road, RoadGraphBuilder};

    fn chain_graph() -> RoadGraph {
        let mut b = RoadGraphBuilder::new();
        for i in 0..9i64 {
            let mut tags = HashMap::new();
            tags.insert("highway".to_string(), "residential".to_string());
            b.add_road(Road {
                id: format!("r{i}"),
                node_ids: vec![i, i + 1],
                tags,
                geometry: vec![Coord::new(0.01 * i as f64, 0.0), Coord::new(0.01 * (i + 1) as f64, 0.0)],
            });
        }
        b.build().unwrap()
    }

    fn population(estimated_vehicles: u64, peak_hour_factor: f64) -> PopulationData {
        PopulationData {
            total: estimated_vehicles * 2,
            density_per_km2: 4000.0,
            estimated_vehicles,
            peak_hour_factor,
            age_distribution: HashMap::new(),
            working_population: estimated_vehicles,
            source: PopulationSource::Estimate,
        }
    }

    #[test]
    fn demand_is_capped_at_max_vehicles() {
        let g = chain_graph();
        let mut routes = RouteBuilder::new(&g);
        let pop = population(10_000, 1.0);
        let mut config = SimConfig::default();
        config.max_vehicles = 50;
        let mut rng = SimRng::new(1);
        let vehicles = generate_demand(&g, &mut routes, &pop, CongestionLevel::Low, &config, &mut rng);
        assert!(vehicles.len() as u32 <= config.max_vehicles);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let g = chain_graph();
        let pop = population(200, 0.12);
        let config = SimConfig::default();

        let mut routes_a = RouteBuilder::new(&g);
        let mut rng_a = SimRng::new(99);
        let a = generate_demand(&g, &mut routes_a, &pop, CongestionLevel::Medium, &config, &mut rng_a);

        let mut routes_b = RouteBuilder::new(&g);
        let mut rng_b = SimRng::new(99);
        let b = generate_demand(&g, &mut routes_b, &pop, CongestionLevel::Medium, &config, &mut rng_b);

        assert_eq!(a.len(), b.len());
        for (va, vb) in a.iter().zip(b.iter()) {
            assert_eq!(va.depart_time_s, vb.depart_time_s);
            assert_eq!(va.route, vb.route);
        }
    }

    #[test]
    fn every_generated_vehicle_clears_minimum_length() {
        let g = chain_graph();
        let mut routes = RouteBuilder::new(&g);
        let pop = population(500, 1.0);
        let config = SimConfig::default();
        let mut rng = SimRng::new(5);
        let vehicles = generate_demand(&g, &mut routes, &pop, CongestionLevel::High, &config, &mut rng);
        for v in &vehicles {
            assert!(v.route_length_m >= 200.0);
        }
    }
}
