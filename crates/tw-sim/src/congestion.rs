//! Shared congestion accounting: edge occupancy and utilization, used by
//! both the microsimulation core (§4.6, target-speed feedback and periodic
//! sampling) and the live snapshot builder (§4.7, congestion segments).

use std::collections::HashMap;

use tw_core::EdgeId;
use tw_graph::RoadGraph;
use tw_mobility::Vehicle;

/// Utilization threshold above which an edge counts as congested for both
/// the speed-feedback loop and the instantaneous congestion-length sample.
pub const CONGESTION_UTILIZATION_THRESHOLD: f64 = 0.7;

/// Number of active vehicles currently on each edge, keyed by edge id.
/// Recomputed once per outer tick and shared by every vehicle's
/// `advance()` call and by the periodic congestion sample, so they all see
/// the same pre-tick snapshot of occupancy.
pub fn edge_occupancy(vehicles: &[Vehicle], t: u64) -> HashMap<EdgeId, u32> {
    let mut occupancy = HashMap::new();
    for v in vehicles {
        if v.is_active(t) {
            if let Some(edge_id) = v.current_edge() {
                *occupancy.entry(edge_id).or_insert(0) += 1;
            }
        }
    }
    occupancy
}

/// `active_vehicles_on_edge / (capacity/3600)` — a unitless load measure
/// (glossary: Utilization).
#[inline]
pub fn utilization(capacity: u32, occupants: u32) -> f64 {
    occupants as f64 / (capacity as f64 / 3600.0).max(1.0)
}

/// Instantaneous congestion length, in km: sum of the length of every edge
/// whose utilization exceeds [`CONGESTION_UTILIZATION_THRESHOLD`].
pub fn instantaneous_congestion_length_km(graph: &RoadGraph, occupancy: &HashMap<EdgeId, u32>) -> f64 {
    let meters: f64 = graph
        .edges()
        .iter()
        .filter(|e| utilization(e.capacity, occupancy.get(&e.id).copied().unwrap_or(0)) > CONGESTION_UTILIZATION_THRESHOLD)
        .map(|e| e.length_m)
        .sum();
    meters / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_guards_against_near_zero_capacity() {
        // capacity/3600 would be < 1 here; the denominator floors at 1.0
        // vehicle so a single occupant never reads as wildly over capacity.
        assert_eq!(utilization(10, 1), 1.0);
    }

    #[test]
    fn utilization_scales_with_capacity() {
        // capacity 3600/h -> denominator 1.0 vehicle
        assert_eq!(utilization(3600, 2), 2.0);
    }
}
