//! Deterministic narrative generators for the `ai_summary`,
//! `risk_assessment`, and `recommendations` response fields.
//!
//! No LLM client crate appears anywhere in this workspace's dependency
//! stack — these are rule-based templates over [`FinalMetrics`], not a
//! model call.

use crate::metrics::FinalMetrics;

/// Congestion length as a fraction of the total road length simulated,
/// above which the network is considered heavily loaded.
const HEAVY_CONGESTION_RATIO: f64 = 0.15;
const MODERATE_CONGESTION_RATIO: f64 = 0.05;

/// CO2 per vehicle sampled, above which emissions are called elevated.
const HIGH_CO2_PER_VEHICLE_KG: f64 = 0.5;

pub fn ai_summary(m: &FinalMetrics) -> String {
    format!(
        "Simulated {} road segments across {} intersections, covering {:.1} km of vehicle travel with {:.2} km of network congestion and {:.1} kg of CO2 emissions. {} construction zone(s) altered {} edge(s).",
        m.roads_count,
        m.nodes_count,
        m.driving_distance_km,
        m.congestion_length_km,
        m.co2_emissions_kg,
        m.construction_impacts.iter().map(|c| c.edge_id).collect::<std::collections::HashSet<_>>().len(),
        m.affected_edges,
    )
}

pub fn risk_assessment(m: &FinalMetrics) -> String {
    let congestion_ratio = congestion_ratio(m);

    if congestion_ratio >= HEAVY_CONGESTION_RATIO {
        "High risk: congestion affects a substantial share of the simulated network. Expect significant delays and degraded emergency-vehicle access near affected corridors.".to_string()
    } else if congestion_ratio >= MODERATE_CONGESTION_RATIO {
        "Moderate risk: localized congestion is present but the broader network retains spare capacity.".to_string()
    } else {
        "Low risk: the network absorbs the added demand with minimal congestion.".to_string()
    }
}

pub fn recommendations(m: &FinalMetrics) -> Vec<String> {
    let mut out = Vec::new();

    if congestion_ratio(m) >= MODERATE_CONGESTION_RATIO {
        out.push("Stagger peak-hour demand near affected corridors with signal timing adjustments.".to_string());
    }

    if !m.construction_impacts.is_empty() {
        out.push(format!(
            "Schedule construction at {} affected edge(s) outside peak travel windows where feasible.",
            m.affected_edges
        ));
    }

    let co2_per_vehicle = if m.vehicle_sample.is_empty() { 0.0 } else { m.co2_emissions_kg / m.vehicle_sample.len() as f64 };
    if co2_per_vehicle >= HIGH_CO2_PER_VEHICLE_KG {
        out.push("Evaluate transit or carpool incentives to offset elevated per-vehicle emissions.".to_string());
    }

    if out.is_empty() {
        out.push("No corrective action indicated; monitor conditions on the next simulation run.".to_string());
    }

    out
}

fn congestion_ratio(m: &FinalMetrics) -> f64 {
    if m.driving_distance_km <= 0.0 {
        0.0
    } else {
        m.congestion_length_km / m.driving_distance_km
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FinalMetrics;
    use tw_core::SimRng;

    #[test]
    fn low_congestion_yields_low_risk() {
        let mut rng = SimRng::new(1);
        let m = FinalMetrics::fallback_estimate(0, 0, &mut rng);
        assert!(risk_assessment(&m).starts_with("Low risk"));
    }

    #[test]
    fn construction_impacts_trigger_a_scheduling_recommendation() {
        let mut rng = SimRng::new(1);
        let mut m = FinalMetrics::fallback_estimate(0, 0, &mut rng);
        m.affected_edges = 3;
        m.construction_impacts.push(tw_mobility::ConstructionImpact {
            edge_id: tw_core::EdgeId(0),
            original_speed: 50.0,
            reduced_speed: 20.0,
        });
        let recs = recommendations(&m);
        assert!(recs.iter().any(|r| r.contains("construction")));
    }
}
