//! Partial simulation metrics: what the microsimulation loop itself can
//! compute, before the orchestrator layers on graph sizes, incident
//! counts, and the construction-impact log to assemble the full
//! `final_metrics` response.

use tw_mobility::Vehicle;

/// Number of 5-minute windows a duration is divided into when averaging
/// periodic congestion samples.
const CONGESTION_SAMPLE_WINDOW_MINUTES: f64 = 5.0;

/// Totals the microsimulation loop produces directly from its own run
/// state, before the orchestrator's ±5% noise pass and external context
/// (graph sizes, incidents, marker log) are folded in.
#[derive(Clone, Debug)]
pub struct SimOutcome {
    /// Sum of `distance_traveled_m` across all vehicles, including ones
    /// that never became active, in km.
    pub driving_distance_km: f64,
    /// Average of the periodic instantaneous congestion-length samples, in
    /// km.
    pub congestion_length_km: f64,
    /// Sum of `emissions_g` across all vehicles, converted to kg once here
    /// at the boundary.
    pub co2_emissions_kg: f64,
    /// Final vehicle collection, for sampling into `vehicle_sample` and for
    /// any downstream persistence.
    pub vehicles: Vec<Vehicle>,
}

impl SimOutcome {
    pub fn assemble(vehicles: Vec<Vehicle>, congestion_samples_km: Vec<f64>, duration_minutes: u64) -> SimOutcome {
        let driving_distance_km = vehicles.iter().map(|v| v.distance_traveled_m).sum::<f64>() / 1000.0;
        let co2_emissions_kg = vehicles.iter().map(|v| v.emissions_g).sum::<f64>() / 1000.0;

        let windows = (duration_minutes as f64 / CONGESTION_SAMPLE_WINDOW_MINUTES).max(1.0);
        let congestion_length_km = congestion_samples_km.iter().sum::<f64>() / windows;

        SimOutcome { driving_distance_km, congestion_length_km, co2_emissions_kg, vehicles }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_has_zero_totals() {
        let outcome = SimOutcome::assemble(Vec::new(), Vec::new(), 60);
        assert_eq!(outcome.driving_distance_km, 0.0);
        assert_eq!(outcome.congestion_length_km, 0.0);
        assert_eq!(outcome.co2_emissions_kg, 0.0);
    }

    #[test]
    fn congestion_samples_average_over_five_minute_windows() {
        // 60 minutes / 5 = 12 windows; three 10 km samples average to 2.5 km.
        let outcome = SimOutcome::assemble(Vec::new(), vec![10.0, 10.0, 10.0], 60);
        assert!((outcome.congestion_length_km - 2.5).abs() < 1e-9);
    }
}
