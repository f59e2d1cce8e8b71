//! Top-level simulation configuration.
//!
//! Constructed from CLI/env defaults by the service binary, or directly by
//! library callers and tests. Per-request `duration_minutes`/`radius_km`
//! normally come from the request body, but the rest are process-wide
//! operational knobs.

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Simulated wall-clock duration, in minutes. Default 60.
    pub duration_minutes: u32,
    /// Graph extraction radius, in km. Default 3.
    pub radius_km: f64,
    /// Hard cap on generated demand. Default 500.
    pub max_vehicles: u32,
    /// Vehicles included per live snapshot. Default 50.
    pub live_sample_size: usize,
    /// Live snapshot interval, in simulated seconds. Default 10.
    pub live_tick_seconds: u64,
    /// Road-network provider cache TTL, in seconds. Default 600 (10 min).
    pub road_cache_ttl_secs: u64,
    /// Master RNG seed — the same seed reproduces the same run.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
            radius_km: 3.0,
            max_vehicles: 500,
            live_sample_size: 50,
            live_tick_seconds: 10,
            road_cache_ttl_secs: 600,
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Total simulated seconds for a run, the microsimulation loop's upper
    /// bound on `t`.
    #[inline]
    pub fn duration_secs(&self) -> u64 {
        self.duration_minutes as u64 * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_duration_is_one_hour() {
        assert_eq!(SimConfig::default().duration_secs(), 3600);
    }
}
