//! Wall-clock helpers for human-readable progress logging.
//!
//! The simulation itself counts plain integer seconds (`t: u64`) rather than
//! an abstract tick — the domain's own unit is already seconds, so
//! introducing a `Tick` newtype on top would just be an extra conversion at
//! every call site for no benefit. This module turns an elapsed-seconds
//! count into (day, hour, minute) components for progress lines.

/// Break elapsed seconds into (day, hour, minute) components.
pub fn elapsed_dhm(elapsed_secs: u64) -> (u64, u32, u32) {
    let days = elapsed_secs / 86_400;
    let hours = ((elapsed_secs % 86_400) / 3_600) as u32;
    let minutes = ((elapsed_secs % 3_600) / 60) as u32;
    (days, hours, minutes)
}

/// Human-readable `Ns`/`Nm Ns`/`Nh Nm` label for a seconds duration, used in
/// progress-log lines emitted every 600 simulated seconds.
pub fn format_duration(secs: u64) -> String {
    let (d, h, m) = elapsed_dhm(secs);
    if d > 0 {
        format!("{d}d {h:02}h{m:02}m")
    } else if h > 0 {
        format!("{h}h{m:02}m")
    } else {
        format!("{m}m{:02}s", secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dhm_breakdown() {
        assert_eq!(elapsed_dhm(3661), (0, 1, 1));
        assert_eq!(elapsed_dhm(90_000), (1, 1, 0));
    }

    #[test]
    fn format_under_a_minute() {
        assert_eq!(format_duration(45), "0m45s");
    }
}
