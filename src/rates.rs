// Per-second rates between two samples of monotonically increasing counters

use chrono::{DateTime, Utc};

/// Seconds between the previous run and `now`; 0 when there was no previous run.
pub fn elapsed_secs(last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_run {
        Some(before) => (now - before).num_milliseconds() as f64 / 1000.0,
        None => 0.0,
    }
}

/// `(cur - prev) / elapsed`. A counter that went backwards (reset) counts as no change.
pub fn calculate_rate(cur: u64, prev: u64, elapsed: f64) -> f32 {
    if elapsed <= 0.0 {
        return 0.0;
    }
    (cur.saturating_sub(prev) as f64 / elapsed) as f32
}

/// CPU usage from USER_HZ tick counters, scaled by `num_cpus` so a busy loop reads
/// like `top`. The per-second delta is clamped to 100 before scaling.
pub fn calculate_cpu_pct(cur: u64, prev: u64, num_cpus: usize, elapsed: f64) -> f32 {
    let pct = calculate_rate(cur, prev, elapsed).min(100.0);
    pct * num_cpus as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn elapsed_is_zero_without_baseline() {
        assert_eq!(elapsed_secs(None, Utc::now()), 0.0);
    }

    #[test]
    fn elapsed_is_fractional() {
        let now = Utc::now();
        let before = now - Duration::milliseconds(2500);
        assert!((elapsed_secs(Some(before), now) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn clock_skew_gives_zero_rate() {
        let now = Utc::now();
        let later = now + Duration::seconds(5);
        let elapsed = elapsed_secs(Some(later), now);
        assert!(elapsed < 0.0);
        assert_eq!(calculate_rate(100, 0, elapsed), 0.0);
        assert_eq!(calculate_rate(100, 0, 0.0), 0.0);
    }

    #[test]
    fn rate_per_second() {
        assert_eq!(calculate_rate(300, 100, 2.0), 100.0);
    }

    #[test]
    fn counter_reset_gives_zero() {
        assert_eq!(calculate_rate(5, u64::MAX - 1, 1.0), 0.0);
        assert_eq!(calculate_cpu_pct(5, 500, 4, 1.0), 0.0);
    }

    #[test]
    fn cpu_pct_scales_by_cpu_count() {
        // 50 ticks over one second is half a core
        assert_eq!(calculate_cpu_pct(150, 100, 1, 1.0), 50.0);
        assert_eq!(calculate_cpu_pct(150, 100, 4, 1.0), 200.0);
    }

    #[test]
    fn cpu_pct_clamps_at_100_per_cpu() {
        assert_eq!(calculate_cpu_pct(10_000, 0, 4, 1.0), 400.0);
        assert_eq!(calculate_cpu_pct(10_000, 0, 1, 1.0), 100.0);
        assert_eq!(calculate_cpu_pct(10_000, 0, 8, 0.0), 0.0);
    }
}
