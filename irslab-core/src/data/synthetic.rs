//! Synthetic liquidity-index series for tests and benches.
//!
//! The replay engine itself is deterministic and free of randomness;
//! these generators exist so tests and benches can build fixtures without
//! shipping datasets. The jittered variant is seeded, so a fixture is
//! reproducible from its seed.

use crate::domain::RateObservation;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Daily observations compounding at a constant `daily_rate` from
/// `start_index`.
pub fn growth_series(
    start: DateTime<Utc>,
    days: usize,
    start_index: f64,
    daily_rate: f64,
) -> Vec<RateObservation> {
    let mut index = start_index;
    (0..days)
        .map(|i| {
            let obs = RateObservation::new(start + Duration::days(i as i64), index);
            index *= 1.0 + daily_rate;
            obs
        })
        .collect()
}

/// Daily observations whose per-day growth is `daily_rate` perturbed by a
/// seeded multiplicative jitter. The index never decreases, matching the
/// accumulator semantics of a liquidity index.
pub fn jittered_series(
    seed: u64,
    start: DateTime<Utc>,
    days: usize,
    start_index: f64,
    daily_rate: f64,
    jitter: f64,
) -> Vec<RateObservation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut index = start_index;
    (0..days)
        .map(|i| {
            let obs = RateObservation::new(start + Duration::days(i as i64), index);
            let perturbed = daily_rate * rng.gen_range(1.0 - jitter..=1.0 + jitter);
            index *= 1.0 + perturbed.max(0.0);
            obs
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn growth_series_compounds_daily() {
        let series = growth_series(start(), 3, 1e27, 0.001);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].liquidity_index, 1e27);
        assert_eq!(series[1].liquidity_index, 1e27 * 1.001);
        assert_eq!(series[2].liquidity_index, 1e27 * 1.001 * 1.001);
    }

    #[test]
    fn jittered_series_is_reproducible_from_its_seed() {
        let a = jittered_series(42, start(), 30, 1e27, 0.001, 0.5);
        let b = jittered_series(42, start(), 30, 1e27, 0.001, 0.5);
        assert_eq!(a, b);

        let c = jittered_series(43, start(), 30, 1e27, 0.001, 0.5);
        assert_ne!(a, c);
    }

    #[test]
    fn jittered_series_never_decreases() {
        let series = jittered_series(7, start(), 100, 1e27, 0.001, 1.0);
        assert!(series
            .windows(2)
            .all(|w| w[1].liquidity_index >= w[0].liquidity_index));
    }
}
