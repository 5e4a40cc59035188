//! Liquidity-index to APY conversions.
//!
//! A pool's liquidity index is a cumulative accumulator: the period yield
//! between two observations is the ratio of their indices, and the APY
//! compounds that period yield onto a fixed 365-day year.

use crate::domain::RateObservation;

/// Exactly 365 days. The annualization basis is fixed, not
/// calendar-accurate, so results are bit-reproducible.
pub const SECONDS_PER_YEAR: f64 = 31_536_000.0;

/// Annualize a period rate observed over `elapsed_seconds` of wall-clock
/// time: `(1 + rate)^(SECONDS_PER_YEAR / elapsed_seconds) - 1`.
///
/// Returns NaN for a non-positive elapsed time; callers filter NaN before
/// computing statistics.
pub fn annualize(period_rate: f64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds <= 0.0 {
        return f64::NAN;
    }
    (1.0 + period_rate).powf(SECONDS_PER_YEAR / elapsed_seconds) - 1.0
}

/// APY series from a window of liquidity-index observations.
///
/// For each observation `i >= 1`, the period rate compares against the
/// observation `apy_lookback` steps earlier, saturating at the window
/// start. Output length is `observations.len() - 1` (empty input or a
/// single observation yields an empty series).
pub fn apy_series(observations: &[RateObservation], apy_lookback: usize) -> Vec<f64> {
    if observations.len() < 2 {
        return Vec::new();
    }
    let mut apys = Vec::with_capacity(observations.len() - 1);
    for i in 1..observations.len() {
        let window = i.saturating_sub(apy_lookback);
        let period =
            observations[i].liquidity_index / observations[window].liquidity_index - 1.0;
        let elapsed =
            (observations[i].timestamp - observations[window].timestamp).num_seconds() as f64;
        apys.push(annualize(period, elapsed));
    }
    apys
}
