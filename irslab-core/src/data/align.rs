//! Multi-token time alignment.
//!
//! Replay order is defined by calendar time, so all token series are
//! placed onto a shared, unioned timestamp index before replay begins.
//! Gaps are forward-filled from the most recent known value — never
//! backward-filled — and the shared index starts at the latest
//! first-observation across tokens, so every token has a value at every
//! shared step.

use crate::domain::RateObservation;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Token series aligned to a common timestamp axis.
///
/// Every series has the same length as `timestamps`.
#[derive(Debug, Clone)]
pub struct AlignedRates {
    pub timestamps: Vec<DateTime<Utc>>,
    pub series: BTreeMap<String, Vec<RateObservation>>,
}

/// Align token series onto the union of their timestamps, forward-filling
/// missing steps.
pub fn align_forward_fill(
    input: BTreeMap<String, Vec<RateObservation>>,
) -> AlignedRates {
    // Union axis, restricted to where every token already has history.
    let mut all_stamps = BTreeSet::new();
    let mut replay_start: Option<DateTime<Utc>> = None;
    for series in input.values() {
        for obs in series {
            all_stamps.insert(obs.timestamp);
        }
        if let Some(first) = series.first() {
            replay_start = Some(match replay_start {
                Some(start) => start.max(first.timestamp),
                None => first.timestamp,
            });
        }
    }
    let timestamps: Vec<DateTime<Utc>> = match replay_start {
        Some(start) => all_stamps.into_iter().filter(|ts| *ts >= start).collect(),
        None => Vec::new(),
    };

    let mut aligned = BTreeMap::new();
    for (token, series) in input {
        let mut filled = Vec::with_capacity(timestamps.len());
        let mut next = 0;
        let mut last_value = None;
        for &stamp in &timestamps {
            while next < series.len() && series[next].timestamp <= stamp {
                last_value = Some(series[next].liquidity_index);
                next += 1;
            }
            // `stamp >= replay_start >= series.first().timestamp`, so a
            // value is always available once the axis begins.
            if let Some(value) = last_value {
                filled.push(RateObservation::new(stamp, value));
            }
        }
        aligned.insert(token, filled);
    }

    AlignedRates {
        timestamps,
        series: aligned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, d, 0, 0, 0).unwrap()
    }

    fn series(start_day: u32, indices: &[f64]) -> Vec<RateObservation> {
        indices
            .iter()
            .enumerate()
            .map(|(i, &idx)| {
                RateObservation::new(day(start_day) + Duration::days(i as i64), idx)
            })
            .collect()
    }

    #[test]
    fn axis_starts_at_the_latest_first_observation() {
        let mut input = BTreeMap::new();
        input.insert("aave_usdc".to_string(), series(1, &[1.0e27, 1.1e27, 1.2e27]));
        input.insert("lido_steth".to_string(), series(2, &[2.0e27, 2.1e27]));

        let aligned = align_forward_fill(input);
        // lido's history starts on day 2, so day 1 is dropped from the axis.
        assert_eq!(aligned.timestamps, vec![day(2), day(3)]);
        assert_eq!(aligned.series["aave_usdc"].len(), 2);
        assert_eq!(aligned.series["lido_steth"].len(), 2);
        assert_eq!(aligned.series["aave_usdc"][0].liquidity_index, 1.1e27);
    }

    #[test]
    fn gaps_forward_fill_from_the_most_recent_value() {
        let mut input = BTreeMap::new();
        input.insert("aave_usdc".to_string(), series(1, &[1.0e27, 1.1e27, 1.2e27]));
        // lido is missing day 2.
        let mut lido = series(1, &[2.0e27]);
        lido.push(RateObservation::new(day(3), 2.2e27));
        input.insert("lido_steth".to_string(), lido);

        let aligned = align_forward_fill(input);
        assert_eq!(aligned.timestamps.len(), 3);
        let filled = &aligned.series["lido_steth"];
        assert_eq!(filled[0].liquidity_index, 2.0e27);
        assert_eq!(filled[1].liquidity_index, 2.0e27); // carried forward
        assert_eq!(filled[2].liquidity_index, 2.2e27);
    }

    #[test]
    fn series_that_ends_early_carries_its_last_value() {
        let mut input = BTreeMap::new();
        input.insert("aave_usdc".to_string(), series(1, &[1.0e27, 1.1e27, 1.2e27]));
        input.insert("lido_steth".to_string(), series(1, &[2.0e27, 2.1e27]));

        let aligned = align_forward_fill(input);
        assert_eq!(aligned.timestamps.len(), 3);
        assert_eq!(aligned.series["lido_steth"][2].liquidity_index, 2.1e27);
    }

    #[test]
    fn empty_input_yields_empty_axis() {
        let aligned = align_forward_fill(BTreeMap::new());
        assert!(aligned.timestamps.is_empty());
        assert!(aligned.series.is_empty());
    }
}
