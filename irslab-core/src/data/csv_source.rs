//! Per-token CSV ingestion.
//!
//! Datasets are `date,liquidityIndex` files, one per token, as written by
//! the Dune fetcher. Timestamps arrive in several shapes (RFC 3339 with
//! offset, `YYYY-MM-DD HH:MM:SS`, bare dates); indices are large decimals
//! in ray-like units (e.g. 1e27).

use super::DataError;
use crate::domain::RateObservation;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Loading options: date-range filter and daily resampling.
#[derive(Debug, Clone)]
pub struct CsvSourceOptions {
    /// Keep only observations at or after this instant (applied to raw rows).
    pub start: Option<DateTime<Utc>>,
    /// Keep only observations at or before this instant.
    pub end: Option<DateTime<Utc>>,
    /// Collapse to one bar per calendar day: the last observation of each
    /// day, stamped at the following midnight (a day's closing index is
    /// known once the day has ended).
    pub resample_daily: bool,
}

impl Default for CsvSourceOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            resample_daily: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    #[serde(rename = "liquidityIndex")]
    liquidity_index: f64,
}

/// Load one token's observations from `<path>`, applying the options.
pub fn load_token_csv(
    path: &Path,
    opts: &CsvSourceOptions,
) -> Result<Vec<RateObservation>, DataError> {
    let label = path.display().to_string();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: label.clone(),
        source,
    })?;
    read_observations(file, &label, opts)
}

/// Parse observations from any reader; split out from the file wrapper so
/// parsing is testable without touching the filesystem.
pub(crate) fn read_observations<R: Read>(
    reader: R,
    label: &str,
    opts: &CsvSourceOptions,
) -> Result<Vec<RateObservation>, DataError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut raw = Vec::new();
    for row in rdr.deserialize::<RawRow>() {
        let row = row.map_err(|source| DataError::Csv {
            path: label.to_string(),
            source,
        })?;
        let timestamp = parse_timestamp(&row.date).ok_or_else(|| DataError::Timestamp {
            path: label.to_string(),
            value: row.date.clone(),
        })?;
        if !(row.liquidity_index > 0.0 && row.liquidity_index.is_finite()) {
            return Err(DataError::LiquidityIndex {
                path: label.to_string(),
                value: row.liquidity_index.to_string(),
            });
        }
        raw.push(RateObservation::new(timestamp, row.liquidity_index));
    }

    raw.sort_by_key(|obs| obs.timestamp);
    raw.retain(|obs| {
        opts.start.map_or(true, |start| obs.timestamp >= start)
            && opts.end.map_or(true, |end| obs.timestamp <= end)
    });

    let mut observations = if opts.resample_daily {
        resample_daily(&raw)
    } else {
        raw
    };
    // Collapse duplicate timestamps.
    observations.dedup_by_key(|obs| obs.timestamp);
    Ok(observations)
}

/// Parse the timestamp shapes seen in the datasets.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Keep the last observation of each calendar day, stamped at the next
/// midnight. Input must be sorted by timestamp.
fn resample_daily(observations: &[RateObservation]) -> Vec<RateObservation> {
    let mut out: Vec<RateObservation> = Vec::new();
    for obs in observations {
        let bar_stamp = (obs.timestamp.date_naive() + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();
        match out.last_mut() {
            Some(last) if last.timestamp == bar_stamp => {
                last.liquidity_index = obs.liquidity_index
            }
            _ => out.push(RateObservation::new(bar_stamp, obs.liquidity_index)),
        }
    }
    out
}
