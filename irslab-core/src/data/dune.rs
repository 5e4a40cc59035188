//! Dune Analytics data provider.
//!
//! Fetches liquidity-index query results from the Dune API (v1 `results`
//! endpoint) and writes them in the per-token CSV layout the replay
//! handler reads. The CSV import path is the primary offline path; this
//! client only exists to refresh datasets.

use super::csv_source::parse_timestamp;
use super::DataError;
use crate::domain::RateObservation;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Column holding the observation timestamp in Dune query results.
const DATE_COLUMN: &str = "date";

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    result: Option<ResultBody>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Minimal blocking client for the Dune Analytics results API.
pub struct DuneClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl DuneClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.dune.com")
    }

    /// Point the client at a different host; used by tests.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Fetch the latest results of `query_id` and extract the
    /// liquidity-index series from `value_column`.
    ///
    /// Rows arrive unordered; the result is sorted by timestamp.
    pub fn fetch_liquidity_index(
        &self,
        query_id: u64,
        value_column: &str,
    ) -> Result<Vec<RateObservation>, DataError> {
        let url = format!("{}/api/v1/query/{query_id}/results", self.base_url);
        let response: ResultsResponse = self
            .client
            .get(url)
            .header("X-Dune-API-Key", &self.api_key)
            .send()?
            .error_for_status()?
            .json()?;

        let body = response.result.ok_or(DataError::DuneEmptyResult)?;
        rows_to_observations(&body.rows, value_column)
    }
}

/// Convert raw Dune rows into sorted observations.
fn rows_to_observations(
    rows: &[serde_json::Map<String, serde_json::Value>],
    value_column: &str,
) -> Result<Vec<RateObservation>, DataError> {
    let mut observations = Vec::with_capacity(rows.len());
    for row in rows {
        let raw_date = row
            .get(DATE_COLUMN)
            .and_then(|v| v.as_str())
            .ok_or_else(|| DataError::DuneMissingColumn(DATE_COLUMN.to_string()))?;
        let timestamp = parse_timestamp(raw_date).ok_or_else(|| DataError::Timestamp {
            path: "dune response".to_string(),
            value: raw_date.to_string(),
        })?;

        let value = row
            .get(value_column)
            .ok_or_else(|| DataError::DuneMissingColumn(value_column.to_string()))?;
        let liquidity_index = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| *v > 0.0 && v.is_finite())
        .ok_or_else(|| DataError::LiquidityIndex {
            path: "dune response".to_string(),
            value: value.to_string(),
        })?;

        observations.push(RateObservation::new(timestamp, liquidity_index));
    }
    observations.sort_by_key(|obs| obs.timestamp);
    Ok(observations)
}

/// Render observations as `date,liquidityIndex` CSV.
pub fn observations_to_csv(observations: &[RateObservation]) -> Result<String, DataError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "liquidityIndex"])
        .map_err(|source| DataError::Csv {
            path: "<memory>".to_string(),
            source,
        })?;
    for obs in observations {
        wtr.write_record([
            obs.timestamp.to_rfc3339(),
            format!("{:e}", obs.liquidity_index),
        ])
        .map_err(|source| DataError::Csv {
            path: "<memory>".to_string(),
            source,
        })?;
    }
    let bytes = wtr
        .into_inner()
        .expect("csv writer over a Vec cannot fail to flush");
    Ok(String::from_utf8(bytes).expect("csv output is always UTF-8"))
}

/// Write observations as a token dataset next to the others.
pub fn write_token_csv(path: &Path, observations: &[RateObservation]) -> Result<(), DataError> {
    let contents = observations_to_csv(observations)?;
    std::fs::write(path, contents).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })
}
