//! The replay data handler: capability traits and the CSV-backed
//! implementation.
//!
//! The goal of a conforming handler is to hand out rates exactly as a
//! live feed would — the rest of the system cannot tell a historic
//! replay from live data.

use super::align::align_forward_fill;
use super::csv_source::{load_token_csv, CsvSourceOptions};
use super::DataError;
use crate::domain::{Event, EventQueue, RateObservation};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Read access to the rates observed so far.
///
/// For a fixed input series and a fixed `n`, repeated calls with the same
/// state return bit-identical results: there is no hidden randomness.
pub trait RateView {
    /// Tokens this view serves, in deterministic (sorted) order.
    fn token_list(&self) -> &[String];

    /// The last `min(n, available)` observations for `token`, oldest
    /// first — always a suffix of the observed-so-far sequence. An
    /// unknown token logs a warning and returns no data; it never raises
    /// into the event loop.
    fn get_latest_rates(&self, token: &str, n: usize) -> &[RateObservation];

    /// Most recent observation for `token`, if any.
    fn latest(&self, token: &str) -> Option<&RateObservation> {
        self.get_latest_rates(token, 1).last()
    }
}

/// A replayable rate source: advance one step or report exhaustion.
pub trait DataHandler: RateView {
    /// False once any token's series is exhausted.
    fn continue_backtest(&self) -> bool;

    /// Advance every token's cursor by exactly one observation and
    /// enqueue exactly one `Market` event — or, on exhaustion, flip the
    /// continue flag off and enqueue nothing.
    fn update_rates(&mut self, queue: &mut EventQueue);
}

/// Bar-by-bar replay over forward-fill-aligned CSV series.
pub struct HistoricCsvDataHandler {
    tokens: Vec<String>,
    series: BTreeMap<String, Vec<RateObservation>>,
    /// Bars revealed so far. Alignment gives every series the same
    /// length, so one cursor advances every token in lockstep and
    /// exhaustion is simultaneous.
    cursor: usize,
    bar_count: usize,
    continue_backtest: bool,
}

impl HistoricCsvDataHandler {
    /// Load `<data_dir>/<token>.csv` for each token and align the series.
    pub fn new(
        data_dir: &Path,
        tokens: &[String],
        opts: &CsvSourceOptions,
    ) -> Result<Self, DataError> {
        let mut input = BTreeMap::new();
        for token in tokens {
            let path = data_dir.join(format!("{token}.csv"));
            let observations = load_token_csv(&path, opts)?;
            if observations.is_empty() {
                return Err(DataError::EmptySeries(token.clone()));
            }
            input.insert(token.clone(), observations);
        }
        Ok(Self::from_series(input))
    }

    /// Build a handler from in-memory series; used by tests, benches, and
    /// the synthetic generator.
    pub fn from_series(input: BTreeMap<String, Vec<RateObservation>>) -> Self {
        let aligned = align_forward_fill(input);
        let bar_count = aligned.timestamps.len();
        let tokens: Vec<String> = aligned.series.keys().cloned().collect();
        Self {
            tokens,
            series: aligned.series,
            cursor: 0,
            bar_count,
            continue_backtest: true,
        }
    }

    /// Total bars in the aligned replay.
    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Timestamp of the first aligned bar.
    pub fn first_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.series
            .values()
            .next()
            .and_then(|series| series.first())
            .map(|obs| obs.timestamp)
    }

    /// Bars revealed so far.
    pub fn bars_seen(&self) -> usize {
        self.cursor
    }
}

impl RateView for HistoricCsvDataHandler {
    fn token_list(&self) -> &[String] {
        &self.tokens
    }

    fn get_latest_rates(&self, token: &str, n: usize) -> &[RateObservation] {
        match self.series.get(token) {
            Some(series) => {
                let end = self.cursor;
                &series[end.saturating_sub(n)..end]
            }
            None => {
                warn!(token, "requested rates for unknown token");
                &[]
            }
        }
    }
}

impl DataHandler for HistoricCsvDataHandler {
    fn continue_backtest(&self) -> bool {
        self.continue_backtest
    }

    fn update_rates(&mut self, queue: &mut EventQueue) {
        if self.cursor >= self.bar_count {
            self.continue_backtest = false;
            return;
        }
        self.cursor += 1;
        queue.push(Event::Market);
    }
}
