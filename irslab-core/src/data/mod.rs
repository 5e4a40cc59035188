//! Data layer: CSV ingestion, timestamp alignment, the replay handler,
//! the Dune Analytics fetcher, and synthetic series for tests/benches.

pub mod align;
pub mod csv_source;
pub mod dune;
pub mod handler;
pub mod synthetic;

pub use align::{align_forward_fill, AlignedRates};
pub use csv_source::{load_token_csv, CsvSourceOptions};
pub use dune::DuneClient;
pub use handler::{DataHandler, HistoricCsvDataHandler, RateView};

use thiserror::Error;

/// Structured errors for data operations.
///
/// Displayable in CLI context; recoverable conditions inside the replay
/// (an unknown token) are handled by logging, never by these errors.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("unparseable timestamp '{value}' in {path}")]
    Timestamp { path: String, value: String },

    #[error("liquidity index '{value}' in {path} is not a positive number")]
    LiquidityIndex { path: String, value: String },

    #[error("no observations for token '{0}' in the requested date range")]
    EmptySeries(String),

    #[error("dune api request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dune api response has no result rows")]
    DuneEmptyResult,

    #[error("dune api row missing column '{0}'")]
    DuneMissingColumn(String),
}
