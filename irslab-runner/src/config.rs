//! Serializable backtest configuration.
//!
//! A config captures everything needed to reproduce a run: dataset
//! location, token universe, date range, sizing, fees, and the strategy
//! with its parameters. Two identical configs hash to the same run id.

use chrono::{DateTime, Utc};
use irslab_core::portfolio::ExitPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    /// Directory holding `<token>.csv` datasets.
    pub data_dir: PathBuf,

    /// Tokens to replay.
    pub tokens: Vec<String>,

    /// Replay start (inclusive). Unset means the beginning of the data.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,

    /// Replay end (inclusive). Unset means the end of the data.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,

    /// Notional / margin ratio.
    #[serde(default = "default_leverage")]
    pub leverage: f64,

    /// Margin posted per order, and the starting cash.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,

    /// Flat fee per fill, paid to the pool's liquidity providers.
    #[serde(default)]
    pub fee: f64,

    /// What an exit signal does at the portfolio.
    #[serde(default)]
    pub exit_policy: ExitPolicy,

    /// Collapse datasets to one bar per calendar day.
    #[serde(default = "default_resample_daily")]
    pub resample_daily: bool,

    pub strategy: StrategyConfig,
}

fn default_leverage() -> f64 {
    1.0
}

fn default_initial_capital() -> f64 {
    1.0
}

fn default_resample_daily() -> bool {
    true
}

/// Strategy selection with per-strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Go long the variable leg once per token and hold.
    LongRate,

    /// Long/short momentum over pool APYs.
    Momentum {
        #[serde(default = "default_trend_lookback")]
        trend_lookback: usize,
        #[serde(default = "default_apy_lookback")]
        apy_lookback: usize,
        #[serde(default = "default_buffer")]
        buffer: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default)]
        trade_trend: bool,
    },

    /// Pairs arbitrage on the APY ratio of two tokens.
    StatArbPairs {
        /// The two legs; defaults to the first two configured tokens.
        #[serde(default)]
        pair: Option<(String, String)>,
        #[serde(default = "default_lookback_window")]
        lookback_window: usize,
        #[serde(default = "default_apy_lookback")]
        apy_lookback: usize,
        #[serde(default = "default_deviations")]
        deviations: f64,
    },
}

fn default_trend_lookback() -> usize {
    15
}

fn default_apy_lookback() -> usize {
    5
}

fn default_buffer() -> f64 {
    1.0
}

fn default_alpha() -> f64 {
    0.8
}

fn default_lookback_window() -> usize {
    30
}

fn default_deviations() -> f64 {
    1.0
}

impl BacktestConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let label = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: label.clone(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: label,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.is_empty() {
            return Err(ConfigError::Invalid("no tokens configured".to_string()));
        }
        if !(self.leverage >= 0.0 && self.leverage.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "leverage must be a non-negative number, got {}",
                self.leverage
            )));
        }
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "initial capital must be a positive number, got {}",
                self.initial_capital
            )));
        }
        if !(self.fee >= 0.0 && self.fee.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "fee must be a non-negative number, got {}",
                self.fee
            )));
        }
        if let StrategyConfig::StatArbPairs { pair: None, .. } = &self.strategy {
            if self.tokens.len() < 2 {
                return Err(ConfigError::Invalid(
                    "the pairs strategy needs two tokens".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The two legs of the pairs strategy, when one is configured.
    pub fn resolved_pair(&self) -> Option<(String, String)> {
        match &self.strategy {
            StrategyConfig::StatArbPairs { pair: Some(pair), .. } => Some(pair.clone()),
            StrategyConfig::StatArbPairs { pair: None, .. } => {
                if self.tokens.len() >= 2 {
                    Some((self.tokens[0].clone(), self.tokens[1].clone()))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Deterministic hash id for this configuration.
    ///
    /// Canonical JSON serialization keeps key order stable, so two runs
    /// with identical configs share a `RunId`.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
