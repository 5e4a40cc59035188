//! Backtest runner — wires data, strategy, portfolio, and execution into
//! an event loop and assembles the result.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use irslab_core::data::{
    CsvSourceOptions, DataError, HistoricCsvDataHandler, RateView,
};
use irslab_core::domain::{EventQueue, HoldingsSnapshot};
use irslab_core::execution::SimulatedExecutionHandler;
use irslab_core::performance::{EquityPoint, SummaryStats};
use irslab_core::portfolio::{NaivePortfolio, NaivePortfolioConfig};
use irslab_core::strategies::{
    LongRateStrategy, LongShortMomentumStrategy, MomentumConfig, StatArbConfig,
    StatArbPairsStrategy, Strategy,
};
use irslab_core::{EngineError, EventLoop};

use crate::config::{BacktestConfig, ConfigError, StrategyConfig};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub tokens: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub initial_capital: f64,
    pub leverage: f64,
    pub bar_count: usize,
    pub equity_curve: Vec<EquityPoint>,
    pub holdings: Vec<HoldingsSnapshot>,
    pub stats: SummaryStats,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a backtest from a config: load datasets, replay to exhaustion,
/// derive the equity curve and summary stats.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;

    // The pairs strategy needs its lookback window on the books before
    // trading starts, so its data load reaches back past the configured
    // start while the strategy itself waits for it.
    let (load_start, strategy_start) = match (&config.strategy, config.start) {
        (StrategyConfig::StatArbPairs { lookback_window, .. }, Some(start)) => (
            Some(start - Duration::days(*lookback_window as i64)),
            Some(start),
        ),
        (_, start) => (start, None),
    };

    let opts = CsvSourceOptions {
        start: load_start,
        end: config.end,
        resample_daily: config.resample_daily,
    };
    let data = HistoricCsvDataHandler::new(&config.data_dir, &config.tokens, &opts)?;
    let bar_count = data.bar_count();
    let tokens = data.token_list().to_vec();
    info!(bars = bar_count, tokens = tokens.len(), "replay loaded");

    let seed_timestamp = config
        .start
        .or_else(|| data.first_timestamp())
        .expect("a non-empty replay always has a first bar");
    let portfolio = NaivePortfolio::new(
        seed_timestamp,
        &tokens,
        NaivePortfolioConfig {
            initial_capital: config.initial_capital,
            leverage: config.leverage,
            exit_policy: config.exit_policy,
        },
    );

    let strategy = build_strategy(config, strategy_start);
    let mut event_loop = EventLoop::new(
        EventQueue::new(),
        data,
        strategy,
        portfolio,
        SimulatedExecutionHandler::with_fee(config.fee),
    );
    event_loop.run()?;

    let portfolio = event_loop.into_portfolio();
    let equity_curve = portfolio.equity_curve();
    let stats = portfolio.summary_stats();
    info!(
        final_equity = equity_curve.last().map(|p| p.equity),
        sharpe = stats.sharpe,
        "replay complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        tokens,
        start: config.start,
        end: config.end,
        initial_capital: config.initial_capital,
        leverage: config.leverage,
        bar_count,
        equity_curve,
        holdings: portfolio.all_holdings().to_vec(),
        stats,
    })
}

fn build_strategy(
    config: &BacktestConfig,
    strategy_start: Option<DateTime<Utc>>,
) -> Box<dyn Strategy> {
    match &config.strategy {
        StrategyConfig::LongRate => Box::new(LongRateStrategy::new()),
        StrategyConfig::Momentum {
            trend_lookback,
            apy_lookback,
            buffer,
            alpha,
            trade_trend,
        } => Box::new(LongShortMomentumStrategy::new(MomentumConfig {
            trend_lookback: *trend_lookback,
            apy_lookback: *apy_lookback,
            buffer: *buffer,
            alpha: *alpha,
            trade_trend: *trade_trend,
        })),
        StrategyConfig::StatArbPairs {
            lookback_window,
            apy_lookback,
            deviations,
            ..
        } => {
            let pair = config
                .resolved_pair()
                .expect("validate() guarantees a pair");
            Box::new(StatArbPairsStrategy::new(
                pair,
                StatArbConfig {
                    lookback_window: *lookback_window,
                    apy_lookback: *apy_lookback,
                    deviations: *deviations,
                    coint_p_threshold: 0.05,
                    strategy_start,
                },
            ))
        }
    }
}
