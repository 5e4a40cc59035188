//! Performance metrics — pure functions over the equity curve.
//!
//! Equity curve and/or return series in, scalars out. No dependency on
//! the engine or the portfolio.

use crate::stats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Annualization basis for the Sharpe ratio: one bar per day.
pub const PERIODS_PER_YEAR: f64 = 365.0;

/// One bar of the derived equity curve.
///
/// `returns` is the bar-over-bar percentage change of the holdings total;
/// `equity` is the cumulative product of `1 + returns`, starting at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub total: f64,
    pub returns: f64,
    pub equity: f64,
}

/// The two summary scalars reported for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub sharpe: f64,
    pub max_drawdown: f64,
    /// Longest stretch of bars spent below the running equity peak.
    pub drawdown_duration: usize,
}

impl SummaryStats {
    pub fn from_equity_curve(curve: &[EquityPoint]) -> Self {
        // The seed point's return is a placeholder zero, not a realized
        // bar-over-bar change; skip it.
        let returns: Vec<f64> = curve.iter().skip(1).map(|p| p.returns).collect();
        let equity: Vec<f64> = curve.iter().map(|p| p.equity).collect();
        let (max_drawdown, drawdown_duration) = drawdowns(&equity);
        Self {
            sharpe: sharpe_ratio(&returns, PERIODS_PER_YEAR),
            max_drawdown,
            drawdown_duration,
        }
    }
}

/// Annualized Sharpe ratio: `mean / std * sqrt(periods)`, with the
/// population standard deviation (divide by n) and a zero benchmark.
/// Returns 0.0 for fewer than two bars or zero variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = stats::population_std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    periods_per_year.sqrt() * stats::mean(returns) / std
}

/// Maximum drawdown (as a positive drop from the running high-water mark,
/// in equity units) and its duration in bars.
///
/// The high-water mark starts at zero and the scan begins at the second
/// element; duration counts consecutive bars strictly below the mark.
pub fn drawdowns(equity_curve: &[f64]) -> (f64, usize) {
    if equity_curve.len() < 2 {
        return (0.0, 0);
    }
    let mut hwm = 0.0f64;
    let mut max_drawdown = 0.0f64;
    let mut duration = 0usize;
    let mut max_duration = 0usize;

    for &equity in &equity_curve[1..] {
        hwm = hwm.max(equity);
        let drawdown = hwm - equity;
        duration = if drawdown == 0.0 { 0 } else { duration + 1 };
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
        if duration > max_duration {
            max_duration = duration;
        }
    }
    (max_drawdown, max_duration)
}
