//! Swap positions and their mark-to-model valuation.

use super::event::Side;
use crate::apy::SECONDS_PER_YEAR;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open interest-rate-swap position.
///
/// Positions are immutable once created and never removed: an exit is
/// modeled by adding an offsetting position, so net exposure is the
/// algebraic sum of all positions' signed contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapPosition {
    /// Swap inception — the fill timestamp.
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub notional: f64,
    pub margin: f64,
    /// Fixed leg agreed at inception (annualized).
    pub fixed_rate: f64,
    /// Liquidity index at inception; the variable leg accrues against it.
    pub starting_rate_value: f64,
    pub fee: f64,
}

impl SwapPosition {
    /// Accrued swap cashflow since inception, marked at `now` against the
    /// current liquidity index.
    ///
    /// Variable-leg accrual is the linear index ratio (no compounding);
    /// fixed-leg accrual is `fixed_rate` scaled by the elapsed fraction of
    /// a 365-day year. The result is negated for the fixed taker.
    pub fn cashflow(&self, now: DateTime<Utc>, liquidity_index: f64) -> f64 {
        let variable = liquidity_index / self.starting_rate_value - 1.0;
        let elapsed = (now - self.timestamp).num_seconds() as f64;
        let fixed = self.fixed_rate * elapsed / SECONDS_PER_YEAR;
        self.side.sign() * self.notional * (variable - fixed)
    }

    /// Mark-to-model value: posted margin returned in full plus accrued
    /// cashflow. Margin is never haircut or liquidated in this model.
    pub fn value(&self, now: DateTime<Utc>, liquidity_index: f64) -> f64 {
        self.margin + self.cashflow(now, liquidity_index)
    }
}
