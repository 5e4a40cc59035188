//! Per-bar snapshots of portfolio state.
//!
//! Snapshots are immutable records appended to a growable series, one per
//! bar; a past snapshot is never rewritten.

use super::position::SwapPosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Holdings at the end of one bar.
///
/// Invariant: `total == cash + Σ token_values`, exactly. `token_values`
/// holds the mark-to-model value of each token's open positions
/// (posted margin plus accrued cashflow). `fee` is cumulative.
///
/// `BTreeMap` keeps token iteration deterministic, so sums are
/// bit-reproducible across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub fee: f64,
    pub total: f64,
    pub token_values: BTreeMap<String, f64>,
}

impl HoldingsSnapshot {
    /// Exact check of the holdings invariant, summing token values in
    /// deterministic (sorted-key) order.
    pub fn is_consistent(&self) -> bool {
        let sum: f64 = self.token_values.values().sum();
        self.total == self.cash + sum
    }
}

/// Open positions at the end of one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub positions: BTreeMap<String, Vec<SwapPosition>>,
}
