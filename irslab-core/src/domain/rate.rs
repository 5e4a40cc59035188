//! Rate observations — the raw material of the replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of a pool's liquidity index.
///
/// The liquidity index is a monotonically non-decreasing accumulator;
/// the period yield between two observations is the ratio of their
/// indices. Observations for one token form a strictly time-ordered,
/// append-only sequence as replay progresses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub timestamp: DateTime<Utc>,
    pub liquidity_index: f64,
}

impl RateObservation {
    pub fn new(timestamp: DateTime<Utc>, liquidity_index: f64) -> Self {
        debug_assert!(liquidity_index > 0.0, "liquidity index must be positive");
        Self {
            timestamp,
            liquidity_index,
        }
    }
}
