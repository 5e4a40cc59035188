//! Portfolio: position and holdings accounting.
//!
//! The portfolio owns all position/holdings state. It turns signals into
//! sized orders, fills into positions, and market updates into
//! mark-to-model holdings snapshots.

mod naive;

pub use naive::{NaivePortfolio, NaivePortfolioConfig};

use crate::data::RateView;
use crate::domain::{EventQueue, FillEvent, SignalEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What an `Exit` signal does at the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExitPolicy {
    /// Trade an offsetting order against the token's current net
    /// exposure (net long exits with a short, and vice versa).
    #[default]
    OffsettingOrder,
    /// Leave open exposure untouched; the signal is dropped.
    DropExposure,
}

#[derive(Debug, Error)]
pub enum PortfolioError {
    /// The fill-time fixed rate needs the two most recent observations;
    /// reaching a fill with fewer is a wiring bug, not a market
    /// condition, so the run aborts.
    #[error("cannot price fill for '{token}': fewer than two rate observations at fill time")]
    InsufficientRateHistory { token: String },
}

/// Position and holdings accounting over the event stream.
///
/// One conforming implementation; the trait exists so the event loop and
/// tests depend on the contract, not the concrete bookkeeping.
pub trait Portfolio {
    /// Size a signal into at most one order.
    fn update_signal(&mut self, signal: &SignalEvent, queue: &mut EventQueue);

    /// Open a position from a fill and settle its cash effects.
    fn update_fill(
        &mut self,
        fill: &FillEvent,
        rates: &dyn RateView,
    ) -> Result<(), PortfolioError>;

    /// Append the bar's holdings and positions snapshots.
    fn update_timeindex(&mut self, rates: &dyn RateView);
}
