//! Time-series momentum over pool APYs.
//!
//! Converts the lookback window of liquidity indices to APYs, then trades
//! either the rate level against its smoothed history (mean-reversion) or
//! the fitted trend of the series (trend-following).

use super::{emit_transition, Intent, Strategy};
use crate::apy::apy_series;
use crate::data::RateView;
use crate::domain::EventQueue;
use crate::stats;
use std::collections::HashMap;

/// Dead zone for the fitted slope in trend mode.
const SLOPE_BUFFER: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct MomentumConfig {
    /// Observations of rate history fed into the APY conversion.
    pub trend_lookback: usize,
    /// How many steps back each APY's period rate reaches.
    pub apy_lookback: usize,
    /// Band width in units of the smoothed series' standard error.
    pub buffer: f64,
    /// EWMA smoothing factor.
    pub alpha: f64,
    /// Trade the fitted APY trend instead of the rate level.
    pub trade_trend: bool,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            trend_lookback: 15,
            apy_lookback: 5,
            buffer: 1.0,
            alpha: 0.8,
            trade_trend: false,
        }
    }
}

/// Long/short momentum with per-token intended-position tracking.
#[derive(Debug, Default)]
pub struct LongShortMomentumStrategy {
    config: MomentumConfig,
    intents: HashMap<String, Intent>,
}

impl LongShortMomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        Self {
            config,
            intents: HashMap::new(),
        }
    }

    /// Rate mode: where does the latest APY sit against the smoothed
    /// history band? Above the band means rates look rich — take the
    /// fixed side and wait for reversion; below means the mirror.
    fn rate_intent(&self, apys: &[f64]) -> Intent {
        let (window, latest) = match apys.split_last() {
            Some((latest, window)) if !window.is_empty() => (window, *latest),
            _ => return Intent::Flat,
        };
        let smoothed = stats::ewma(window, self.config.alpha);
        let center = stats::mean(&smoothed);
        let band = self.config.buffer * stats::population_std_dev(&smoothed)
            / (window.len() as f64).sqrt();
        if latest > center + band {
            Intent::Short
        } else if latest < center - band {
            Intent::Long
        } else {
            Intent::Flat
        }
    }

    /// Trend mode: ride the fitted slope of the APY series.
    fn trend_intent(&self, apys: &[f64]) -> Intent {
        let slope = stats::ols_slope(apys);
        if slope > SLOPE_BUFFER {
            Intent::Long
        } else if slope < -SLOPE_BUFFER {
            Intent::Short
        } else {
            Intent::Flat
        }
    }
}

impl Strategy for LongShortMomentumStrategy {
    fn calculate_signals(&mut self, rates: &dyn RateView, queue: &mut EventQueue) {
        for token in rates.token_list() {
            let observations = rates.get_latest_rates(token, self.config.trend_lookback);
            let Some(latest) = observations.last() else {
                continue;
            };
            let apys: Vec<f64> = apy_series(observations, self.config.apy_lookback)
                .into_iter()
                .filter(|apy| apy.is_finite())
                .collect();
            if apys.len() < 2 {
                continue;
            }

            let next = if self.config.trade_trend {
                self.trend_intent(&apys)
            } else {
                self.rate_intent(&apys)
            };
            let prior = self.intents.get(token).copied().unwrap_or_default();
            if next != prior {
                emit_transition(queue, token, latest.timestamp, prior, next);
                self.intents.insert(token.clone(), next);
            }
        }
    }
}
