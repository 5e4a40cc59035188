//! Statistical arbitrage on a pair of pools.
//!
//! Converts both legs to APYs, gates on cointegration, and trades the
//! z-score of the APY ratio: leg one rich → short it and long the other,
//! leg one cheap → the mirror. A failed cointegration check unwinds the
//! whole pair.

use super::{emit_transition, CointegrationTest, EngleGranger, Intent, Strategy};
use crate::apy::apy_series;
use crate::data::RateView;
use crate::domain::{Direction, Event, EventQueue, SignalEvent};
use crate::stats;
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StatArbConfig {
    /// Bars of rate history behind each z-score computation.
    pub lookback_window: usize,
    /// How many steps back each APY's period rate reaches.
    pub apy_lookback: usize,
    /// Band width in standard deviations of the ratio's z-score.
    pub deviations: f64,
    /// No-cointegration verdicts at or above this force an unwind.
    pub coint_p_threshold: f64,
    /// Suppress trading until this instant, so the lookback window can
    /// fill with pre-start history first.
    pub strategy_start: Option<DateTime<Utc>>,
}

impl Default for StatArbConfig {
    fn default() -> Self {
        Self {
            lookback_window: 30,
            apy_lookback: 5,
            deviations: 1.0,
            coint_p_threshold: 0.05,
            strategy_start: None,
        }
    }
}

/// Pairs strategy with a pluggable cointegration gate.
///
/// `position` tracks the first leg's intended book; the second leg always
/// mirrors it. It starts flat and resets to flat on an unwind.
pub struct StatArbPairsStrategy<C: CointegrationTest = EngleGranger> {
    config: StatArbConfig,
    pair: (String, String),
    gate: C,
    position: Intent,
}

impl StatArbPairsStrategy<EngleGranger> {
    pub fn new(pair: (String, String), config: StatArbConfig) -> Self {
        Self::with_gate(pair, config, EngleGranger)
    }
}

impl<C: CointegrationTest> StatArbPairsStrategy<C> {
    pub fn with_gate(pair: (String, String), config: StatArbConfig, gate: C) -> Self {
        Self {
            config,
            pair,
            gate,
            position: Intent::Flat,
        }
    }

    /// Unwind both legs: net out the open books, then exit — and only
    /// then reset the tracker.
    fn unwind(
        &mut self,
        queue: &mut EventQueue,
        time1: DateTime<Utc>,
        time2: DateTime<Utc>,
    ) {
        let (token1, token2) = (self.pair.0.clone(), self.pair.1.clone());
        let (net1, net2) = match self.position {
            Intent::Long => (Direction::Short, Direction::Long),
            Intent::Short => (Direction::Long, Direction::Short),
            Intent::Flat => return,
        };
        for (token, direction, timestamp) in [
            (&token1, net1, time1),
            (&token2, net2, time2),
            (&token1, Direction::Exit, time1),
            (&token2, Direction::Exit, time2),
        ] {
            queue.push(Event::Signal(SignalEvent {
                token: token.clone(),
                direction,
                timestamp,
            }));
        }
        self.position = Intent::Flat;
    }
}

impl<C: CointegrationTest> Strategy for StatArbPairsStrategy<C> {
    fn calculate_signals(&mut self, rates: &dyn RateView, queue: &mut EventQueue) {
        let window = self.config.lookback_window + 1;
        let obs1 = rates.get_latest_rates(&self.pair.0, window);
        let obs2 = rates.get_latest_rates(&self.pair.1, window);
        let (Some(last1), Some(last2)) = (obs1.last(), obs2.last()) else {
            return;
        };
        let (time1, time2) = (last1.timestamp, last2.timestamp);
        if let Some(start) = self.config.strategy_start {
            if time1 < start {
                return;
            }
        }

        let apys1: Vec<f64> = apy_series(obs1, self.config.apy_lookback)
            .into_iter()
            .filter(|apy| apy.is_finite())
            .collect();
        let apys2: Vec<f64> = apy_series(obs2, self.config.apy_lookback)
            .into_iter()
            .filter(|apy| apy.is_finite())
            .collect();
        let n = apys1.len().min(apys2.len());
        if n < 4 {
            return;
        }
        let apys1 = &apys1[apys1.len() - n..];
        let apys2 = &apys2[apys2.len() - n..];

        let p = self.gate.p_value(apys1, apys2);
        if p >= self.config.coint_p_threshold {
            debug!(p, pair = ?self.pair, "pair no longer cointegrated, unwinding");
            self.unwind(queue, time1, time2);
            return;
        }

        let ratios: Vec<f64> = apys1
            .iter()
            .zip(apys2)
            .map(|(&a, &b)| a / b)
            .filter(|r| r.is_finite())
            .collect();
        let z = stats::zscore(&ratios);
        let Some(&z_last) = z.last() else {
            return;
        };
        let upper = stats::mean(&z) + self.config.deviations * stats::std_dev(&z);
        let lower = stats::mean(&z) - self.config.deviations * stats::std_dev(&z);

        let next = if z_last > upper {
            // Leg one's rate is rich relative to leg two.
            Intent::Short
        } else if z_last < lower {
            Intent::Long
        } else {
            Intent::Flat
        };

        if next != self.position {
            emit_transition(queue, &self.pair.0, time1, self.position, next);
            emit_transition(queue, &self.pair.1, time2, self.position.mirror(), next.mirror());
            self.position = next;
        }
    }
}
