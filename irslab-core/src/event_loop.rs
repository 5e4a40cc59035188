//! The event loop — scheduling only, no business logic.
//!
//! Outer loop: pull one bar from the data handler while it has data.
//! Inner loop: drain the queue to empty in strict FIFO order, dispatching
//! each event to its component. Everything is single-threaded and
//! synchronous; each event is processed to completion before the next is
//! dequeued, and causally-derived events join the tail of the queue.
//! Signals raised by one bar therefore cascade all the way to fills
//! before the next bar is pulled.

use crate::data::DataHandler;
use crate::domain::{Event, EventQueue};
use crate::execution::ExecutionHandler;
use crate::portfolio::{Portfolio, PortfolioError};
use crate::strategies::Strategy;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),
}

/// Owns the queue and the four components of one backtest.
pub struct EventLoop<D, S, P, X> {
    queue: EventQueue,
    data: D,
    strategy: S,
    portfolio: P,
    execution: X,
}

impl<D, S, P, X> EventLoop<D, S, P, X>
where
    D: DataHandler,
    S: Strategy,
    P: Portfolio,
    X: ExecutionHandler,
{
    pub fn new(queue: EventQueue, data: D, strategy: S, portfolio: P, execution: X) -> Self {
        Self {
            queue,
            data,
            strategy,
            portfolio,
            execution,
        }
    }

    /// Replay until the data handler is exhausted — the only termination
    /// condition. Each advance is drained to empty before the next.
    pub fn run(&mut self) -> Result<(), EngineError> {
        while self.data.continue_backtest() {
            self.data.update_rates(&mut self.queue);
            self.drain()?;
        }
        Ok(())
    }

    /// Process queued events in FIFO order until none remain.
    ///
    /// On a `Market` event the strategy computes signals first, then the
    /// bar's holdings snapshot is taken; the signal→order→fill cascade
    /// drains afterwards in this same pass, so its cash effects surface
    /// in the next bar's snapshot. The `match` is exhaustive: a new event
    /// variant without a dispatch arm fails to compile instead of being
    /// silently dropped.
    pub fn drain(&mut self) -> Result<(), EngineError> {
        while let Some(event) = self.queue.pop() {
            match event {
                Event::Market => {
                    self.strategy.calculate_signals(&self.data, &mut self.queue);
                    self.portfolio.update_timeindex(&self.data);
                }
                Event::Signal(signal) => {
                    self.portfolio.update_signal(&signal, &mut self.queue)
                }
                Event::Order(order) => self.execution.execute_order(&order, &mut self.queue),
                Event::Fill(fill) => self.portfolio.update_fill(&fill, &self.data)?,
            }
        }
        Ok(())
    }

    /// Direct queue access for driving `drain()` in isolation.
    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn portfolio(&self) -> &P {
        &self.portfolio
    }

    pub fn into_portfolio(self) -> P {
        self.portfolio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{HistoricCsvDataHandler, RateView};
    use crate::domain::{Direction, RateObservation, SignalEvent};
    use crate::execution::SimulatedExecutionHandler;
    use crate::portfolio::{NaivePortfolio, NaivePortfolioConfig};
    use crate::strategies::LongRateStrategy;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap()
    }

    fn handler(indices: &[f64]) -> HistoricCsvDataHandler {
        let series: Vec<RateObservation> = indices
            .iter()
            .enumerate()
            .map(|(i, &idx)| RateObservation::new(start() + Duration::days(i as i64), idx))
            .collect();
        let mut input = BTreeMap::new();
        input.insert("aave_usdc".to_string(), series);
        HistoricCsvDataHandler::from_series(input)
    }

    fn event_loop(
        indices: &[f64],
    ) -> EventLoop<
        HistoricCsvDataHandler,
        LongRateStrategy,
        NaivePortfolio,
        SimulatedExecutionHandler,
    > {
        let data = handler(indices);
        let portfolio = NaivePortfolio::new(
            start(),
            &["aave_usdc".to_string()],
            NaivePortfolioConfig::default(),
        );
        EventLoop::new(
            EventQueue::new(),
            data,
            LongRateStrategy::new(),
            portfolio,
            SimulatedExecutionHandler::new(),
        )
    }

    #[test]
    fn run_consumes_every_bar_and_terminates() {
        let mut event_loop = event_loop(&[1e27, 1e27, 1e27, 1e27]);
        event_loop.run().unwrap();

        assert!(!event_loop.data().continue_backtest());
        // Seed snapshot plus one per bar.
        assert_eq!(event_loop.portfolio().all_holdings().len(), 5);
    }

    #[test]
    fn flat_rates_hold_the_equity_curve_at_one() {
        let mut event_loop = event_loop(&[1e27, 1e27, 1e27, 1e27]);
        event_loop.run().unwrap();

        let portfolio = event_loop.into_portfolio();
        let curve = portfolio.equity_curve();
        // With a constant index, the long position accrues nothing on
        // either leg: the final equity value is exactly 1.0.
        assert_eq!(curve.last().unwrap().equity, 1.0);
    }

    #[test]
    fn signals_cascade_to_fills_within_one_pass() {
        let mut event_loop = event_loop(&[1e27, 1.0001e27, 1.0002e27]);
        event_loop.run().unwrap();

        let portfolio = event_loop.portfolio();
        // The long-rate strategy fires once, on the first priceable bar.
        assert_eq!(portfolio.positions("aave_usdc").len(), 1);
        assert_eq!(portfolio.all_holdings().len(), 4);
    }

    #[test]
    fn fill_effects_surface_in_the_next_bars_snapshot() {
        let mut event_loop = event_loop(&[1e27, 1.0001e27, 1.0002e27]);
        event_loop.run().unwrap();

        let holdings = event_loop.portfolio().all_holdings();
        // Bar 2's snapshot is taken before its signal cascades: cash is
        // still whole there, and committed from bar 3 on.
        assert_eq!(holdings[2].cash, 1.0);
        assert_eq!(holdings[2].token_values["aave_usdc"], 0.0);
        assert_eq!(holdings[3].cash, 0.0);
        assert!(holdings[3].token_values["aave_usdc"] > 0.0);
    }

    #[test]
    fn drain_runs_standalone_for_injected_events() {
        let mut event_loop = event_loop(&[1e27, 1.0001e27]);
        // Reveal two bars by hand without draining.
        event_loop.data.update_rates(&mut event_loop.queue);
        event_loop.data.update_rates(&mut event_loop.queue);
        while event_loop.queue.pop().is_some() {}

        let timestamp = event_loop.data().latest("aave_usdc").unwrap().timestamp;
        event_loop.queue_mut().push(Event::Signal(SignalEvent {
            token: "aave_usdc".into(),
            direction: Direction::Short,
            timestamp,
        }));
        event_loop.drain().unwrap();

        let positions = event_loop.portfolio().positions("aave_usdc");
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, crate::domain::Side::Short);
    }

    #[test]
    fn fill_error_aborts_the_drain() {
        let mut event_loop = event_loop(&[1e27, 1.0001e27]);
        // One bar revealed: a fill cannot be priced yet.
        event_loop.data.update_rates(&mut event_loop.queue);
        while event_loop.queue.pop().is_some() {}

        event_loop.queue_mut().push(Event::Fill(crate::domain::FillEvent {
            token: "aave_usdc".into(),
            side: crate::domain::Side::Long,
            timestamp: start(),
            notional: 1.0,
            margin: 1.0,
            fee: 0.0,
        }));
        let err = event_loop.drain().unwrap_err();
        assert!(matches!(err, EngineError::Portfolio(_)));
    }
}
