//! The naive portfolio: constant sizing, margin-tracking cash accounting,
//! and per-bar mark-to-model snapshots.

use super::{ExitPolicy, Portfolio, PortfolioError};
use crate::apy::annualize;
use crate::data::RateView;
use crate::domain::{
    Event, EventQueue, FillEvent, HoldingsSnapshot, OrderEvent, PositionsSnapshot, Side,
    SignalEvent, SwapPosition,
};
use crate::performance::{EquityPoint, SummaryStats};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Sizing and exit configuration.
///
/// Sizing is a pure function of this configuration, never of market
/// state: every order carries `notional = initial_capital * leverage`
/// and `margin = initial_capital`.
#[derive(Debug, Clone)]
pub struct NaivePortfolioConfig {
    pub initial_capital: f64,
    pub leverage: f64,
    pub exit_policy: ExitPolicy,
}

impl Default for NaivePortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1.0,
            leverage: 1.0,
            exit_policy: ExitPolicy::default(),
        }
    }
}

/// Positions, holdings, and their per-bar time series.
///
/// Positions are append-only: an exit adds an offsetting position rather
/// than removing one, so net exposure is the signed sum over the list.
/// The time series (`all_holdings`, `all_positions`) get one immutable
/// entry per bar and are never rewritten.
pub struct NaivePortfolio {
    config: NaivePortfolioConfig,
    cash: f64,
    cum_fee: f64,
    total: f64,
    current_positions: BTreeMap<String, Vec<SwapPosition>>,
    all_holdings: Vec<HoldingsSnapshot>,
    all_positions: Vec<PositionsSnapshot>,
}

impl NaivePortfolio {
    /// Seed the time series with an initial snapshot at `start`: all cash,
    /// no positions, zero value per token.
    pub fn new(start: DateTime<Utc>, tokens: &[String], config: NaivePortfolioConfig) -> Self {
        let capital = config.initial_capital;
        let mut token_values = BTreeMap::new();
        let mut positions = BTreeMap::new();
        for token in tokens {
            token_values.insert(token.clone(), 0.0);
            positions.insert(token.clone(), Vec::new());
        }

        Self {
            config,
            cash: capital,
            cum_fee: 0.0,
            total: capital,
            current_positions: positions.clone(),
            all_holdings: vec![HoldingsSnapshot {
                timestamp: start,
                cash: capital,
                fee: 0.0,
                total: capital,
                token_values,
            }],
            all_positions: vec![PositionsSnapshot {
                timestamp: start,
                positions,
            }],
        }
    }

    /// Signed sum of open notionals: positive when net long.
    fn net_notional(&self, token: &str) -> f64 {
        self.current_positions
            .get(token)
            .map(|positions| {
                positions
                    .iter()
                    .map(|p| p.side.sign() * p.notional)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn fees_paid(&self) -> f64 {
        self.cum_fee
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn positions(&self, token: &str) -> &[SwapPosition] {
        self.current_positions
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_holdings(&self) -> &[HoldingsSnapshot] {
        &self.all_holdings
    }

    pub fn all_positions(&self) -> &[PositionsSnapshot] {
        &self.all_positions
    }

    /// Derive bar-over-bar returns and the cumulative-product equity
    /// curve (starting at 1.0) from the holdings totals.
    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        let mut curve = Vec::with_capacity(self.all_holdings.len());
        let mut equity = 1.0;
        let mut prev_total: Option<f64> = None;
        for snapshot in &self.all_holdings {
            let returns = match prev_total {
                Some(prev) if prev != 0.0 => snapshot.total / prev - 1.0,
                _ => 0.0,
            };
            equity *= 1.0 + returns;
            curve.push(EquityPoint {
                timestamp: snapshot.timestamp,
                total: snapshot.total,
                returns,
                equity,
            });
            prev_total = Some(snapshot.total);
        }
        curve
    }

    /// Sharpe and max-drawdown-with-duration over the equity curve.
    pub fn summary_stats(&self) -> SummaryStats {
        SummaryStats::from_equity_curve(&self.equity_curve())
    }

    /// The side an exit signal should trade, under the configured policy.
    fn exit_side(&self, signal: &SignalEvent) -> Option<Side> {
        match self.config.exit_policy {
            ExitPolicy::DropExposure => {
                debug!(token = %signal.token, "exit signal dropped by policy");
                None
            }
            ExitPolicy::OffsettingOrder => {
                let net = self.net_notional(&signal.token);
                if net > 0.0 {
                    Some(Side::Short)
                } else if net < 0.0 {
                    Some(Side::Long)
                } else {
                    debug!(token = %signal.token, "exit signal with a flat book, no order");
                    None
                }
            }
        }
    }
}

impl Portfolio for NaivePortfolio {
    fn update_signal(&mut self, signal: &SignalEvent, queue: &mut EventQueue) {
        let side = match signal.direction.as_side() {
            Some(side) => Some(side),
            None => self.exit_side(signal),
        };
        if let Some(side) = side {
            queue.push(Event::Order(OrderEvent {
                token: signal.token.clone(),
                side,
                timestamp: signal.timestamp,
                notional: self.config.initial_capital * self.config.leverage,
                margin: self.config.initial_capital,
            }));
        }
    }

    fn update_fill(
        &mut self,
        fill: &FillEvent,
        rates: &dyn RateView,
    ) -> Result<(), PortfolioError> {
        // Price discovery: the new position's fixed leg is whatever the
        // floating rate implied by the last two bars annualizes to.
        let recent = rates.get_latest_rates(&fill.token, 2);
        let [prev, latest] = recent else {
            return Err(PortfolioError::InsufficientRateHistory {
                token: fill.token.clone(),
            });
        };
        let period_rate = latest.liquidity_index / prev.liquidity_index - 1.0;
        let elapsed = (latest.timestamp - prev.timestamp).num_seconds() as f64;
        let fixed_rate = annualize(period_rate, elapsed);

        self.current_positions
            .entry(fill.token.clone())
            .or_default()
            .push(SwapPosition {
                timestamp: fill.timestamp,
                side: fill.side,
                notional: fill.notional,
                margin: fill.margin,
                fixed_rate,
                starting_rate_value: latest.liquidity_index,
                fee: fill.fee,
            });

        // Margin-tracking accounting: fee and posted margin both leave
        // cash (and total) in this same step; margin comes back through
        // the position's mark-to-model value at the next timeindex.
        self.cash -= fill.fee + fill.margin;
        self.total -= fill.fee + fill.margin;
        self.cum_fee += fill.fee;
        Ok(())
    }

    fn update_timeindex(&mut self, rates: &dyn RateView) {
        let mut timestamp: Option<DateTime<Utc>> = None;
        for token in rates.token_list() {
            if let Some(obs) = rates.latest(token) {
                timestamp = Some(match timestamp {
                    Some(ts) => ts.max(obs.timestamp),
                    None => obs.timestamp,
                });
            }
        }
        let Some(timestamp) = timestamp else {
            debug!("timeindex update before any observation; nothing to snapshot");
            return;
        };

        let mut token_values = BTreeMap::new();
        let mut value_sum = 0.0;
        for token in rates.token_list() {
            let value = match rates.latest(token) {
                Some(obs) => self
                    .current_positions
                    .get(token)
                    .map(|positions| {
                        positions
                            .iter()
                            .map(|p| p.value(obs.timestamp, obs.liquidity_index))
                            .sum()
                    })
                    .unwrap_or(0.0),
                None => 0.0,
            };
            token_values.insert(token.clone(), value);
            value_sum += value;
        }

        self.total = self.cash + value_sum;
        self.all_holdings.push(HoldingsSnapshot {
            timestamp,
            cash: self.cash,
            fee: self.cum_fee,
            total: self.total,
            token_values,
        });
        self.all_positions.push(PositionsSnapshot {
            timestamp,
            positions: self.current_positions.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HistoricCsvDataHandler;
    use crate::domain::{Direction, RateObservation};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap()
    }

    /// A one-token handler with `bars` bars revealed.
    fn revealed_handler(indices: &[f64], bars: usize) -> HistoricCsvDataHandler {
        let series: Vec<RateObservation> = indices
            .iter()
            .enumerate()
            .map(|(i, &idx)| RateObservation::new(start() + Duration::days(i as i64), idx))
            .collect();
        let mut input = BTreeMap::new();
        input.insert("aave_usdc".to_string(), series);
        let mut handler = HistoricCsvDataHandler::from_series(input);
        let mut queue = EventQueue::new();
        for _ in 0..bars {
            crate::data::DataHandler::update_rates(&mut handler, &mut queue);
        }
        handler
    }

    fn portfolio(capital: f64, leverage: f64) -> NaivePortfolio {
        NaivePortfolio::new(
            start(),
            &["aave_usdc".to_string()],
            NaivePortfolioConfig {
                initial_capital: capital,
                leverage,
                exit_policy: ExitPolicy::OffsettingOrder,
            },
        )
    }

    fn fill(side: Side, notional: f64, margin: f64, fee: f64) -> FillEvent {
        FillEvent {
            token: "aave_usdc".into(),
            side,
            timestamp: start() + Duration::days(1),
            notional,
            margin,
            fee,
        }
    }

    #[test]
    fn signal_becomes_one_constant_sized_order() {
        let mut portfolio = portfolio(1000.0, 10.0);
        let mut queue = EventQueue::new();
        portfolio.update_signal(
            &SignalEvent {
                token: "aave_usdc".into(),
                direction: Direction::Long,
                timestamp: start(),
            },
            &mut queue,
        );

        assert_eq!(queue.len(), 1);
        match queue.pop() {
            Some(Event::Order(order)) => {
                assert_eq!(order.side, Side::Long);
                assert_eq!(order.notional, 10_000.0);
                assert_eq!(order.margin, 1000.0);
            }
            other => panic!("expected order, got {other:?}"),
        }
    }

    #[test]
    fn fill_deducts_fee_and_margin_from_cash_and_total() {
        let rates = revealed_handler(&[1e27, 1.0001e27], 2);
        let mut portfolio = portfolio(1000.0, 1.0);

        portfolio
            .update_fill(&fill(Side::Long, 1000.0, 100.0, 10.0), &rates)
            .unwrap();

        assert_eq!(portfolio.cash(), 890.0);
        assert_eq!(portfolio.total(), 890.0);
        assert_eq!(portfolio.fees_paid(), 10.0);
        assert_eq!(portfolio.positions("aave_usdc").len(), 1);
    }

    #[test]
    fn fill_prices_the_fixed_leg_from_the_last_two_bars() {
        let rates = revealed_handler(&[1e27, 1.0001e27], 2);
        let mut portfolio = portfolio(1000.0, 1.0);
        portfolio
            .update_fill(&fill(Side::Long, 1000.0, 100.0, 0.0), &rates)
            .unwrap();

        let position = &portfolio.positions("aave_usdc")[0];
        let expected = annualize(1.0001e27 / 1e27 - 1.0, 86400.0);
        assert_eq!(position.fixed_rate, expected);
        assert_eq!(position.starting_rate_value, 1.0001e27);
    }

    #[test]
    fn fill_without_two_observations_fails_fast() {
        let rates = revealed_handler(&[1e27, 1.0001e27], 1);
        let mut portfolio = portfolio(1000.0, 1.0);
        let err = portfolio
            .update_fill(&fill(Side::Long, 1000.0, 100.0, 0.0), &rates)
            .unwrap_err();
        assert!(matches!(
            err,
            PortfolioError::InsufficientRateHistory { .. }
        ));
    }

    #[test]
    fn timeindex_snapshot_satisfies_the_holdings_invariant() {
        let rates = revealed_handler(&[1e27, 1.0001e27, 1.0003e27], 2);
        let mut portfolio = portfolio(1000.0, 1.0);
        portfolio
            .update_fill(&fill(Side::Long, 1000.0, 100.0, 10.0), &rates)
            .unwrap();
        portfolio.update_timeindex(&rates);

        let snapshot = portfolio.all_holdings().last().unwrap();
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.cash, 890.0);
        assert_eq!(snapshot.fee, 10.0);
        // The freshly opened position marks at exactly its margin: zero
        // elapsed time and an unchanged index accrue nothing.
        assert_eq!(snapshot.token_values["aave_usdc"], 100.0);
        assert_eq!(snapshot.total, 990.0);
    }

    #[test]
    fn exit_signal_offsets_the_net_exposure() {
        let rates = revealed_handler(&[1e27, 1.0001e27], 2);
        let mut portfolio = portfolio(1000.0, 1.0);
        portfolio
            .update_fill(&fill(Side::Long, 1000.0, 1000.0, 0.0), &rates)
            .unwrap();

        let mut queue = EventQueue::new();
        portfolio.update_signal(
            &SignalEvent {
                token: "aave_usdc".into(),
                direction: Direction::Exit,
                timestamp: start() + Duration::days(1),
            },
            &mut queue,
        );

        match queue.pop() {
            Some(Event::Order(order)) => assert_eq!(order.side, Side::Short),
            other => panic!("expected offsetting order, got {other:?}"),
        }
    }

    #[test]
    fn exit_signal_on_a_flat_book_is_a_no_op() {
        let mut portfolio = portfolio(1000.0, 1.0);
        let mut queue = EventQueue::new();
        portfolio.update_signal(
            &SignalEvent {
                token: "aave_usdc".into(),
                direction: Direction::Exit,
                timestamp: start(),
            },
            &mut queue,
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn exit_policy_drop_exposure_never_orders() {
        let rates = revealed_handler(&[1e27, 1.0001e27], 2);
        let mut portfolio = NaivePortfolio::new(
            start(),
            &["aave_usdc".to_string()],
            NaivePortfolioConfig {
                initial_capital: 1000.0,
                leverage: 1.0,
                exit_policy: ExitPolicy::DropExposure,
            },
        );
        portfolio
            .update_fill(&fill(Side::Long, 1000.0, 1000.0, 0.0), &rates)
            .unwrap();

        let mut queue = EventQueue::new();
        portfolio.update_signal(
            &SignalEvent {
                token: "aave_usdc".into(),
                direction: Direction::Exit,
                timestamp: start() + Duration::days(1),
            },
            &mut queue,
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn equity_curve_starts_at_one_and_compounds_returns() {
        let rates = revealed_handler(&[1e27, 1.0001e27, 1.0003e27], 3);
        let mut portfolio = portfolio(1000.0, 1.0);
        portfolio.update_timeindex(&rates);
        portfolio.update_timeindex(&rates);

        let curve = portfolio.equity_curve();
        assert_eq!(curve.len(), 3); // seed + two snapshots
        assert_eq!(curve[0].equity, 1.0);
        assert_eq!(curve[0].returns, 0.0);
        // No positions: totals never move, equity pins at 1.0.
        assert!(curve.iter().all(|p| p.equity == 1.0));
    }

    #[test]
    fn short_position_loses_when_rates_rally() {
        // Fixed leg locks in the 0.01%/day pace of the first two bars;
        // the next bar realizes 0.04%, so the fixed taker pays the gap.
        let mut rates = revealed_handler(&[1e27, 1.0001e27, 1.0005e27], 2);
        let mut portfolio = portfolio(1000.0, 1.0);
        portfolio
            .update_fill(&fill(Side::Short, 1000.0, 1000.0, 0.0), &rates)
            .unwrap();

        let mut queue = EventQueue::new();
        crate::data::DataHandler::update_rates(&mut rates, &mut queue);
        portfolio.update_timeindex(&rates);

        let snapshot = portfolio.all_holdings().last().unwrap();
        assert!(snapshot.is_consistent());
        assert!(
            snapshot.token_values["aave_usdc"] < 1000.0,
            "short should mark below its margin in a rate rally, got {}",
            snapshot.token_values["aave_usdc"]
        );
    }
}
