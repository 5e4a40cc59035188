//! Buy-and-hold on rates: go long the variable leg once and stay.

use super::Strategy;
use crate::data::RateView;
use crate::domain::{Direction, Event, EventQueue, SignalEvent};
use std::collections::HashMap;

/// Apes into a long variable-taker position per token on the first bar
/// with two observations — the earliest a fill's fixed leg can be priced
/// — then holds to the end of the replay.
#[derive(Debug, Default)]
pub struct LongRateStrategy {
    aped: HashMap<String, bool>,
}

impl LongRateStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for LongRateStrategy {
    fn calculate_signals(&mut self, rates: &dyn RateView, queue: &mut EventQueue) {
        for token in rates.token_list() {
            let observations = rates.get_latest_rates(token, 2);
            if observations.len() < 2 {
                continue;
            }
            let Some(latest) = observations.last() else {
                continue;
            };
            let aped = self.aped.entry(token.clone()).or_insert(false);
            if !*aped {
                queue.push(Event::Signal(SignalEvent {
                    token: token.clone(),
                    direction: Direction::Long,
                    timestamp: latest.timestamp,
                }));
                *aped = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataHandler, HistoricCsvDataHandler};
    use crate::domain::RateObservation;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 11, 14, 49, 24).unwrap()
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

    #[test]
    fn waits_for_a_priceable_market() {
        let mut data = handler(&[1e27, 1.0001e27]);
        let mut strategy = LongRateStrategy::new();
        let mut queue = EventQueue::new();

        data.update_rates(&mut queue);
        queue.pop();
        strategy.calculate_signals(&data, &mut queue);
        assert!(queue.is_empty(), "one observation cannot price a fill");
    }

    #[test]
    fn apes_long_exactly_once() {
        let mut data = handler(&[1e27, 1.0001e27, 1.0002e27]);
        let mut strategy = LongRateStrategy::new();
        let mut queue = EventQueue::new();

        data.update_rates(&mut queue);
        data.update_rates(&mut queue);
        while queue.pop().is_some() {}

        strategy.calculate_signals(&data, &mut queue);
        match queue.pop() {
            Some(Event::Signal(signal)) => {
                assert_eq!(signal.token, "aave_usdc");
                assert_eq!(signal.direction, Direction::Long);
                assert_eq!(signal.timestamp, start() + Duration::days(1));
            }
            other => panic!("expected signal, got {other:?}"),
        }

        // Recalculating emits nothing: the position is already held.
        strategy.calculate_signals(&data, &mut queue);
        assert!(queue.is_empty());

        data.update_rates(&mut queue);
        queue.pop();
        strategy.calculate_signals(&data, &mut queue);
        assert!(queue.is_empty());
    }
}
