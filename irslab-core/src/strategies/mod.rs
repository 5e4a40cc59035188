//! Strategy interface and the concrete signal generators.
//!
//! A strategy maps the current rate history into zero or more directional
//! signals. The only state a strategy owns is its per-token (or per-pair)
//! intended-position tracker, rebuilt from nothing at construction — it
//! exists to suppress duplicate signals, not to mirror the portfolio.

mod coint;
mod long_rate;
mod momentum;
mod stat_arb;

pub use coint::{CointegrationTest, EngleGranger};
pub use long_rate::LongRateStrategy;
pub use momentum::{LongShortMomentumStrategy, MomentumConfig};
pub use stat_arb::{StatArbConfig, StatArbPairsStrategy};

use crate::data::RateView;
use crate::domain::{Direction, Event, EventQueue, SignalEvent};
use chrono::{DateTime, Utc};

/// Maps a market update into signal events on the queue.
pub trait Strategy {
    /// Called once per `Market` event with the rates observed so far.
    fn calculate_signals(&mut self, rates: &dyn RateView, queue: &mut EventQueue);
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn calculate_signals(&mut self, rates: &dyn RateView, queue: &mut EventQueue) {
        (**self).calculate_signals(rates, queue)
    }
}

/// Net position a strategy currently intends to hold for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    #[default]
    Flat,
    Long,
    Short,
}

impl Intent {
    /// The opposite book: used for the second leg of a pair trade.
    pub fn mirror(self) -> Intent {
        match self {
            Intent::Flat => Intent::Flat,
            Intent::Long => Intent::Short,
            Intent::Short => Intent::Long,
        }
    }
}

fn push_signal(
    queue: &mut EventQueue,
    token: &str,
    direction: Direction,
    timestamp: DateTime<Utc>,
) {
    queue.push(Event::Signal(SignalEvent {
        token: token.to_string(),
        direction,
        timestamp,
    }));
}

/// Emit the signals for an intended-position change.
///
/// A change into `Flat` is a single exit signal. A change into a side
/// nets out any open opposite side first — a swap cannot flip sides
/// atomically, so a `Long -> Short` flip is two signals: the netting
/// short, then the directional short. No change emits nothing.
pub(crate) fn emit_transition(
    queue: &mut EventQueue,
    token: &str,
    timestamp: DateTime<Utc>,
    prior: Intent,
    next: Intent,
) {
    if prior == next {
        return;
    }
    match next {
        Intent::Flat => push_signal(queue, token, Direction::Exit, timestamp),
        Intent::Long | Intent::Short => {
            match prior {
                Intent::Long => push_signal(queue, token, Direction::Short, timestamp),
                Intent::Short => push_signal(queue, token, Direction::Long, timestamp),
                Intent::Flat => {}
            }
            let direction = if next == Intent::Long {
                Direction::Long
            } else {
                Direction::Short
            };
            push_signal(queue, token, direction, timestamp);
        }
    }
}
