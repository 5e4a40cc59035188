//! Events flowing through the backtest queue, and the queue itself.
//!
//! One replay step produces a `Market` event; strategies answer with
//! `Signal`s; the portfolio sizes them into `Order`s; the execution
//! handler converts those into `Fill`s, which mutate the portfolio.
//! Everything is processed in strict FIFO order by the event loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Intent carried by a strategy signal.
///
/// `Exit` only ever appears on signals: by the time an order is built,
/// exits have been netted into a concrete side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Exit,
}

/// Side of a swap position or order.
///
/// Long is the variable taker (long rates), short is the fixed taker
/// (short rates). Exits are unrepresentable here by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn flip(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// Sign applied to cashflows and net-exposure sums: +1 long, -1 short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl Direction {
    /// The concrete side for a directional signal; `None` for `Exit`.
    pub fn as_side(self) -> Option<Side> {
        match self {
            Direction::Long => Some(Side::Long),
            Direction::Short => Some(Side::Short),
            Direction::Exit => None,
        }
    }
}

/// A directional intent for one token, produced by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub token: String,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

/// A sized swap order, produced by the portfolio.
///
/// `notional` is the nominal swap size (margin × leverage); `margin` is
/// the collateral posted to support the position. Both are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub token: String,
    pub side: Side,
    pub timestamp: DateTime<Utc>,
    pub notional: f64,
    pub margin: f64,
}

/// A filled swap order as returned from the (simulated) venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub token: String,
    pub side: Side,
    pub timestamp: DateTime<Utc>,
    pub notional: f64,
    pub margin: f64,
    pub fee: f64,
}

/// The tagged union dispatched by the event loop.
///
/// Dispatch is an exhaustive `match`: an unhandled variant is a compile
/// error rather than a silently dropped event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new bar is available from the data handler.
    Market,
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

/// Strict-FIFO message channel shared by all components of one backtest.
///
/// Created by the backtest builder and handed as `&mut` to every
/// operation that may enqueue; there is no ambient/global queue.
/// Causally-derived events are appended to the tail and processed after
/// everything already queued ahead of them.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
