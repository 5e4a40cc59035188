//! Simulated order execution.
//!
//! Deliberately trivial: a venue model is out of scope. Orders convert to
//! fills on the same tick at zero slippage with a configurable flat fee;
//! there is no queueing, retry, or rejection.

use crate::domain::{Event, EventQueue, FillEvent, OrderEvent};

/// Converts orders into fills.
pub trait ExecutionHandler {
    fn execute_order(&mut self, order: &OrderEvent, queue: &mut EventQueue);
}

/// Same-tick, zero-slippage fill simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutionHandler {
    fee: f64,
}

impl SimulatedExecutionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge a flat fee per fill, paid to the pool's liquidity providers.
    pub fn with_fee(fee: f64) -> Self {
        debug_assert!(fee >= 0.0, "fee must be non-negative");
        Self { fee }
    }
}

impl ExecutionHandler for SimulatedExecutionHandler {
    fn execute_order(&mut self, order: &OrderEvent, queue: &mut EventQueue) {
        queue.push(Event::Fill(FillEvent {
            token: order.token.clone(),
            side: order.side,
            timestamp: order.timestamp,
            notional: order.notional,
            margin: order.margin,
            fee: self.fee,
        }));
    }
}
