//! Domain types for IRSLab

pub mod event;
pub mod holdings;
pub mod position;
pub mod rate;

pub use event::{Direction, Event, EventQueue, FillEvent, OrderEvent, Side, SignalEvent};
pub use holdings::{HoldingsSnapshot, PositionsSnapshot};
pub use position::SwapPosition;
pub use rate::RateObservation;

/// Token type alias — the name of a yield-bearing pool, e.g. "aave_usdc".
pub type Token = String;
