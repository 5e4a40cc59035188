//! IRSLab Core — event-driven backtesting engine for interest-rate-swap
//! strategies over DeFi lending-pool yield data.
//!
//! This crate contains the heart of the engine:
//! - Domain types (events, rate observations, swap positions, holdings)
//! - A strict-FIFO event queue and the bar-by-bar event loop
//! - The CSV-backed replay data handler with forward-fill alignment
//! - The naive portfolio: constant sizing, margin-tracking accounting,
//!   and per-bar mark-to-model snapshots
//! - Zero-slippage simulated execution
//! - Signal strategies (long-rate, long/short momentum, stat-arb pairs)
//! - Pure performance metrics (Sharpe, drawdowns)

pub mod apy;
pub mod data;
pub mod domain;
pub mod event_loop;
pub mod execution;
pub mod performance;
pub mod portfolio;
pub mod stats;
pub mod strategies;

pub use event_loop::{EngineError, EventLoop};
