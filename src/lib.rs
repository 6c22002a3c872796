//! trading-ecosystem: Strategy signal evaluation and order risk gating
//!
//! This library provides the core components for:
//! - Validated risk limits (position size, stop-loss, take-profit, daily loss)
//! - Position book with one position per instrument
//! - Daily realized loss tracking with UTC day rollover
//! - Pre-trade risk gate with a daily loss circuit breaker
//! - Trade supervisor with bounded order retry and exit monitoring
//! - Paper exchange for simulated fills
//! - Append-only event records
//! - Structured logging and Prometheus metrics

pub mod config;
pub mod events;
pub mod execution;
pub mod feed;
pub mod risk;
pub mod signal;
pub mod supervisor;
pub mod telemetry;
