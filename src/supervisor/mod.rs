//! Trade supervisor
//!
//! Runs each signal through the risk gate, places approved orders, applies
//! fills to the position book and loss tracker, and watches prices for
//! stop-loss / take-profit exits.

mod engine;
mod state;
mod types;

pub use engine::TradeSupervisor;
pub use state::AccountSnapshot;
pub use types::{RunSummary, SignalOutcome};
