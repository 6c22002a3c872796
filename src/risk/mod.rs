//! Risk management module
//!
//! Limits, position book, daily loss breaker, and the pre-trade gate

mod daily_loss;
mod gate;
mod limits;
mod position;
mod types;

pub use daily_loss::DailyLossTracker;
pub use gate::{GateMode, GateTransition, RiskGate};
pub use limits::{ExitTrigger, RiskLimits};
pub use position::{ClosedPosition, Position, PositionBook};
pub use types::{BookError, Outcome, RejectionReason, TradeDecision};
