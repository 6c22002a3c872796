//! Supervisor result types

use crate::execution::{ExecutionError, FillResult};
use crate::risk::TradeDecision;

/// What happened to one signal
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// Approved, filled, and applied to the book
    Executed {
        decision: TradeDecision,
        fill: FillResult,
    },
    /// Rejected by the gate, staleness check, or a state error
    Rejected(TradeDecision),
    /// Approved but the exchange never filled it
    Failed {
        decision: TradeDecision,
        error: ExecutionError,
    },
}

impl SignalOutcome {
    /// The decision behind the outcome
    pub fn decision(&self) -> &TradeDecision {
        match self {
            SignalOutcome::Executed { decision, .. } => decision,
            SignalOutcome::Rejected(decision) => decision,
            SignalOutcome::Failed { decision, .. } => decision,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, SignalOutcome::Executed { .. })
    }
}

/// Counters from a `run` loop
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub signals_processed: u64,
    pub ticks_processed: u64,
    pub exits_triggered: u64,
}
