//! Mutable account state and its snapshot

use crate::risk::{BookError, DailyLossTracker, GateMode, Position, PositionBook, RiskGate};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything the supervisor mutates, guarded by one lock
#[derive(Debug)]
pub(crate) struct AccountState {
    pub book: PositionBook,
    pub tracker: DailyLossTracker,
    pub gate: RiskGate,
}

impl AccountState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            book: PositionBook::new(),
            tracker: DailyLossTracker::starting_at(started_at),
            gate: RiskGate::new(),
        }
    }

    pub fn from_snapshot(snapshot: &AccountSnapshot) -> Result<Self, BookError> {
        Ok(Self {
            book: PositionBook::from_positions(snapshot.positions.iter().cloned())?,
            tracker: DailyLossTracker::restore(snapshot.trading_day, snapshot.realized_loss_pct),
            gate: RiskGate::with_mode(snapshot.gate_mode, snapshot.gate_closed_on),
        })
    }

    pub fn snapshot(&self, capital: Decimal, taken_at: DateTime<Utc>) -> AccountSnapshot {
        AccountSnapshot {
            taken_at,
            capital,
            positions: self.book.positions().into_iter().cloned().collect(),
            trading_day: self.tracker.trading_day(),
            realized_loss_pct: self.tracker.realized_loss_pct(),
            gate_mode: self.gate.mode(),
            gate_closed_on: self.gate.closed_on(),
        }
    }
}

/// Point-in-time copy of account state, suitable for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub taken_at: DateTime<Utc>,
    pub capital: Decimal,
    /// Open positions ordered by instrument id
    pub positions: Vec<Position>,
    pub trading_day: NaiveDate,
    pub realized_loss_pct: Decimal,
    pub gate_mode: GateMode,
    pub gate_closed_on: Option<NaiveDate>,
}
