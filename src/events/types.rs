//! Event record types

use crate::execution::FillResult;
use crate::risk::{ClosedPosition, ExitTrigger, Position, TradeDecision};
use crate::signal::Direction;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something that happened to the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradeEvent {
    /// Risk gate (or staleness check) answered a signal
    Decision {
        instrument_id: String,
        direction: Direction,
        requested_size: Decimal,
        decision: TradeDecision,
    },
    /// Exchange confirmed a fill
    OrderFilled { signal_id: Uuid, fill: FillResult },
    /// Position added to the book
    PositionOpened { signal_id: Uuid, position: Position },
    /// Position removed from the book
    PositionClosed {
        signal_id: Uuid,
        closed: ClosedPosition,
    },
    /// Stop-loss or take-profit fired on a price tick
    ExitTriggered {
        instrument_id: String,
        trigger: ExitTrigger,
        price: Decimal,
        unrealized_return: Decimal,
    },
    /// Daily loss breaker tripped
    GateClosed {
        trading_day: NaiveDate,
        realized_loss_pct: Decimal,
    },
    /// New trading day reopened the gate
    GateReopened { trading_day: NaiveDate },
    /// Order placement failed for good
    SignalFailed {
        signal_id: Uuid,
        instrument_id: String,
        error: String,
    },
    /// Book or tracker refused a mutation
    StateError {
        signal_id: Uuid,
        instrument_id: String,
        error: String,
    },
}

impl TradeEvent {
    /// Short kind label, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            TradeEvent::Decision { .. } => "decision",
            TradeEvent::OrderFilled { .. } => "order_filled",
            TradeEvent::PositionOpened { .. } => "position_opened",
            TradeEvent::PositionClosed { .. } => "position_closed",
            TradeEvent::ExitTriggered { .. } => "exit_triggered",
            TradeEvent::GateClosed { .. } => "gate_closed",
            TradeEvent::GateReopened { .. } => "gate_reopened",
            TradeEvent::SignalFailed { .. } => "signal_failed",
            TradeEvent::StateError { .. } => "state_error",
        }
    }
}

/// An immutable, timestamped event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: TradeEvent,
}

impl EventRecord {
    pub fn new(event: TradeEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            event,
        }
    }
}
