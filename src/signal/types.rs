//! Signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Open a long position
    Long,
    /// Open a short position
    Short,
    /// Close the existing position
    Close,
}

impl Direction {
    /// Sign applied to filled quantity when opening
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
            Direction::Close => Decimal::ZERO,
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Direction::Close)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
            Direction::Close => write!(f, "CLOSE"),
        }
    }
}

/// A request to trade, sized as a fraction of capital
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Unique signal identifier
    pub id: Uuid,
    /// Instrument to trade
    pub instrument_id: String,
    /// Trade direction
    pub direction: Direction,
    /// Requested size as a fraction of capital, in (0, 1]
    pub requested_size: Decimal,
    /// Time the strategy produced the signal
    pub timestamp: DateTime<Utc>,
}

impl TradeSignal {
    /// Create a new signal
    pub fn new(
        instrument_id: impl Into<String>,
        direction: Direction,
        requested_size: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument_id: instrument_id.into(),
            direction,
            requested_size,
            timestamp,
        }
    }

    /// Create a CLOSE signal for an instrument
    pub fn close(instrument_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(instrument_id, Direction::Close, Decimal::ZERO, timestamp)
    }

    /// Whether the signal is older than `window` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        now - self.timestamp > window
    }
}
