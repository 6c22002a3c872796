//! Risk management types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Position book invariant violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BookError {
    /// Instrument already has an open position
    #[error("Position already open for {0}")]
    DuplicatePosition(String),
    /// No open position for instrument
    #[error("No open position for {0}")]
    NotFound(String),
    /// Zero quantity or non-positive entry price
    #[error("Invalid position for {instrument_id}: {detail}")]
    InvalidPosition {
        instrument_id: String,
        detail: String,
    },
}

/// Why a signal was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// Daily realized loss reached the limit; gate is closed
    DailyLossLimitBreached,
    /// Open position count at the limit
    MaxConcurrentTrades,
    /// No exposure capacity left
    PositionLimitExceeded,
    /// Position book or loss tracker refused the mutation
    InternalStateError,
    /// Signal older than the freshness window
    StaleSignal,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::DailyLossLimitBreached => "DAILY_LOSS_LIMIT_BREACHED",
            RejectionReason::MaxConcurrentTrades => "MAX_CONCURRENT_TRADES",
            RejectionReason::PositionLimitExceeded => "POSITION_LIMIT_EXCEEDED",
            RejectionReason::InternalStateError => "INTERNAL_STATE_ERROR",
            RejectionReason::StaleSignal => "STALE_SIGNAL",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Approved,
    Rejected,
}

/// Result of evaluating one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    /// Signal this decision answers
    pub signal_id: Uuid,
    pub outcome: Outcome,
    /// Present iff rejected
    pub reason: Option<RejectionReason>,
    /// Approved size as a fraction of capital, never above the request
    pub adjusted_size: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TradeDecision {
    pub fn approved(signal_id: Uuid, adjusted_size: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            signal_id,
            outcome: Outcome::Approved,
            reason: None,
            adjusted_size,
            timestamp,
        }
    }

    pub fn rejected(signal_id: Uuid, reason: RejectionReason, timestamp: DateTime<Utc>) -> Self {
        Self {
            signal_id,
            outcome: Outcome::Rejected,
            reason: Some(reason),
            adjusted_size: Decimal::ZERO,
            timestamp,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.outcome == Outcome::Approved
    }
}
