//! Execution types

use crate::signal::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Order identifier
pub type OrderId = Uuid;

/// Exchange-side order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// How much to trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSize {
    /// Quote-currency amount, used for entries
    Notional(Decimal),
    /// Base quantity, used to flatten a position
    Quantity(Decimal),
}

/// An order to be placed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Instrument identifier
    pub instrument_id: String,
    /// Signal direction that produced the order
    pub direction: Direction,
    /// Exchange side
    pub side: OrderSide,
    /// Order size
    pub size: OrderSize,
    /// Latest known price, if any
    pub reference_price: Option<Decimal>,
}

/// A confirmed fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    /// Order ID
    pub order_id: OrderId,
    /// Instrument ID
    pub instrument_id: String,
    /// Filled base quantity, always non-negative
    pub filled_qty: Decimal,
    /// Average fill price
    pub avg_price: Decimal,
    /// Fill timestamp
    pub timestamp: DateTime<Utc>,
}

/// Exchange adapter errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExchangeError {
    /// Order rejected for a transient reason (rate limit, busy book)
    #[error("Order rejected: {0}")]
    Rejected(String),
    /// No response within the timeout
    #[error("Exchange call timed out")]
    Timeout,
    /// Exchange unreachable
    #[error("Exchange unavailable: {0}")]
    Unavailable(String),
    /// Non-retryable failure (e.g. unknown instrument)
    #[error("Fatal exchange error: {0}")]
    Fatal(String),
}

impl ExchangeError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExchangeError::Fatal(_))
    }
}
