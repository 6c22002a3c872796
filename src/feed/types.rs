//! Market data types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price observation for an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Instrument identifier (e.g., "BTC-USD")
    pub instrument_id: String,
    /// Last traded or mark price
    pub price: Decimal,
    /// Source timestamp
    pub timestamp: DateTime<Utc>,
}

impl PriceTick {
    pub fn new(instrument_id: impl Into<String>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            price,
            timestamp,
        }
    }
}
