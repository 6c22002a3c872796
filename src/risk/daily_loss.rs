//! Daily realized loss accounting
//!
//! Losses accumulate per UTC calendar date. The reset happens on the first
//! timestamp that falls on a later date than the tracked one, regardless of
//! how much wall-clock time has passed, so the circuit breaker does not depend
//! on trade cadence. Timestamps from an earlier date than the tracked day are
//! accounted to the tracked day.

use super::RiskLimits;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Realized loss for the current trading day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyLossTracker {
    trading_day: NaiveDate,
    realized_loss_pct: Decimal,
}

impl DailyLossTracker {
    /// Start tracking on `trading_day` with no losses
    pub fn new(trading_day: NaiveDate) -> Self {
        Self {
            trading_day,
            realized_loss_pct: dec!(0),
        }
    }

    /// Start tracking on the UTC date of `timestamp`
    pub fn starting_at(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp.date_naive())
    }

    /// Restore previously tracked state. Negative losses are clamped to zero.
    pub fn restore(trading_day: NaiveDate, realized_loss_pct: Decimal) -> Self {
        Self {
            trading_day,
            realized_loss_pct: realized_loss_pct.max(dec!(0)),
        }
    }

    /// Move to the date of `timestamp` if it is a later day.
    ///
    /// Returns true when a reset happened.
    pub fn roll_over(&mut self, timestamp: DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        if day > self.trading_day {
            tracing::info!(
                previous_day = %self.trading_day,
                new_day = %day,
                realized_loss_pct = %self.realized_loss_pct,
                "Trading day rolled over, resetting daily loss"
            );
            self.trading_day = day;
            self.realized_loss_pct = dec!(0);
            true
        } else {
            false
        }
    }

    /// Account a realized P&L (fraction of capital). Only losses accumulate.
    ///
    /// Returns true when the call crossed a day boundary.
    pub fn record_realized(&mut self, pnl_pct: Decimal, timestamp: DateTime<Utc>) -> bool {
        let rolled = self.roll_over(timestamp);
        self.realized_loss_pct += (-pnl_pct).max(dec!(0));
        rolled
    }

    /// True iff today's realized loss reached the daily limit
    pub fn is_breached(&self, limits: &RiskLimits) -> bool {
        self.realized_loss_pct >= limits.max_daily_loss_pct()
    }

    pub fn trading_day(&self) -> NaiveDate {
        self.trading_day
    }

    pub fn realized_loss_pct(&self) -> Decimal {
        self.realized_loss_pct
    }
}
