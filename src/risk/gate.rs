//! Pre-trade risk gate
//!
//! `evaluate` is a pure function of the signal and a view of account state.
//! The checks run in a fixed order and the first failing one decides the
//! rejection reason, so callers always see the same reason for the same state:
//!
//! 1. gate closed by the daily loss breaker (non-CLOSE only)
//! 2. CLOSE is always approved for an open position
//! 3. concurrent position count
//! 4. total exposure, clamping the size to the remaining capacity

use super::{DailyLossTracker, PositionBook, RejectionReason, RiskLimits, TradeDecision};
use crate::signal::TradeSignal;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateMode {
    #[default]
    Open,
    Closed,
}

/// A change of gate mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateTransition {
    /// Daily loss limit reached
    Closed {
        trading_day: NaiveDate,
        realized_loss_pct: Decimal,
    },
    /// A new trading day started
    Reopened { trading_day: NaiveDate },
}

/// Decides whether a signal may trade and at what size
#[derive(Debug, Clone, Default)]
pub struct RiskGate {
    mode: GateMode,
    closed_on: Option<NaiveDate>,
}

impl RiskGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a gate in a given mode
    pub fn with_mode(mode: GateMode, closed_on: Option<NaiveDate>) -> Self {
        Self { mode, closed_on }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    pub fn closed_on(&self) -> Option<NaiveDate> {
        self.closed_on
    }

    /// Closed if the mode says so or the tracker already reports a breach
    pub fn is_closed(&self, tracker: &DailyLossTracker, limits: &RiskLimits) -> bool {
        self.mode == GateMode::Closed || tracker.is_breached(limits)
    }

    /// Apply the mode transition implied by the tracker.
    ///
    /// Closes on breach. Reopens only once the tracker has moved past the day
    /// the gate was closed on.
    pub fn update_mode(
        &mut self,
        tracker: &DailyLossTracker,
        limits: &RiskLimits,
    ) -> Option<GateTransition> {
        match self.mode {
            GateMode::Open if tracker.is_breached(limits) => {
                self.mode = GateMode::Closed;
                self.closed_on = Some(tracker.trading_day());
                tracing::warn!(
                    trading_day = %tracker.trading_day(),
                    realized_loss_pct = %tracker.realized_loss_pct(),
                    limit = %limits.max_daily_loss_pct(),
                    "Daily loss limit breached, gate closed"
                );
                Some(GateTransition::Closed {
                    trading_day: tracker.trading_day(),
                    realized_loss_pct: tracker.realized_loss_pct(),
                })
            }
            GateMode::Closed
                if !tracker.is_breached(limits)
                    && self.closed_on.map_or(true, |day| tracker.trading_day() > day) =>
            {
                self.mode = GateMode::Open;
                self.closed_on = None;
                tracing::info!(trading_day = %tracker.trading_day(), "Gate reopened");
                Some(GateTransition::Reopened {
                    trading_day: tracker.trading_day(),
                })
            }
            _ => None,
        }
    }

    /// Evaluate a signal against limits and current account state
    pub fn evaluate(
        &self,
        signal: &TradeSignal,
        book: &PositionBook,
        limits: &RiskLimits,
        tracker: &DailyLossTracker,
        capital: Decimal,
    ) -> TradeDecision {
        let id = signal.id;
        let ts = signal.timestamp;

        if !signal.direction.is_close() && self.is_closed(tracker, limits) {
            return TradeDecision::rejected(id, RejectionReason::DailyLossLimitBreached, ts);
        }

        if signal.direction.is_close() {
            // Closing risk is never blocked; a missing position is a state error.
            return match book.get(&signal.instrument_id) {
                Some(position) => TradeDecision::approved(id, position.exposure_pct(capital), ts),
                None => TradeDecision::rejected(id, RejectionReason::InternalStateError, ts),
            };
        }

        if book.count() >= limits.max_concurrent_trades() {
            return TradeDecision::rejected(id, RejectionReason::MaxConcurrentTrades, ts);
        }

        if signal.requested_size <= dec!(0) {
            return TradeDecision::rejected(id, RejectionReason::InternalStateError, ts);
        }

        let exposure = book.total_exposure_pct(capital);
        let projected = exposure + signal.requested_size;
        if projected > limits.max_position_size_pct() {
            let adjusted = (limits.max_position_size_pct() - exposure).max(dec!(0));
            if adjusted <= dec!(0) {
                return TradeDecision::rejected(id, RejectionReason::PositionLimitExceeded, ts);
            }
            return TradeDecision::approved(id, adjusted, ts);
        }

        TradeDecision::approved(id, signal.requested_size, ts)
    }
}
