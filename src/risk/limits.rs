//! Position and loss limits

use crate::config::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why an open position should be closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTrigger {
    StopLoss,
    TakeProfit,
}

/// Validated risk thresholds. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskLimits {
    max_position_size_pct: Decimal,
    stop_loss_pct: Decimal,
    take_profit_pct: Decimal,
    max_daily_loss_pct: Decimal,
    max_concurrent_trades: usize,
}

impl RiskLimits {
    /// Validate and build limits
    pub fn new(
        max_position_size_pct: Decimal,
        stop_loss_pct: Decimal,
        take_profit_pct: Decimal,
        max_daily_loss_pct: Decimal,
        max_concurrent_trades: usize,
    ) -> Result<Self, ConfigError> {
        check_unit_fraction("max_position_pct", max_position_size_pct)?;
        check_positive("stop_loss_pct", stop_loss_pct)?;
        check_positive("take_profit_pct", take_profit_pct)?;
        check_unit_fraction("max_daily_loss_pct", max_daily_loss_pct)?;
        if max_concurrent_trades < 1 {
            return Err(ConfigError::OutOfRange {
                field: "max_concurrent_trades",
                value: max_concurrent_trades.to_string(),
                expected: ">= 1",
            });
        }

        Ok(Self {
            max_position_size_pct,
            stop_loss_pct,
            take_profit_pct,
            max_daily_loss_pct,
            max_concurrent_trades,
        })
    }

    /// Maximum total exposure as a fraction of capital
    pub fn max_position_size_pct(&self) -> Decimal {
        self.max_position_size_pct
    }

    pub fn stop_loss_pct(&self) -> Decimal {
        self.stop_loss_pct
    }

    pub fn take_profit_pct(&self) -> Decimal {
        self.take_profit_pct
    }

    pub fn max_daily_loss_pct(&self) -> Decimal {
        self.max_daily_loss_pct
    }

    pub fn max_concurrent_trades(&self) -> usize {
        self.max_concurrent_trades
    }

    /// Exit trigger for a position's unrealized return, if any
    pub fn exit_trigger(&self, unrealized_return: Decimal) -> Option<ExitTrigger> {
        if unrealized_return <= -self.stop_loss_pct {
            Some(ExitTrigger::StopLoss)
        } else if unrealized_return >= self.take_profit_pct {
            Some(ExitTrigger::TakeProfit)
        } else {
            None
        }
    }
}

fn check_unit_fraction(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            expected: "(0, 1]",
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            expected: "> 0",
        });
    }
    Ok(())
}
