//! Paper trading exchange with simulated fills

use super::{ExchangeAdapter, ExchangeError, FillResult, Order, OrderSide, OrderSize};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Fills every order immediately at the reference price, adjusted by slippage
pub struct PaperExchange {
    slippage: Decimal,
    fills: Arc<RwLock<Vec<FillResult>>>,
}

impl PaperExchange {
    /// Create a new paper exchange. `slippage` is a fraction of price.
    pub fn new(slippage: Decimal) -> Self {
        Self {
            slippage,
            fills: Arc::new(RwLock::new(vec![])),
        }
    }

    /// All fills so far
    pub async fn get_fills(&self) -> Vec<FillResult> {
        self.fills.read().await.clone()
    }

    fn fill_price(&self, reference: Decimal, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => reference * (dec!(1) + self.slippage),
            OrderSide::Sell => reference * (dec!(1) - self.slippage),
        }
    }
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new(dec!(0))
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    async fn place_order(&self, order: &Order) -> Result<FillResult, ExchangeError> {
        let reference = order
            .reference_price
            .filter(|p| *p > dec!(0))
            .ok_or_else(|| {
                ExchangeError::Fatal(format!("no price for {}", order.instrument_id))
            })?;

        let price = self.fill_price(reference, order.side);
        let filled_qty = match order.size {
            OrderSize::Notional(notional) => notional / price,
            OrderSize::Quantity(qty) => qty,
        };
        if filled_qty <= dec!(0) {
            return Err(ExchangeError::Fatal(format!(
                "non-positive order size for {}",
                order.instrument_id
            )));
        }

        let fill = FillResult {
            order_id: order.id,
            instrument_id: order.instrument_id.clone(),
            filled_qty,
            avg_price: price,
            timestamp: Utc::now(),
        };

        self.fills.write().await.push(fill.clone());
        tracing::info!(
            order_id = %order.id,
            instrument = %order.instrument_id,
            qty = %fill.filled_qty,
            "Paper order filled"
        );
        Ok(fill)
    }
}
