//! Execution module
//!
//! Exchange adapter seam, paper exchange, and bounded retry

mod paper;
mod retry;
mod types;

pub use paper::PaperExchange;
pub use retry::{place_with_retry, ExecutionError, RetryPolicy};
pub use types::{ExchangeError, FillResult, Order, OrderId, OrderSide, OrderSize};

use async_trait::async_trait;

/// Trait for exchange adapter implementations
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Place an order and wait for its fill
    async fn place_order(&self, order: &Order) -> Result<FillResult, ExchangeError>;
}
