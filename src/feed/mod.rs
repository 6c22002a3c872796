//! Market data module
//!
//! Price ticks pushed by an external market-data source

mod cache;
mod types;

pub use cache::PriceCache;
pub use types::PriceTick;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for market-data source implementations
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Subscribe to price updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<PriceTick>>;
}
