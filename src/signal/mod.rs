//! Trade signals
//!
//! Signals are produced by an external strategy and consumed once by the
//! risk gate. How a strategy arrives at a signal is not modelled here.

mod types;

pub use types::{Direction, TradeSignal};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for strategy implementations that push signals
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Subscribe to trade signals
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<TradeSignal>>;
}
