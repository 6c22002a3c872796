//! Shared fixtures

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use trading_ecosystem::events::{EventSink, MemorySink};
use trading_ecosystem::execution::{
    ExchangeAdapter, ExchangeError, FillResult, Order, PaperExchange,
};
use trading_ecosystem::risk::{GateMode, RiskLimits};
use trading_ecosystem::supervisor::{AccountSnapshot, TradeSupervisor};

pub const CAPITAL: Decimal = dec!(10000);

/// 30% exposure, 2% stop, 5% take profit, 5% daily loss, 2 positions
pub fn limits() -> RiskLimits {
    RiskLimits::new(dec!(0.30), dec!(0.02), dec!(0.05), dec!(0.05), 2).unwrap()
}

/// Hour `hour` of 2024-03-`day` UTC
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// Empty account whose trading day is 2024-03-01
pub fn empty_snapshot() -> AccountSnapshot {
    AccountSnapshot {
        taken_at: at(1, 0),
        capital: CAPITAL,
        positions: vec![],
        trading_day: at(1, 0).date_naive(),
        realized_loss_pct: dec!(0),
        gate_mode: GateMode::Open,
        gate_closed_on: None,
    }
}

pub fn supervisor_with(
    exchange: Arc<dyn ExchangeAdapter>,
    sink: Arc<dyn EventSink>,
) -> TradeSupervisor {
    TradeSupervisor::new(limits(), CAPITAL, exchange, sink)
        .unwrap()
        .with_snapshot(&empty_snapshot())
        .unwrap()
}

/// Paper supervisor on 2024-03-01 with an in-memory event sink
pub fn paper_supervisor() -> (TradeSupervisor, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let sup = supervisor_with(Arc::new(PaperExchange::default()), sink.clone());
    (sup, sink)
}

/// Paper supervisor starting today, discarding events
pub fn paper_supervisor_now() -> TradeSupervisor {
    TradeSupervisor::new(
        limits(),
        CAPITAL,
        Arc::new(PaperExchange::default()),
        Arc::new(MemorySink::new()),
    )
    .unwrap()
}

/// Kinds of all recorded events, in order
pub fn kinds(sink: &MemorySink) -> Vec<&'static str> {
    sink.events().iter().map(|e| e.event.kind()).collect()
}

/// Exchange that is always unavailable
#[derive(Default)]
pub struct DownExchange {
    pub calls: AtomicU32,
}

#[async_trait]
impl ExchangeAdapter for DownExchange {
    async fn place_order(&self, _order: &Order) -> Result<FillResult, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExchangeError::Unavailable("maintenance".to_string()))
    }
}
