//! Supervisor integration tests

use crate::common::{
    at, empty_snapshot, kinds, limits, paper_supervisor, paper_supervisor_now, supervisor_with,
    DownExchange, CAPITAL,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use trading_ecosystem::config::{EventsConfig, SupervisorConfig};
use trading_ecosystem::events::{EventRecord, EventRecorder, MemorySink};
use trading_ecosystem::events::TradeEvent;
use trading_ecosystem::execution::{
    ExchangeAdapter, ExchangeError, ExecutionError, FillResult, Order, OrderSize, PaperExchange,
    RetryPolicy,
};
use trading_ecosystem::feed::{MarketDataSource, PriceTick};
use trading_ecosystem::risk::{BookError, GateMode, Position, RejectionReason, RiskLimits};
use trading_ecosystem::signal::{Direction, SignalSource, TradeSignal};
use trading_ecosystem::supervisor::{AccountSnapshot, SignalOutcome, TradeSupervisor};

struct StaticSignals(Vec<TradeSignal>);

#[async_trait]
impl SignalSource for StaticSignals {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<TradeSignal>> {
        let (tx, rx) = mpsc::channel(self.0.len().max(1));
        for signal in &self.0 {
            tx.try_send(signal.clone())?;
        }
        Ok(rx)
    }
}

struct StaticTicks(Vec<PriceTick>);

#[async_trait]
impl MarketDataSource for StaticTicks {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<PriceTick>> {
        let (tx, rx) = mpsc::channel(self.0.len().max(1));
        for tick in &self.0 {
            tx.try_send(tick.clone())?;
        }
        Ok(rx)
    }
}

/// Paper fills, but close orders fill `factor` times the requested quantity
struct ScaledCloseExchange {
    inner: PaperExchange,
    factor: Decimal,
}

impl ScaledCloseExchange {
    fn new(factor: Decimal) -> Self {
        Self {
            inner: PaperExchange::default(),
            factor,
        }
    }
}

#[async_trait]
impl ExchangeAdapter for ScaledCloseExchange {
    async fn place_order(&self, order: &Order) -> Result<FillResult, ExchangeError> {
        let mut fill = self.inner.place_order(order).await?;
        if let OrderSize::Quantity(_) = order.size {
            fill.filled_qty *= self.factor;
        }
        Ok(fill)
    }
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        timeout: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn test_exchange_outage_fails_signal_without_touching_book() {
    let sink = Arc::new(MemorySink::new());
    let exchange = Arc::new(DownExchange::default());
    let sup = supervisor_with(exchange.clone(), sink.clone()).with_retry_policy(fast_retry(2));

    let outcome = sup
        .process_signal_at(TradeSignal::new("A", Direction::Long, dec!(0.1), at(1, 10)), at(1, 10))
        .await;

    match outcome {
        SignalOutcome::Failed { decision, error } => {
            assert!(decision.is_approved());
            assert_eq!(
                error,
                ExecutionError::RetriesExhausted {
                    attempts: 3,
                    last_error: ExchangeError::Unavailable("maintenance".to_string()),
                }
            );
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(exchange.calls.load(Ordering::SeqCst), 3);
    assert_eq!(kinds(&sink), vec!["decision", "signal_failed"]);
    assert!(sup.snapshot().await.positions.is_empty());
}

#[tokio::test]
async fn test_signal_freshness_window() {
    let (sup, sink) = paper_supervisor();
    let sup = sup.with_config(SupervisorConfig {
        signal_freshness_secs: 30,
        ..SupervisorConfig::default()
    });
    sup.on_tick(PriceTick::new("A", dec!(100), at(1, 9))).await;

    let signal = TradeSignal::new("A", Direction::Long, dec!(0.1), at(1, 10));
    let edge = sup
        .process_signal_at(signal, at(1, 10) + ChronoDuration::seconds(30))
        .await;
    assert!(edge.is_executed());

    let signal = TradeSignal::new("B", Direction::Long, dec!(0.1), at(1, 10));
    let stale = sup
        .process_signal_at(signal, at(1, 10) + ChronoDuration::seconds(31))
        .await;
    assert_eq!(stale.decision().reason, Some(RejectionReason::StaleSignal));
    assert_eq!(kinds(&sink).last(), Some(&"decision"));
}

#[tokio::test]
async fn test_concurrent_signals_never_exceed_exposure_limit() {
    let limits = RiskLimits::new(dec!(0.30), dec!(0.02), dec!(0.05), dec!(0.05), 10).unwrap();
    let sup = Arc::new(
        TradeSupervisor::new(
            limits,
            CAPITAL,
            Arc::new(PaperExchange::default()),
            Arc::new(MemorySink::new()),
        )
        .unwrap(),
    );

    let seeded = Utc::now() - ChronoDuration::seconds(1);
    for i in 0..10 {
        sup.on_tick(PriceTick::new(format!("I{i}"), dec!(100), seeded)).await;
    }

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let sup = sup.clone();
            tokio::spawn(async move {
                let signal =
                    TradeSignal::new(format!("I{i}"), Direction::Long, dec!(0.05), Utc::now());
                sup.process_signal(signal).await
            })
        })
        .collect();

    let mut executed = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        if outcome.is_executed() {
            executed += 1;
        } else {
            assert_eq!(
                outcome.decision().reason,
                Some(RejectionReason::PositionLimitExceeded)
            );
        }
    }

    assert_eq!(executed, 6);
    let exposure: rust_decimal::Decimal = sup
        .snapshot()
        .await
        .positions
        .iter()
        .map(|p| p.exposure_pct(CAPITAL))
        .sum();
    assert_eq!(exposure, dec!(0.30));
}

#[tokio::test]
async fn test_run_until_channels_close() {
    let sink = Arc::new(MemorySink::new());
    let sup = TradeSupervisor::new(
        limits(),
        CAPITAL,
        Arc::new(PaperExchange::default()),
        sink.clone(),
    )
    .unwrap();

    let seeded = Utc::now() - ChronoDuration::seconds(1);
    sup.on_tick(PriceTick::new("A", dec!(100), seeded)).await;
    sup.on_tick(PriceTick::new("B", dec!(100), seeded)).await;

    let (signal_tx, signal_rx) = mpsc::channel(8);
    let (tick_tx, tick_rx) = mpsc::channel::<PriceTick>(8);
    signal_tx
        .send(TradeSignal::new("A", Direction::Long, dec!(0.1), Utc::now()))
        .await
        .unwrap();
    signal_tx
        .send(TradeSignal::new("B", Direction::Short, dec!(0.1), Utc::now()))
        .await
        .unwrap();
    drop(signal_tx);
    drop(tick_tx);

    let summary = sup.run(signal_rx, tick_rx).await;
    assert_eq!(summary.signals_processed, 2);
    assert_eq!(summary.ticks_processed, 0);
    assert_eq!(sup.snapshot().await.positions.len(), 2);

    // A drops 10%: stop loss
    let (signal_tx, signal_rx) = mpsc::channel::<TradeSignal>(8);
    let (tick_tx, tick_rx) = mpsc::channel(8);
    tick_tx.send(PriceTick::new("A", dec!(90), Utc::now())).await.unwrap();
    drop(signal_tx);
    drop(tick_tx);

    let summary = sup.run(signal_rx, tick_rx).await;
    assert_eq!(summary.ticks_processed, 1);
    assert_eq!(summary.exits_triggered, 1);

    let positions = sup.snapshot().await.positions;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].instrument_id, "B");
    assert_eq!(kinds(&sink).iter().filter(|k| **k == "position_closed").count(), 1);
}

#[tokio::test]
async fn test_run_sources() {
    let sup = TradeSupervisor::new(
        limits(),
        CAPITAL,
        Arc::new(PaperExchange::default()),
        Arc::new(MemorySink::new()),
    )
    .unwrap();
    sup.on_tick(PriceTick::new("A", dec!(50), Utc::now() - ChronoDuration::seconds(1)))
        .await;

    let strategy = StaticSignals(vec![TradeSignal::new(
        "A",
        Direction::Long,
        dec!(0.2),
        Utc::now(),
    )]);
    let market_data = StaticTicks(vec![]);

    let summary = sup.run_sources(&strategy, &market_data).await.unwrap();
    assert_eq!(summary.signals_processed, 1);

    let positions = sup.snapshot().await.positions;
    assert_eq!(positions[0].quantity, dec!(40));
    assert_eq!(positions[0].entry_price, dec!(50));
}

#[tokio::test]
async fn test_restored_breaker_still_blocks_entries() {
    let snapshot = AccountSnapshot {
        positions: vec![Position {
            instrument_id: "A".to_string(),
            quantity: dec!(10),
            entry_price: dec!(100),
            opened_at: at(1, 8),
        }],
        realized_loss_pct: dec!(0.06),
        gate_mode: GateMode::Closed,
        gate_closed_on: Some(at(1, 0).date_naive()),
        ..empty_snapshot()
    };
    let sup = paper_supervisor_now()
        .with_snapshot(&snapshot)
        .unwrap();
    sup.on_tick(PriceTick::new("A", dec!(100), at(1, 9))).await;

    let entry = sup
        .process_signal_at(TradeSignal::new("B", Direction::Long, dec!(0.01), at(1, 10)), at(1, 10))
        .await;
    assert_eq!(
        entry.decision().reason,
        Some(RejectionReason::DailyLossLimitBreached)
    );

    let close = sup
        .process_signal_at(TradeSignal::close("A", at(1, 10)), at(1, 10))
        .await;
    assert!(close.is_executed());
    assert_eq!(close.decision().adjusted_size, dec!(0.1));
}

#[tokio::test]
async fn test_snapshot_survives_serialization() {
    let (sup, _sink) = paper_supervisor();
    sup.on_tick(PriceTick::new("A", dec!(100), at(1, 9))).await;
    sup.process_signal_at(TradeSignal::new("A", Direction::Short, dec!(0.2), at(1, 10)), at(1, 10))
        .await;

    let snapshot = sup.snapshot().await;
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: AccountSnapshot = serde_json::from_str(&json).unwrap();

    let restored = paper_supervisor_now()
        .with_snapshot(&parsed)
        .unwrap();
    let again = restored.snapshot().await;
    assert_eq!(again.positions, snapshot.positions);
    assert_eq!(again.trading_day, snapshot.trading_day);
    assert_eq!(again.gate_mode, GateMode::Open);
}

#[test]
fn test_snapshot_with_duplicate_positions_rejected() {
    let position = Position {
        instrument_id: "A".to_string(),
        quantity: dec!(1),
        entry_price: dec!(100),
        opened_at: at(1, 8),
    };
    let snapshot = AccountSnapshot {
        positions: vec![position.clone(), position],
        ..empty_snapshot()
    };

    let result = paper_supervisor_now()
        .with_snapshot(&snapshot);
    assert!(matches!(result, Err(BookError::DuplicatePosition(id)) if id == "A"));
}

#[tokio::test]
async fn test_events_written_to_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    let recorder = Arc::new(
        EventRecorder::start_at(&path, &EventsConfig::default()).unwrap(),
    );
    let sup = supervisor_with(Arc::new(PaperExchange::default()), recorder.clone());

    sup.on_tick(PriceTick::new("A", dec!(100), at(1, 9))).await;
    sup.process_signal_at(TradeSignal::new("A", Direction::Long, dec!(0.1), at(1, 10)), at(1, 10))
        .await;
    sup.process_signal_at(TradeSignal::close("A", at(1, 11)), at(1, 11))
        .await;
    recorder.flush().await;

    let records: Vec<EventRecord> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let kinds: Vec<&str> = records.iter().map(|r| r.event.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "decision",
            "order_filled",
            "position_opened",
            "decision",
            "order_filled",
            "position_closed",
        ]
    );
    assert_eq!(recorder.stats().events_written, 6);
}

#[tokio::test]
async fn test_partial_close_fill_keeps_remainder_open() {
    let sink = Arc::new(MemorySink::new());
    let sup = supervisor_with(Arc::new(ScaledCloseExchange::new(dec!(0.5))), sink.clone());
    sup.on_tick(PriceTick::new("A", dec!(100), at(1, 9))).await;
    sup.process_signal_at(
        TradeSignal::new("A", Direction::Long, dec!(0.2), at(1, 10)),
        at(1, 10),
    )
    .await;

    // -1%: inside the stop
    sup.on_tick(PriceTick::new("A", dec!(99), at(1, 11))).await;
    let close = sup
        .process_signal_at(TradeSignal::close("A", at(1, 11)), at(1, 11))
        .await;
    match &close {
        SignalOutcome::Executed { fill, .. } => assert_eq!(fill.filled_qty, dec!(10)),
        other => panic!("expected execution, got {other:?}"),
    }

    let snapshot = sup.snapshot().await;
    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].quantity, dec!(10));
    // Loss booked on the filled half only: 10 × -1 over 10000
    assert_eq!(snapshot.realized_loss_pct, dec!(0.001));

    let closed = sink
        .events()
        .into_iter()
        .find_map(|e| match e.event {
            TradeEvent::PositionClosed { closed, .. } => Some(closed),
            _ => None,
        })
        .unwrap();
    assert_eq!(closed.position.quantity, dec!(10));
    assert_eq!(closed.realized_pnl, dec!(-10));

    // The remainder still counts against exposure and can be closed again
    let close = sup
        .process_signal_at(TradeSignal::close("A", at(1, 12)), at(1, 12))
        .await;
    assert_eq!(close.decision().adjusted_size, dec!(0.1));
    assert_eq!(sup.snapshot().await.positions[0].quantity, dec!(5));
}

#[tokio::test]
async fn test_close_overfill_is_state_error() {
    let sink = Arc::new(MemorySink::new());
    let sup = supervisor_with(Arc::new(ScaledCloseExchange::new(dec!(2))), sink.clone());
    sup.on_tick(PriceTick::new("A", dec!(100), at(1, 9))).await;
    sup.process_signal_at(
        TradeSignal::new("A", Direction::Long, dec!(0.2), at(1, 10)),
        at(1, 10),
    )
    .await;

    let close = sup
        .process_signal_at(TradeSignal::close("A", at(1, 11)), at(1, 11))
        .await;
    assert_eq!(
        close.decision().reason,
        Some(RejectionReason::InternalStateError)
    );

    let snapshot = sup.snapshot().await;
    assert_eq!(snapshot.positions[0].quantity, dec!(20));
    assert_eq!(snapshot.realized_loss_pct, dec!(0));
    assert!(kinds(&sink).contains(&"state_error"));
}
