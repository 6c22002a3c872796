//! Trade supervisor implementation

use super::state::{AccountSnapshot, AccountState};
use super::{RunSummary, SignalOutcome};
use crate::config::{ConfigError, SupervisorConfig};
use crate::events::{EventRecord, EventSink, TradeEvent};
use crate::execution::{place_with_retry, ExchangeAdapter, Order, OrderSide, OrderSize, RetryPolicy};
use crate::feed::{MarketDataSource, PriceCache, PriceTick};
use crate::risk::{
    BookError, ClosedPosition, GateMode, GateTransition, RejectionReason, RiskLimits,
    TradeDecision,
};
use crate::signal::{Direction, SignalSource, TradeSignal};
use crate::telemetry::{self, GaugeMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

/// Orchestrates signal evaluation, execution, and exit monitoring for one account.
///
/// All account mutation happens while holding `state`, including the exchange
/// round trip, so two signals can never spend the same exposure budget.
pub struct TradeSupervisor {
    limits: RiskLimits,
    capital: Decimal,
    config: SupervisorConfig,
    retry: RetryPolicy,
    exchange: Arc<dyn ExchangeAdapter>,
    sink: Arc<dyn EventSink>,
    state: Mutex<AccountState>,
    prices: RwLock<PriceCache>,
}

impl TradeSupervisor {
    /// Create a supervisor with default supervisor settings
    pub fn new(
        limits: RiskLimits,
        capital: Decimal,
        exchange: Arc<dyn ExchangeAdapter>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        if capital <= dec!(0) {
            return Err(ConfigError::OutOfRange {
                field: "initial_capital",
                value: capital.to_string(),
                expected: "> 0",
            });
        }

        let config = SupervisorConfig::default();
        Ok(Self {
            limits,
            capital,
            retry: RetryPolicy::from_config(&config),
            config,
            exchange,
            sink,
            state: Mutex::new(AccountState::new(Utc::now())),
            prices: RwLock::new(PriceCache::new()),
        })
    }

    /// Replace supervisor settings
    pub fn with_config(mut self, config: SupervisorConfig) -> Self {
        self.retry = RetryPolicy::from_config(&config);
        self.config = config;
        self
    }

    /// Replace the retry policy only
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start from a previously taken snapshot
    pub fn with_snapshot(mut self, snapshot: &AccountSnapshot) -> Result<Self, BookError> {
        *self.state.get_mut() = AccountState::from_snapshot(snapshot)?;
        tracing::info!(
            positions = snapshot.positions.len(),
            trading_day = %snapshot.trading_day,
            gate_mode = ?snapshot.gate_mode,
            "Supervisor restored from snapshot"
        );
        Ok(self)
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    /// Current account state
    pub async fn snapshot(&self) -> AccountSnapshot {
        let state = self.state.lock().await;
        state.snapshot(self.capital, Utc::now())
    }

    /// Latest accepted price for an instrument
    pub async fn latest_price(&self, instrument_id: &str) -> Option<Decimal> {
        self.prices.read().await.price(instrument_id)
    }

    /// Process a signal at the current time
    pub async fn process_signal(&self, signal: TradeSignal) -> SignalOutcome {
        self.process_signal_at(signal, Utc::now()).await
    }

    /// Process a signal as of `now`
    pub async fn process_signal_at(
        &self,
        signal: TradeSignal,
        now: DateTime<Utc>,
    ) -> SignalOutcome {
        if signal.is_stale(now, self.config.signal_freshness()) {
            let decision = TradeDecision::rejected(signal.id, RejectionReason::StaleSignal, now);
            tracing::warn!(
                signal_id = %signal.id,
                instrument = %signal.instrument_id,
                signal_ts = %signal.timestamp,
                "Discarding stale signal"
            );
            self.emit_decision(&signal, &decision, now);
            return SignalOutcome::Rejected(decision);
        }

        let mut state = self.state.lock().await;
        self.sync_gate(&mut state, now);

        let started = Instant::now();
        let mut decision = state.gate.evaluate(
            &signal,
            &state.book,
            &self.limits,
            &state.tracker,
            self.capital,
        );
        telemetry::record_latency(LatencyMetric::Evaluation, started.elapsed());

        if decision.is_approved() && !signal.direction.is_close() {
            if let Err(e) = state.book.ensure_can_open(&signal.instrument_id) {
                decision = self.state_error(&signal, &e, now);
            }
        }

        self.emit_decision(&signal, &decision, now);
        if !decision.is_approved() {
            return SignalOutcome::Rejected(decision);
        }

        let order = self.build_order(&state, &signal, &decision).await;

        let started = Instant::now();
        let result = place_with_retry(self.exchange.as_ref(), &order, &self.retry).await;
        telemetry::record_latency(LatencyMetric::OrderPlacement, started.elapsed());

        let fill = match result {
            Ok(fill) => fill,
            Err(error) => {
                tracing::error!(
                    signal_id = %signal.id,
                    instrument = %signal.instrument_id,
                    error = %error,
                    "Signal failed"
                );
                telemetry::record_signal_failed();
                self.emit(
                    TradeEvent::SignalFailed {
                        signal_id: signal.id,
                        instrument_id: signal.instrument_id.clone(),
                        error: error.to_string(),
                    },
                    now,
                );
                return SignalOutcome::Failed { decision, error };
            }
        };

        telemetry::record_fill(signal.direction);
        self.emit(
            TradeEvent::OrderFilled {
                signal_id: signal.id,
                fill: fill.clone(),
            },
            now,
        );

        let applied = if signal.direction.is_close() {
            self.apply_close(&mut state, &signal, fill.filled_qty, fill.avg_price, now)
        } else {
            self.apply_open(
                &mut state,
                &signal,
                fill.filled_qty,
                fill.avg_price,
                fill.timestamp,
            )
        };
        if let Err(e) = applied {
            let decision = self.state_error(&signal, &e, now);
            self.emit_decision(&signal, &decision, now);
            self.update_gauges(&state);
            return SignalOutcome::Rejected(decision);
        }

        self.update_gauges(&state);
        SignalOutcome::Executed { decision, fill }
    }

    /// Handle a price tick; closes the position if an exit threshold is hit.
    ///
    /// Stale or duplicate ticks are ignored.
    pub async fn on_tick(&self, tick: PriceTick) -> Option<SignalOutcome> {
        if !self.prices.write().await.update(&tick) {
            return None;
        }

        let triggered = {
            let state = self.state.lock().await;
            state.book.get(&tick.instrument_id).and_then(|position| {
                let unrealized = position.return_at(tick.price);
                self.limits
                    .exit_trigger(unrealized)
                    .map(|trigger| (trigger, unrealized))
            })
        };

        let (trigger, unrealized_return) = triggered?;
        tracing::info!(
            instrument = %tick.instrument_id,
            price = %tick.price,
            unrealized_return = %unrealized_return,
            ?trigger,
            "Exit triggered"
        );
        telemetry::record_exit_trigger(trigger);
        self.emit(
            TradeEvent::ExitTriggered {
                instrument_id: tick.instrument_id.clone(),
                trigger,
                price: tick.price,
                unrealized_return,
            },
            tick.timestamp,
        );

        let close = TradeSignal::close(tick.instrument_id, tick.timestamp);
        Some(self.process_signal_at(close, tick.timestamp).await)
    }

    /// Drive the supervisor from signal and tick channels until both close
    pub async fn run(
        &self,
        mut signals: mpsc::Receiver<TradeSignal>,
        mut ticks: mpsc::Receiver<PriceTick>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut signals_open = true;
        let mut ticks_open = true;

        while signals_open || ticks_open {
            tokio::select! {
                signal = signals.recv(), if signals_open => {
                    match signal {
                        Some(signal) => {
                            self.process_signal(signal).await;
                            summary.signals_processed += 1;
                        }
                        None => {
                            tracing::info!("Signal channel closed");
                            signals_open = false;
                        }
                    }
                }
                tick = ticks.recv(), if ticks_open => {
                    match tick {
                        Some(tick) => {
                            if self.on_tick(tick).await.is_some() {
                                summary.exits_triggered += 1;
                            }
                            summary.ticks_processed += 1;
                        }
                        None => {
                            tracing::info!("Tick channel closed");
                            ticks_open = false;
                        }
                    }
                }
            }
        }

        tracing::info!(
            signals = summary.signals_processed,
            ticks = summary.ticks_processed,
            exits = summary.exits_triggered,
            "Supervisor stopped"
        );
        summary
    }

    /// Subscribe to a strategy and a market-data source and run until both end
    pub async fn run_sources(
        &self,
        strategy: &dyn SignalSource,
        market_data: &dyn MarketDataSource,
    ) -> anyhow::Result<RunSummary> {
        let signals = strategy.subscribe().await?;
        let ticks = market_data.subscribe().await?;
        Ok(self.run(signals, ticks).await)
    }

    async fn build_order(
        &self,
        state: &AccountState,
        signal: &TradeSignal,
        decision: &TradeDecision,
    ) -> Order {
        let reference_price = self.prices.read().await.price(&signal.instrument_id);

        let (side, size) = match signal.direction {
            Direction::Long => (
                OrderSide::Buy,
                OrderSize::Notional(decision.adjusted_size * self.capital),
            ),
            Direction::Short => (
                OrderSide::Sell,
                OrderSize::Notional(decision.adjusted_size * self.capital),
            ),
            Direction::Close => {
                // Approved CLOSE implies the position exists
                let quantity = state
                    .book
                    .get(&signal.instrument_id)
                    .map(|p| p.quantity)
                    .unwrap_or_default();
                let side = if quantity < dec!(0) {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                };
                (side, OrderSize::Quantity(quantity.abs()))
            }
        };

        Order {
            id: Uuid::new_v4(),
            instrument_id: signal.instrument_id.clone(),
            direction: signal.direction,
            side,
            size,
            reference_price,
        }
    }

    fn apply_open(
        &self,
        state: &mut AccountState,
        signal: &TradeSignal,
        filled_qty: Decimal,
        avg_price: Decimal,
        filled_at: DateTime<Utc>,
    ) -> Result<(), BookError> {
        let quantity = filled_qty * signal.direction.sign();
        let position = state
            .book
            .open(signal.instrument_id.clone(), quantity, avg_price, filled_at)?
            .clone();

        tracing::info!(
            instrument = %position.instrument_id,
            quantity = %position.quantity,
            entry_price = %position.entry_price,
            "Position opened"
        );
        self.emit(
            TradeEvent::PositionOpened {
                signal_id: signal.id,
                position,
            },
            filled_at,
        );
        Ok(())
    }

    fn apply_close(
        &self,
        state: &mut AccountState,
        signal: &TradeSignal,
        filled_qty: Decimal,
        exit_price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), BookError> {
        // Only the filled slice is realized; any remainder stays open
        let slice = state.book.reduce(&signal.instrument_id, filled_qty)?;
        let closed = ClosedPosition::new(slice, exit_price, now, self.capital);

        if let Some(remaining) = state.book.get(&signal.instrument_id) {
            tracing::warn!(
                instrument = %remaining.instrument_id,
                filled = %filled_qty,
                remaining = %remaining.quantity,
                "Close order partially filled"
            );
        }

        tracing::info!(
            instrument = %closed.position.instrument_id,
            exit_price = %closed.exit_price,
            realized_pnl = %closed.realized_pnl,
            realized_pnl_pct = %closed.realized_pnl_pct,
            "Position closed"
        );

        state.tracker.record_realized(closed.realized_pnl_pct, now);
        self.emit(
            TradeEvent::PositionClosed {
                signal_id: signal.id,
                closed,
            },
            now,
        );
        self.sync_gate(state, now);
        Ok(())
    }

    /// Roll the loss tracker to `now` and apply any gate transition
    fn sync_gate(&self, state: &mut AccountState, now: DateTime<Utc>) {
        state.tracker.roll_over(now);
        if let Some(transition) = state.gate.update_mode(&state.tracker, &self.limits) {
            let event = match transition {
                GateTransition::Closed {
                    trading_day,
                    realized_loss_pct,
                } => TradeEvent::GateClosed {
                    trading_day,
                    realized_loss_pct,
                },
                GateTransition::Reopened { trading_day } => {
                    TradeEvent::GateReopened { trading_day }
                }
            };
            self.emit(event, now);
        }
    }

    fn state_error(
        &self,
        signal: &TradeSignal,
        error: &BookError,
        now: DateTime<Utc>,
    ) -> TradeDecision {
        tracing::error!(
            signal_id = %signal.id,
            instrument = %signal.instrument_id,
            error = %error,
            "Account state error, rejecting signal"
        );
        self.emit(
            TradeEvent::StateError {
                signal_id: signal.id,
                instrument_id: signal.instrument_id.clone(),
                error: error.to_string(),
            },
            now,
        );
        TradeDecision::rejected(signal.id, RejectionReason::InternalStateError, now)
    }

    fn emit_decision(&self, signal: &TradeSignal, decision: &TradeDecision, now: DateTime<Utc>) {
        telemetry::record_decision(decision.outcome, decision.reason);
        match decision.reason {
            Some(reason) => tracing::info!(
                signal_id = %signal.id,
                instrument = %signal.instrument_id,
                direction = %signal.direction,
                %reason,
                "Signal rejected"
            ),
            None => tracing::info!(
                signal_id = %signal.id,
                instrument = %signal.instrument_id,
                direction = %signal.direction,
                requested = %signal.requested_size,
                adjusted = %decision.adjusted_size,
                "Signal approved"
            ),
        }
        self.emit(
            TradeEvent::Decision {
                instrument_id: signal.instrument_id.clone(),
                direction: signal.direction,
                requested_size: signal.requested_size,
                decision: decision.clone(),
            },
            now,
        );
    }

    fn emit(&self, event: TradeEvent, timestamp: DateTime<Utc>) {
        self.sink.record(EventRecord::new(event, timestamp));
    }

    fn update_gauges(&self, state: &AccountState) {
        let exposure = state.book.total_exposure_pct(self.capital);
        telemetry::set_gauge(GaugeMetric::TotalExposure, exposure.to_f64().unwrap_or_default());
        telemetry::set_gauge(GaugeMetric::OpenPositions, state.book.count() as f64);
        telemetry::set_gauge(
            GaugeMetric::DailyRealizedLoss,
            state.tracker.realized_loss_pct().to_f64().unwrap_or_default(),
        );
        let closed = if state.gate.mode() == GateMode::Closed { 1.0 } else { 0.0 };
        telemetry::set_gauge(GaugeMetric::GateClosed, closed);
    }
}
