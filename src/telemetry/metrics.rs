//! Prometheus metrics

use crate::risk::{ExitTrigger, Outcome, RejectionReason};
use crate::signal::Direction;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Risk gate evaluation
    Evaluation,
    /// Order placement including retries
    OrderPlacement,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Total exposure as a fraction of capital
    TotalExposure,
    /// Open position count
    OpenPositions,
    /// Realized loss today as a fraction of capital
    DailyRealizedLoss,
    /// 1 when the daily loss breaker is closed
    GateClosed,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Evaluation => "ate_gate_evaluation_latency_ms",
        LatencyMetric::OrderPlacement => "ate_order_placement_latency_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::TotalExposure => "ate_total_exposure_pct",
        GaugeMetric::OpenPositions => "ate_open_positions",
        GaugeMetric::DailyRealizedLoss => "ate_daily_realized_loss_pct",
        GaugeMetric::GateClosed => "ate_gate_closed",
    };

    metrics::gauge!(metric_name).set(value);
}

/// Count a risk decision
pub fn record_decision(outcome: Outcome, reason: Option<RejectionReason>) {
    let outcome = match outcome {
        Outcome::Approved => "approved",
        Outcome::Rejected => "rejected",
    };
    let reason = reason.map(|r| r.as_str()).unwrap_or("none");
    metrics::counter!("ate_decisions_total", "outcome" => outcome, "reason" => reason).increment(1);
}

/// Count a confirmed fill
pub fn record_fill(direction: Direction) {
    let direction = match direction {
        Direction::Long => "long",
        Direction::Short => "short",
        Direction::Close => "close",
    };
    metrics::counter!("ate_fills_total", "direction" => direction).increment(1);
}

/// Count a signal that failed at the exchange
pub fn record_signal_failed() {
    metrics::counter!("ate_signals_failed_total").increment(1);
}

/// Count a stop-loss or take-profit exit
pub fn record_exit_trigger(trigger: ExitTrigger) {
    let trigger = match trigger {
        ExitTrigger::StopLoss => "stop_loss",
        ExitTrigger::TakeProfit => "take_profit",
    };
    metrics::counter!("ate_exit_triggers_total", "trigger" => trigger).increment(1);
}

/// Count an event the recorder could not buffer
pub fn record_dropped_event() {
    metrics::counter!("ate_events_dropped_total").increment(1);
}
