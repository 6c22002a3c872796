//! Configuration to supervisor wiring

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trading_ecosystem::config::{Config, LogFormat, TradingMode};
use trading_ecosystem::events::MemorySink;
use trading_ecosystem::execution::PaperExchange;
use trading_ecosystem::feed::PriceTick;
use trading_ecosystem::signal::{Direction, TradeSignal};
use trading_ecosystem::supervisor::TradeSupervisor;

#[test]
fn test_config_example_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.trading.mode, TradingMode::Paper);
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert_eq!(config.telemetry.metrics_port, Some(9090));
    assert!(config.exchanges.contains_key("binance"));

    let limits = config.risk_limits().unwrap();
    assert_eq!(limits.max_position_size_pct(), dec!(0.10));
    assert_eq!(limits.max_concurrent_trades(), 5);
}

#[test]
fn test_supervisor_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [trading]
        initial_capital = 5000

        [risk]
        max_position_pct = 0.2
        max_concurrent_trades = 1

        [supervisor]
        max_order_retries = 0
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    let sup = TradeSupervisor::new(
        config.risk_limits().unwrap(),
        config.trading.initial_capital,
        Arc::new(PaperExchange::default()),
        Arc::new(MemorySink::new()),
    )
    .unwrap()
    .with_config(config.supervisor.clone());

    assert_eq!(sup.capital(), dec!(5000));

    let outcome = tokio_test::block_on(async {
        sup.on_tick(PriceTick::new("A", dec!(10), Utc::now())).await;
        sup.process_signal(TradeSignal::new("A", Direction::Long, dec!(0.5), Utc::now()))
            .await
    });
    assert!(outcome.is_executed());
    assert_eq!(outcome.decision().adjusted_size, dec!(0.2));
}

#[test]
fn test_invalid_limits_in_config() {
    let config = Config::from_toml(
        r#"
        [risk]
        max_position_pct = 1.5
        "#,
    )
    .unwrap();
    assert!(config.risk_limits().is_err());
}
