//! Configuration types for the trading ecosystem
//!
//! Configuration is loaded once at startup from a TOML file and/or the
//! process environment and is immutable afterwards. Nothing in here opens
//! connections or acquires credentials; collaborators are built elsewhere
//! and injected into the supervisor.

use crate::risk::RiskLimits;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Exchanges enabled when `ENABLED_EXCHANGES` is unset
pub const DEFAULT_ENABLED_EXCHANGES: &str = "binance,coinbase";

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Environment variable holds a value that cannot be parsed
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    /// A risk bound is outside its allowed domain
    #[error("{field} = {value} is out of range, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub exchanges: BTreeMap<String, ExchangeConfig>,
}

/// Trading mode: paper, live, or backtest
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Paper,
    Live,
    Backtest,
}

impl TradingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Paper => "paper",
            TradingMode::Live => "live",
            TradingMode::Backtest => "backtest",
        }
    }
}

impl FromStr for TradingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paper" => Ok(TradingMode::Paper),
            "live" => Ok(TradingMode::Live),
            "backtest" => Ok(TradingMode::Backtest),
            _ => Err(ConfigError::InvalidValue {
                key: "TRADING_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Account-level trading configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    #[serde(default)]
    pub mode: TradingMode,
    /// Capital the exposure fractions are measured against
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,
}

fn default_initial_capital() -> Decimal {
    Decimal::new(10_000, 0)
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            mode: TradingMode::Paper,
            initial_capital: default_initial_capital(),
        }
    }
}

/// Raw risk thresholds as read from config. Validate with [`RiskConfig::limits`].
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum total exposure as a fraction of capital
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,
    /// Per-position loss that triggers an exit
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Per-position gain that triggers an exit
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    /// Realized daily loss (fraction of capital) that closes the gate
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: Decimal,
    /// Maximum number of open positions
    #[serde(default = "default_max_concurrent_trades")]
    pub max_concurrent_trades: usize,
}

fn default_max_position_pct() -> Decimal {
    Decimal::new(10, 2) // 0.10
}
fn default_stop_loss_pct() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_take_profit_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_max_daily_loss_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_max_concurrent_trades() -> usize {
    5
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_pct: default_max_position_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            max_daily_loss_pct: default_max_daily_loss_pct(),
            max_concurrent_trades: default_max_concurrent_trades(),
        }
    }
}

impl RiskConfig {
    /// Validate into immutable [`RiskLimits`]
    pub fn limits(&self) -> Result<RiskLimits, ConfigError> {
        RiskLimits::new(
            self.max_position_pct,
            self.stop_loss_pct,
            self.take_profit_pct,
            self.max_daily_loss_pct,
            self.max_concurrent_trades,
        )
    }
}

/// Trade supervisor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
    /// Retries after the first failed order attempt
    #[serde(default = "default_max_order_retries")]
    pub max_order_retries: u32,
    /// Delay before the first retry
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    /// Cap for the exponential backoff
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Timeout for a single exchange call
    #[serde(default = "default_order_timeout_ms")]
    pub order_timeout_ms: u64,
    /// Signals older than this are discarded before evaluation
    #[serde(default = "default_signal_freshness_secs")]
    pub signal_freshness_secs: u64,
}

fn default_max_order_retries() -> u32 {
    3
}
fn default_initial_retry_delay_ms() -> u64 {
    200
}
fn default_max_retry_delay_ms() -> u64 {
    5_000
}
fn default_order_timeout_ms() -> u64 {
    2_000
}
fn default_signal_freshness_secs() -> u64 {
    30
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_order_retries: default_max_order_retries(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            order_timeout_ms: default_order_timeout_ms(),
            signal_freshness_secs: default_signal_freshness_secs(),
        }
    }
}

impl SupervisorConfig {
    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }

    /// Freshness window; saturates instead of overflowing
    pub fn signal_freshness(&self) -> chrono::Duration {
        freshness_window(self.signal_freshness_secs).unwrap_or(chrono::Duration::MAX)
    }

    /// Reject values the supervisor cannot represent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if freshness_window(self.signal_freshness_secs).is_none() {
            return Err(ConfigError::OutOfRange {
                field: "signal_freshness_secs",
                value: self.signal_freshness_secs.to_string(),
                expected: "a representable number of seconds",
            });
        }
        if self.order_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                field: "order_timeout_ms",
                value: self.order_timeout_ms.to_string(),
                expected: ">= 1",
            });
        }
        Ok(())
    }
}

fn freshness_window(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

/// Event record output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Directory for the per-session JSON lines file
    #[serde(default = "default_events_dir")]
    pub output_dir: PathBuf,
    /// Channel capacity between the decision path and the writer task
    #[serde(default = "default_events_buffer_size")]
    pub buffer_size: usize,
    /// Maximum time between flushes
    #[serde(default = "default_events_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_events_dir() -> PathBuf {
    PathBuf::from("./logs")
}
fn default_events_buffer_size() -> usize {
    1024
}
fn default_events_flush_interval_secs() -> u64 {
    5
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_events_dir(),
            buffer_size: default_events_buffer_size(),
            flush_interval_secs: default_events_flush_interval_secs(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; no exporter when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

/// Exchange account configuration
#[derive(Clone, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_true")]
    pub enable_rate_limit: bool,
}

fn default_rate_limit() -> u32 {
    1000
}
fn default_true() -> bool {
    true
}

impl ExchangeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: None,
            api_secret: None,
            rate_limit: default_rate_limit(),
            enable_rate_limit: true,
        }
    }

    /// Whether both halves of the credential pair are present
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("rate_limit", &self.rate_limit)
            .field("enable_rate_limit", &self.enable_rate_limit)
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.supervisor.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with an arbitrary key lookup.
    ///
    /// An unset `ENABLED_EXCHANGES` enables the default exchanges.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_overrides(|key| {
            lookup(key).or_else(|| {
                (key == "ENABLED_EXCHANGES").then(|| DEFAULT_ENABLED_EXCHANGES.to_string())
            })
        })?;
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TRADING_MODE") {
            self.trading.mode = v.parse()?;
        }
        if let Some(v) = lookup("INITIAL_CAPITAL") {
            self.trading.initial_capital = parse_decimal("INITIAL_CAPITAL", &v)?;
        }
        if let Some(v) = lookup("MAX_POSITION_PCT") {
            self.risk.max_position_pct = parse_decimal("MAX_POSITION_PCT", &v)?;
        }
        if let Some(v) = lookup("STOP_LOSS_PCT") {
            self.risk.stop_loss_pct = parse_decimal("STOP_LOSS_PCT", &v)?;
        }
        if let Some(v) = lookup("TAKE_PROFIT_PCT") {
            self.risk.take_profit_pct = parse_decimal("TAKE_PROFIT_PCT", &v)?;
        }
        if let Some(v) = lookup("MAX_DAILY_LOSS_PCT") {
            self.risk.max_daily_loss_pct = parse_decimal("MAX_DAILY_LOSS_PCT", &v)?;
        }
        if let Some(v) = lookup("MAX_CONCURRENT_TRADES") {
            self.risk.max_concurrent_trades =
                v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MAX_CONCURRENT_TRADES".to_string(),
                    value: v.clone(),
                })?;
        }
        if let Some(v) = lookup("ENABLED_EXCHANGES") {
            self.exchanges = v
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    let existing = self.exchanges.get(name).cloned();
                    (
                        name.to_string(),
                        existing.unwrap_or_else(|| ExchangeConfig::new(name)),
                    )
                })
                .collect();
        }
        for (name, exchange) in self.exchanges.iter_mut() {
            let prefix = name.to_ascii_uppercase();
            if let Some(key) = lookup(&format!("{prefix}_API_KEY")) {
                exchange.api_key = Some(key);
            }
            if let Some(secret) = lookup(&format!("{prefix}_API_SECRET")) {
                exchange.api_secret = Some(secret);
            }
        }
        Ok(())
    }

    /// Validated risk limits
    pub fn risk_limits(&self) -> Result<RiskLimits, ConfigError> {
        self.risk.limits()
    }

    /// Secret-free summary for logging and persistence
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "mode": self.trading.mode.as_str(),
            "initial_capital": self.trading.initial_capital,
            "max_position_size_pct": self.risk.max_position_pct,
            "max_daily_loss_pct": self.risk.max_daily_loss_pct,
            "max_concurrent_trades": self.risk.max_concurrent_trades,
            "exchanges": self.exchanges.keys().collect::<Vec<_>>(),
        })
    }
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
