//! Bounded order retry with exponential backoff

use super::{ExchangeAdapter, ExchangeError, FillResult, Order};
use crate::config::SupervisorConfig;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};

/// Retry configuration for exchange calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Timeout for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SupervisorConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            max_retries: config.max_order_retries,
            initial_delay: config.initial_retry_delay(),
            max_delay: config.max_retry_delay(),
            timeout: config.order_timeout(),
        }
    }
}

/// Order placement failed for good
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// Non-retryable exchange error
    #[error("Order failed: {0}")]
    Fatal(ExchangeError),
    /// All retries used up
    #[error("Order failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: ExchangeError,
    },
}

/// Place `order`, retrying transient failures and timeouts
pub async fn place_with_retry(
    exchange: &dyn ExchangeAdapter,
    order: &Order,
    policy: &RetryPolicy,
) -> Result<FillResult, ExecutionError> {
    let mut attempts = 0;
    let mut delay = policy.initial_delay;

    loop {
        attempts += 1;
        let error = match timeout(policy.timeout, exchange.place_order(order)).await {
            Ok(Ok(fill)) => return Ok(fill),
            Ok(Err(e)) => e,
            Err(_) => ExchangeError::Timeout,
        };

        if !error.is_retryable() {
            tracing::error!(order_id = %order.id, error = %error, "Order failed, not retrying");
            return Err(ExecutionError::Fatal(error));
        }

        if attempts > policy.max_retries {
            tracing::error!(
                order_id = %order.id,
                attempts,
                error = %error,
                "Max order retries reached"
            );
            return Err(ExecutionError::RetriesExhausted {
                attempts,
                last_error: error,
            });
        }

        tracing::warn!(
            order_id = %order.id,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Order attempt failed, retrying..."
        );
        sleep(delay).await;
        delay = delay.saturating_mul(2).min(policy.max_delay);
    }
}
