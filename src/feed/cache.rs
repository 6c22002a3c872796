//! Latest price per instrument
//!
//! Ticks may arrive out of order or more than once. A tick only replaces the
//! cached one if it is strictly newer, so replaying a tick is a no-op.

use super::PriceTick;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct PriceCache {
    latest: HashMap<String, PriceTick>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `tick` if it is newer than what is cached.
    ///
    /// Returns true when the cache changed. Non-positive prices are ignored.
    pub fn update(&mut self, tick: &PriceTick) -> bool {
        if tick.price <= dec!(0) {
            tracing::warn!(
                instrument = %tick.instrument_id,
                price = %tick.price,
                "Ignoring non-positive price tick"
            );
            return false;
        }

        match self.latest.get(&tick.instrument_id) {
            Some(current) if current.timestamp >= tick.timestamp => {
                tracing::trace!(
                    instrument = %tick.instrument_id,
                    cached_ts = %current.timestamp,
                    tick_ts = %tick.timestamp,
                    "Dropping stale or duplicate tick"
                );
                false
            }
            _ => {
                self.latest
                    .insert(tick.instrument_id.clone(), tick.clone());
                true
            }
        }
    }

    /// Latest price for `instrument_id`
    pub fn price(&self, instrument_id: &str) -> Option<Decimal> {
        self.latest.get(instrument_id).map(|t| t.price)
    }

    pub fn get(&self, instrument_id: &str) -> Option<&PriceTick> {
        self.latest.get(instrument_id)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
