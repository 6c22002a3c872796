//! Position tracking

use super::BookError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument identifier
    pub instrument_id: String,
    /// Signed quantity, negative for shorts
    pub quantity: Decimal,
    /// Average entry price
    pub entry_price: Decimal,
    /// Entry timestamp
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Absolute notional at entry
    pub fn notional(&self) -> Decimal {
        (self.quantity * self.entry_price).abs()
    }

    /// Notional as a fraction of capital
    pub fn exposure_pct(&self, capital: Decimal) -> Decimal {
        if capital <= dec!(0) {
            return dec!(0);
        }
        self.notional() / capital
    }

    pub fn is_short(&self) -> bool {
        self.quantity < dec!(0)
    }

    /// P&L if closed at `price`
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity
    }

    /// Return on the position itself if closed at `price`
    pub fn return_at(&self, price: Decimal) -> Decimal {
        let change = (price - self.entry_price) / self.entry_price;
        if self.is_short() {
            -change
        } else {
            change
        }
    }
}

/// A closed position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    /// Original position
    pub position: Position,
    /// Exit price
    pub exit_price: Decimal,
    /// Exit timestamp
    pub exit_time: DateTime<Utc>,
    /// Realized P&L
    pub realized_pnl: Decimal,
    /// Realized P&L as a fraction of capital
    pub realized_pnl_pct: Decimal,
}

impl ClosedPosition {
    pub fn new(
        position: Position,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        capital: Decimal,
    ) -> Self {
        let realized_pnl = position.pnl_at(exit_price);
        let realized_pnl_pct = if capital > dec!(0) {
            realized_pnl / capital
        } else {
            dec!(0)
        };
        Self {
            position,
            exit_price,
            exit_time,
            realized_pnl,
            realized_pnl_pct,
        }
    }
}

/// Open positions keyed by instrument. At most one per instrument.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
}

impl PositionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a book from previously open positions
    pub fn from_positions(
        positions: impl IntoIterator<Item = Position>,
    ) -> Result<Self, BookError> {
        let mut book = Self::new();
        for p in positions {
            book.open(p.instrument_id, p.quantity, p.entry_price, p.opened_at)?;
        }
        Ok(book)
    }

    /// Fails if a position for `instrument_id` is already open
    pub fn ensure_can_open(&self, instrument_id: &str) -> Result<(), BookError> {
        if self.positions.contains_key(instrument_id) {
            return Err(BookError::DuplicatePosition(instrument_id.to_string()));
        }
        Ok(())
    }

    /// Open a new position
    pub fn open(
        &mut self,
        instrument_id: impl Into<String>,
        quantity: Decimal,
        entry_price: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Result<&Position, BookError> {
        let instrument_id = instrument_id.into();
        self.ensure_can_open(&instrument_id)?;

        if quantity == dec!(0) {
            return Err(BookError::InvalidPosition {
                instrument_id,
                detail: "zero quantity".to_string(),
            });
        }
        if entry_price <= dec!(0) {
            return Err(BookError::InvalidPosition {
                instrument_id,
                detail: format!("entry price {entry_price} must be positive"),
            });
        }

        let position = Position {
            instrument_id: instrument_id.clone(),
            quantity,
            entry_price,
            opened_at,
        };
        Ok(&*self.positions.entry(instrument_id).or_insert(position))
    }

    /// Remove and return the position for `instrument_id`
    pub fn close(&mut self, instrument_id: &str) -> Result<Position, BookError> {
        self.positions
            .remove(instrument_id)
            .ok_or_else(|| BookError::NotFound(instrument_id.to_string()))
    }

    /// Take `quantity` (unsigned) off the position for `instrument_id`.
    ///
    /// Returns the closed slice with the position's sign. The position is
    /// removed when nothing is left. A quantity above the open size is refused
    /// and leaves the book untouched.
    pub fn reduce(
        &mut self,
        instrument_id: &str,
        quantity: Decimal,
    ) -> Result<Position, BookError> {
        let position = self
            .positions
            .get_mut(instrument_id)
            .ok_or_else(|| BookError::NotFound(instrument_id.to_string()))?;

        let open = position.quantity.abs();
        if quantity <= dec!(0) || quantity > open {
            return Err(BookError::InvalidPosition {
                instrument_id: instrument_id.to_string(),
                detail: format!("cannot reduce {open} by {quantity}"),
            });
        }

        if quantity == open {
            return self.close(instrument_id);
        }

        let signed = if position.is_short() { -quantity } else { quantity };
        position.quantity -= signed;
        Ok(Position {
            quantity: signed,
            ..position.clone()
        })
    }

    pub fn get(&self, instrument_id: &str) -> Option<&Position> {
        self.positions.get(instrument_id)
    }

    pub fn contains(&self, instrument_id: &str) -> bool {
        self.positions.contains_key(instrument_id)
    }

    /// Sum of |quantity × entry price| over capital
    pub fn total_exposure_pct(&self, capital: Decimal) -> Decimal {
        self.positions
            .values()
            .map(|p| p.exposure_pct(capital))
            .sum()
    }

    /// Number of open positions
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Open positions ordered by instrument id
    pub fn positions(&self) -> Vec<&Position> {
        let mut positions: Vec<&Position> = self.positions.values().collect();
        positions.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));
        positions
    }
}
