//! Net position state and fill application.
//!
//! Sign convention: positive quantity = long, negative = short. The average
//! entry price tracks the volume-weighted average of same-direction fills
//! since the last flat or flip event; realized P&L is booked at the moment
//! a fill reduces or flips the position.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use warden_core::{Fill, InstrumentId, Price, Qty};

use crate::error::{LedgerError, LedgerResult};

/// Net holding in one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument identifier.
    pub instrument: InstrumentId,
    /// Signed net quantity (positive = long, negative = short).
    pub qty: Qty,
    /// Volume-weighted average entry price. Zero iff flat.
    pub avg_entry_price: Price,
    /// Realized P&L accumulated over the life of this position record.
    pub realized_pnl: Decimal,
    /// Timestamp of the last applied fill.
    pub last_update: DateTime<Utc>,
}

/// Outcome of applying one fill to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    /// Snapshot of the position after the fill.
    pub position: Position,
    /// Realized P&L booked by this fill (zero for pure adds).
    pub realized_delta: Decimal,
}

impl Position {
    /// Create a flat position for an instrument.
    #[must_use]
    pub fn flat(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            qty: Qty::ZERO,
            avg_entry_price: Price::ZERO,
            realized_pnl: Decimal::ZERO,
            last_update: Utc::now(),
        }
    }

    /// Check if the position is flat (zero quantity).
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.qty.is_zero()
    }

    /// Check if this is a long position.
    #[must_use]
    pub fn is_long(&self) -> bool {
        self.qty.is_positive()
    }

    /// Check if this is a short position.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.qty.is_negative()
    }

    /// Notional exposure at the given price: |qty| * price.
    #[must_use]
    pub fn exposure(&self, price: Price) -> Decimal {
        self.qty.notional(price)
    }

    /// Unrealized P&L at the given mark price.
    #[must_use]
    pub fn unrealized_pnl(&self, mark: Price) -> Decimal {
        (mark.inner() - self.avg_entry_price.inner()) * self.qty.inner()
    }

    /// Apply a confirmed fill, returning the realized P&L delta.
    ///
    /// Same-direction fills extend the position and re-weight the average
    /// entry price:
    ///
    /// `new_avg = (old_avg * old_qty + price * size) / (old_qty + size)`
    ///
    /// Opposite-direction fills first realize
    /// `(fill_price - avg_entry) * closed_size` (sign per side) against the
    /// closed portion, then either reduce at the same average, close flat,
    /// or flip with the residual re-based at the fill price.
    pub fn apply_fill(&mut self, fill: &Fill) -> LedgerResult<FillOutcome> {
        if fill.size.is_zero() || fill.size.is_negative() {
            return Err(LedgerError::InvalidFill(format!(
                "fill size must be positive, got {}",
                fill.size
            )));
        }

        let delta = fill.signed_size();
        let mut realized = Decimal::ZERO;

        if self.qty.is_zero() || self.qty.is_positive() == delta.is_positive() {
            // Opening or extending in the same direction.
            let old_abs = self.qty.abs().inner();
            let add_abs = delta.abs().inner();
            let new_abs = old_abs + add_abs;

            self.avg_entry_price = Price::new(
                (self.avg_entry_price.inner() * old_abs + fill.price.inner() * add_abs) / new_abs,
            );
            self.qty = self.qty + delta;
        } else {
            // Reducing, closing, or flipping.
            let held_abs = self.qty.abs().inner();
            let fill_abs = delta.abs().inner();
            let closed = held_abs.min(fill_abs);

            // Long positions realize (price - avg), shorts the inverse.
            let direction = Decimal::from(if self.qty.is_positive() { 1 } else { -1 });
            realized = (fill.price.inner() - self.avg_entry_price.inner()) * closed * direction;
            self.realized_pnl += realized;

            let residual = fill_abs - held_abs;
            if residual.is_sign_negative() {
                // Partial reduction: same direction, same average.
                self.qty = self.qty + delta;
            } else if residual.is_zero() {
                self.qty = Qty::ZERO;
                self.avg_entry_price = Price::ZERO;
            } else {
                // Flip: residual opens a fresh position at the fill price.
                self.qty = if delta.is_positive() {
                    Qty::new(residual)
                } else {
                    Qty::new(-residual)
                };
                self.avg_entry_price = fill.price;
            }
        }

        self.last_update = fill.filled_at;
        self.validate()?;

        Ok(FillOutcome {
            position: self.clone(),
            realized_delta: realized,
        })
    }

    /// Verify position invariants.
    ///
    /// A negative absolute size or a flat position carrying an entry price
    /// is corrupted state and must be reported, never corrected.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.qty.abs().inner().is_sign_negative() {
            return Err(LedgerError::InvariantViolation(format!(
                "negative absolute size {} for {}",
                self.qty.abs(),
                self.instrument
            )));
        }
        if self.avg_entry_price.inner().is_sign_negative() {
            return Err(LedgerError::InvariantViolation(format!(
                "negative average entry price {} for {}",
                self.avg_entry_price, self.instrument
            )));
        }
        if self.qty.is_zero() && !self.avg_entry_price.is_zero() {
            return Err(LedgerError::InvariantViolation(format!(
                "flat position with entry price {} for {}",
                self.avg_entry_price, self.instrument
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use warden_core::{ClientOrderId, OrderSide};

    fn fill(side: OrderSide, size: Decimal, price: Decimal) -> Fill {
        Fill::new(
            ClientOrderId::new(),
            "BTC-USD".into(),
            side,
            Qty::new(size),
            Price::new(price),
        )
    }

    #[test]
    fn test_first_fill_opens_position() {
        let mut pos = Position::flat("BTC-USD".into());
        let outcome = pos
            .apply_fill(&fill(OrderSide::Buy, dec!(1.0), dec!(100)))
            .unwrap();

        assert_eq!(pos.qty, Qty::new(dec!(1.0)));
        assert_eq!(pos.avg_entry_price, Price::new(dec!(100)));
        assert_eq!(outcome.realized_delta, Decimal::ZERO);
    }

    #[test]
    fn test_weighted_average_on_add() {
        let mut pos = Position::flat("BTC-USD".into());
        pos.apply_fill(&fill(OrderSide::Buy, dec!(1.0), dec!(100)))
            .unwrap();
        pos.apply_fill(&fill(OrderSide::Buy, dec!(0.5), dec!(110)))
            .unwrap();

        // (100 * 1.0 + 110 * 0.5) / 1.5
        let expected = (dec!(100) + dec!(55)) / dec!(1.5);
        assert_eq!(pos.qty, Qty::new(dec!(1.5)));
        assert_eq!(pos.avg_entry_price.inner(), expected);
    }

    #[test]
    fn test_reduce_books_realized_pnl() {
        // The concrete scenario: buy 1.0 @ 100, buy 0.5 @ 110, sell 1.0 @ 120.
        let mut pos = Position::flat("BTC-USD".into());
        pos.apply_fill(&fill(OrderSide::Buy, dec!(1.0), dec!(100)))
            .unwrap();
        pos.apply_fill(&fill(OrderSide::Buy, dec!(0.5), dec!(110)))
            .unwrap();

        let avg = pos.avg_entry_price.inner();
        let outcome = pos
            .apply_fill(&fill(OrderSide::Sell, dec!(1.0), dec!(120)))
            .unwrap();

        assert_eq!(outcome.realized_delta, (dec!(120) - avg) * dec!(1.0));
        assert_eq!(pos.qty, Qty::new(dec!(0.5)));
        // Reduction keeps the average entry price.
        assert_eq!(pos.avg_entry_price.inner(), avg);
    }

    #[test]
    fn test_full_close_zeroes_position() {
        let mut pos = Position::flat("BTC-USD".into());
        pos.apply_fill(&fill(OrderSide::Buy, dec!(2.0), dec!(100)))
            .unwrap();
        let outcome = pos
            .apply_fill(&fill(OrderSide::Sell, dec!(2.0), dec!(90)))
            .unwrap();

        assert!(pos.is_flat());
        assert_eq!(pos.avg_entry_price, Price::ZERO);
        assert_eq!(outcome.realized_delta, dec!(-20));
        assert_eq!(pos.realized_pnl, dec!(-20));
    }

    #[test]
    fn test_flip_rebases_average() {
        let mut pos = Position::flat("BTC-USD".into());
        pos.apply_fill(&fill(OrderSide::Buy, dec!(1.0), dec!(100)))
            .unwrap();
        let outcome = pos
            .apply_fill(&fill(OrderSide::Sell, dec!(1.5), dec!(105)))
            .unwrap();

        // Long 1.0 closed at 105: +5 realized; residual 0.5 short at 105.
        assert_eq!(outcome.realized_delta, dec!(5.0));
        assert_eq!(pos.qty, Qty::new(dec!(-0.5)));
        assert_eq!(pos.avg_entry_price, Price::new(dec!(105)));
        assert!(pos.is_short());
    }

    #[test]
    fn test_short_side_realization() {
        let mut pos = Position::flat("BTC-USD".into());
        pos.apply_fill(&fill(OrderSide::Sell, dec!(1.0), dec!(100)))
            .unwrap();
        let outcome = pos
            .apply_fill(&fill(OrderSide::Buy, dec!(1.0), dec!(90)))
            .unwrap();

        // Short from 100 covered at 90: +10 realized.
        assert_eq!(outcome.realized_delta, dec!(10));
        assert!(pos.is_flat());
    }

    #[test]
    fn test_zero_size_fill_rejected() {
        let mut pos = Position::flat("BTC-USD".into());
        let err = pos
            .apply_fill(&fill(OrderSide::Buy, dec!(0), dec!(100)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidFill(_)));
    }

    #[test]
    fn test_unrealized_pnl() {
        let mut pos = Position::flat("BTC-USD".into());
        pos.apply_fill(&fill(OrderSide::Buy, dec!(2.0), dec!(100)))
            .unwrap();

        assert_eq!(pos.unrealized_pnl(Price::new(dec!(110))), dec!(20));
        assert_eq!(pos.unrealized_pnl(Price::new(dec!(95))), dec!(-10));
    }

    /// Property: for any sequence of same-direction fills, the average entry
    /// price equals the volume-weighted average of those fills.
    #[test]
    fn test_weighted_average_property_random_fills() {
        // Deterministic pseudo-random walk, enough to exercise the re-weighting.
        let mut seed: u64 = 0x5eed;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as u32
        };

        for _ in 0..50 {
            let mut pos = Position::flat("BTC-USD".into());
            let mut notional = Decimal::ZERO;
            let mut total = Decimal::ZERO;

            let fills = 2 + (next() % 8) as usize;
            for _ in 0..fills {
                let size = Decimal::new((1 + next() % 500) as i64, 2); // 0.01..5.00
                let price = Decimal::new((5_000 + next() % 10_000) as i64, 1); // 500.0..1500.0
                pos.apply_fill(&fill(OrderSide::Buy, size, price)).unwrap();
                notional += size * price;
                total += size;
            }

            assert_eq!(pos.qty.inner(), total);
            assert_eq!(pos.avg_entry_price.inner(), notional / total);
        }
    }
}
