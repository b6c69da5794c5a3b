//! Market-condition inputs supplied by external collaborators.
//!
//! The core never fetches network data itself: the market data collaborator
//! pushes recent trade prices, book depth, and a last-update timestamp,
//! and these types carry that snapshot into the risk evaluator and the
//! emergency state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{InstrumentId, OrderSide, Price, Qty};

/// Top-of-book depth snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDepth {
    /// Best bid price.
    pub bid_price: Price,
    /// Size available at the best bid.
    pub bid_size: Qty,
    /// Best ask price.
    pub ask_price: Price,
    /// Size available at the best ask.
    pub ask_size: Qty,
}

impl BookDepth {
    pub fn new(bid_price: Price, bid_size: Qty, ask_price: Price, ask_size: Qty) -> Self {
        Self {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
        }
    }

    /// Visible size at the touch for an aggressing order of the given side.
    ///
    /// A buy consumes ask liquidity, a sell consumes bid liquidity.
    pub fn touch_size(&self, side: OrderSide) -> Qty {
        match side {
            OrderSide::Buy => self.ask_size,
            OrderSide::Sell => self.bid_size,
        }
    }

    /// Touch price for an aggressing order of the given side.
    pub fn touch_price(&self, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => self.ask_price,
            OrderSide::Sell => self.bid_price,
        }
    }

    /// Mid price: (bid + ask) / 2. None if either side is missing.
    pub fn mid_price(&self) -> Option<Price> {
        if !self.bid_price.is_positive() || !self.ask_price.is_positive() {
            return None;
        }
        Some(Price::new(
            (self.bid_price.inner() + self.ask_price.inner()) / rust_decimal::Decimal::TWO,
        ))
    }
}

/// Market conditions for one instrument at evaluation time.
///
/// `recent_prices` is ordered oldest-first and bounded by the collaborator;
/// the volatility check reads the tail of this window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConditions {
    /// Instrument these conditions describe.
    pub instrument: InstrumentId,
    /// Most recent trade price, if any.
    pub last_price: Option<Price>,
    /// Recent trade price series, oldest first.
    pub recent_prices: Vec<Price>,
    /// Order-book depth snapshot, if available.
    pub depth: Option<BookDepth>,
    /// When this data was last updated by the collaborator.
    pub updated_at: DateTime<Utc>,
}

impl MarketConditions {
    /// Create fresh conditions stamped now.
    pub fn new(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            last_price: None,
            recent_prices: Vec::new(),
            depth: None,
            updated_at: Utc::now(),
        }
    }

    /// Age of this snapshot in milliseconds.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.updated_at).num_milliseconds()
    }

    /// Check if the snapshot is fresh (within threshold).
    pub fn is_fresh(&self, max_age_ms: i64) -> bool {
        self.age_ms() < max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn depth() -> BookDepth {
        BookDepth::new(
            Price::new(dec!(100)),
            Qty::new(dec!(2)),
            Price::new(dec!(101)),
            Qty::new(dec!(3)),
        )
    }

    #[test]
    fn test_touch_size_per_side() {
        let d = depth();
        assert_eq!(d.touch_size(OrderSide::Buy), Qty::new(dec!(3)));
        assert_eq!(d.touch_size(OrderSide::Sell), Qty::new(dec!(2)));
    }

    #[test]
    fn test_touch_price_per_side() {
        let d = depth();
        assert_eq!(d.touch_price(OrderSide::Buy), Price::new(dec!(101)));
        assert_eq!(d.touch_price(OrderSide::Sell), Price::new(dec!(100)));
    }

    #[test]
    fn test_mid_price() {
        assert_eq!(depth().mid_price().unwrap(), Price::new(dec!(100.5)));

        let one_sided = BookDepth::new(
            Price::ZERO,
            Qty::ZERO,
            Price::new(dec!(101)),
            Qty::new(dec!(1)),
        );
        assert!(one_sided.mid_price().is_none());
    }

    #[test]
    fn test_freshness() {
        let conditions = MarketConditions::new("BTC-USD".into());
        assert!(conditions.is_fresh(1000));
    }
}
