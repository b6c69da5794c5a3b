//! Order request types and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{InstrumentId, Price, Qty};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Price specification of an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPrice {
    /// Execute at the given limit price.
    Limit(Price),
    /// Execute at the prevailing market price.
    Market,
}

impl OrderPrice {
    /// The limit price, if this is a limit order.
    pub fn limit(&self) -> Option<Price> {
        match self {
            Self::Limit(p) => Some(*p),
            Self::Market => None,
        }
    }
}

impl fmt::Display for OrderPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit(p) => write!(f, "limit@{p}"),
            Self::Market => write!(f, "market"),
        }
    }
}

/// Client order ID for idempotency.
///
/// CRITICAL: Every order request must have a unique id. Retries create a
/// new request with a new id; the gateway never reuses one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `wdn_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("wdn_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing broker responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A proposed order, immutable once created.
///
/// Consumed by the execution gateway; never mutated after submission.
/// A retry is a new request with a new `ClientOrderId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client order ID for idempotency.
    pub id: ClientOrderId,
    /// Target instrument.
    pub instrument: InstrumentId,
    /// Order side (buy/sell).
    pub side: OrderSide,
    /// Order size, always positive.
    pub size: Qty,
    /// Limit price or market.
    pub price: OrderPrice,
    /// Request timestamp.
    pub requested_at: DateTime<Utc>,
}

impl OrderRequest {
    /// Create a limit order request with a fresh client order id.
    pub fn limit(instrument: InstrumentId, side: OrderSide, size: Qty, price: Price) -> Self {
        Self {
            id: ClientOrderId::new(),
            instrument,
            side,
            size,
            price: OrderPrice::Limit(price),
            requested_at: Utc::now(),
        }
    }

    /// Create a market order request with a fresh client order id.
    pub fn market(instrument: InstrumentId, side: OrderSide, size: Qty) -> Self {
        Self {
            id: ClientOrderId::new(),
            instrument,
            side,
            size,
            price: OrderPrice::Market,
            requested_at: Utc::now(),
        }
    }

    /// Size signed by order side: positive for buys, negative for sells.
    pub fn signed_size(&self) -> Qty {
        match self.side {
            OrderSide::Buy => self.size,
            OrderSide::Sell => -self.size,
        }
    }

    /// Price used for valuation checks: the limit price, or the supplied
    /// reference price for market orders.
    pub fn effective_price(&self, reference: Option<Price>) -> Option<Price> {
        match self.price {
            OrderPrice::Limit(p) => Some(p),
            OrderPrice::Market => reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_order_side_sign() {
        assert_eq!(OrderSide::Buy.sign(), 1);
        assert_eq!(OrderSide::Sell.sign(), -1);
    }

    #[test]
    fn test_client_order_id_unique() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_client_order_id_format() {
        let id = ClientOrderId::new();
        assert!(id.as_str().starts_with("wdn_"));
    }

    #[test]
    fn test_signed_size() {
        let buy = OrderRequest::limit(
            "BTC-USD".into(),
            OrderSide::Buy,
            Qty::new(dec!(0.5)),
            Price::new(dec!(50000)),
        );
        assert_eq!(buy.signed_size(), Qty::new(dec!(0.5)));

        let sell = OrderRequest::limit(
            "BTC-USD".into(),
            OrderSide::Sell,
            Qty::new(dec!(0.5)),
            Price::new(dec!(50000)),
        );
        assert_eq!(sell.signed_size(), Qty::new(dec!(-0.5)));
    }

    #[test]
    fn test_effective_price() {
        let limit = OrderRequest::limit(
            "BTC-USD".into(),
            OrderSide::Buy,
            Qty::new(dec!(1)),
            Price::new(dec!(100)),
        );
        assert_eq!(limit.effective_price(None), Some(Price::new(dec!(100))));

        let market = OrderRequest::market("BTC-USD".into(), OrderSide::Buy, Qty::new(dec!(1)));
        assert_eq!(market.effective_price(None), None);
        assert_eq!(
            market.effective_price(Some(Price::new(dec!(99)))),
            Some(Price::new(dec!(99)))
        );
    }
}
