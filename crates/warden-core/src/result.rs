//! Execution outcomes and the rejection taxonomy.
//!
//! Every rejection carries a stable machine code plus a human-readable
//! message. Downstream components and tests match on both, so the message
//! text is part of the contract.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ClientOrderId, InstrumentId, OrderSide, Price, Qty};

/// A broker-confirmed execution of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Client order ID of the originating request.
    pub order_id: ClientOrderId,
    /// Instrument of the fill.
    pub instrument: InstrumentId,
    /// Fill side.
    pub side: OrderSide,
    /// Filled size, always positive.
    pub size: Qty,
    /// Execution price.
    pub price: Price,
    /// Fill timestamp.
    pub filled_at: DateTime<Utc>,
}

impl Fill {
    pub fn new(
        order_id: ClientOrderId,
        instrument: InstrumentId,
        side: OrderSide,
        size: Qty,
        price: Price,
    ) -> Self {
        Self {
            order_id,
            instrument,
            side,
            size,
            price,
            filled_at: Utc::now(),
        }
    }

    /// Size signed by fill side: positive for buys, negative for sells.
    pub fn signed_size(&self) -> Qty {
        match self.side {
            OrderSide::Buy => self.size,
            OrderSide::Sell => -self.size,
        }
    }
}

/// Reason for rejecting an order.
///
/// `code()` is the stable machine identifier; `Display` is the
/// human-readable detail. Both are matched by tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Malformed order parameters (empty instrument, non-positive size, ...).
    InvalidOrder { detail: String },
    /// Order value below the configured floor (dust protection).
    MinOrderValue { value: Decimal, min: Decimal },
    /// Order value above the configured single-order maximum.
    MaxOrderValue { value: Decimal, max: Decimal },
    /// Projected position would exceed the per-instrument limit.
    PositionLimit { projected: Decimal, max: Decimal },
    /// Order size exceeds the safe fraction of visible liquidity.
    Liquidity { size: Decimal, available: Decimal },
    /// Volatility over the lookback window is above the ceiling.
    Volatility { observed: Decimal, ceiling: Decimal },
    /// Market data too old to evaluate under the restrictive policy.
    StaleMarketData { age_ms: i64, max_age_ms: i64 },
    /// Daily loss accumulator within tolerance of or beyond the limit.
    DailyLossLimit { loss: Decimal, limit: Decimal },
    /// System is halted; no new positions accepted.
    Halted { reason: String },
    /// Total exposure would exceed the hard ceiling.
    ExposureCeiling { projected: Decimal, ceiling: Decimal },
    /// Broker confirmed non-execution.
    Broker { code: String, message: String },
}

impl RejectReason {
    /// Stable machine-matchable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOrder { .. } => "invalid_order",
            Self::MinOrderValue { .. } => "min_order_value",
            Self::MaxOrderValue { .. } => "max_order_value",
            Self::PositionLimit { .. } => "position_limit",
            Self::Liquidity { .. } => "liquidity",
            Self::Volatility { .. } => "volatility",
            Self::StaleMarketData { .. } => "stale_market_data",
            Self::DailyLossLimit { .. } => "daily_loss",
            Self::Halted { .. } => "halted",
            Self::ExposureCeiling { .. } => "exposure_ceiling",
            Self::Broker { .. } => "broker_reject",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrder { detail } => {
                write!(f, "invalid order parameters: {detail}")
            }
            Self::MinOrderValue { value, min } => {
                write!(f, "order value {value} below minimum {min}")
            }
            Self::MaxOrderValue { value, max } => {
                write!(f, "order value {value} exceeds maximum {max}")
            }
            Self::PositionLimit { projected, max } => {
                write!(f, "position limit exceeded: projected {projected} > {max}")
            }
            Self::Liquidity { size, available } => write!(
                f,
                "order size exceeds safe liquidity threshold: {size} > {available}"
            ),
            Self::Volatility { observed, ceiling } => {
                write!(f, "volatility {observed} above ceiling {ceiling}")
            }
            Self::StaleMarketData { age_ms, max_age_ms } => {
                write!(f, "market data stale: {age_ms}ms > {max_age_ms}ms max")
            }
            Self::DailyLossLimit { loss, limit } => {
                write!(f, "daily loss limit: {loss} within tolerance of {limit}")
            }
            Self::Halted { reason } => write!(f, "halted: {reason}"),
            Self::ExposureCeiling { projected, ceiling } => {
                write!(f, "total exposure {projected} above ceiling {ceiling}")
            }
            Self::Broker { code, message } => {
                write!(f, "broker rejected [{code}]: {message}")
            }
        }
    }
}

/// Result of submitting an order request through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderResult {
    /// Order filled and booked into the ledger.
    Filled {
        /// The confirmed fill.
        fill: Fill,
    },
    /// Order rejected before or at the broker.
    Rejected {
        /// Reason for rejection.
        reason: RejectReason,
    },
    /// Broker outcome unknown within the timeout.
    ///
    /// Distinct from both success and rejection: the caller reconciles via
    /// a status query rather than double-submitting.
    Indeterminate {
        /// Client order ID to reconcile against.
        order_id: ClientOrderId,
        /// Human-readable detail.
        detail: String,
    },
}

impl OrderResult {
    /// Create a filled result.
    #[must_use]
    pub fn filled(fill: Fill) -> Self {
        Self::Filled { fill }
    }

    /// Create a rejected result with the given reason.
    #[must_use]
    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected { reason }
    }

    /// Create an indeterminate result.
    #[must_use]
    pub fn indeterminate(order_id: ClientOrderId, detail: impl Into<String>) -> Self {
        Self::Indeterminate {
            order_id,
            detail: detail.into(),
        }
    }

    /// Returns true if the order was filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled { .. })
    }

    /// Returns true if the order was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns true if the broker outcome is unknown.
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate { .. })
    }

    /// The rejection reason, if rejected.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}
