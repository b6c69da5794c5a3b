//! The risk evaluator: accept/reject decisions for candidate orders.
//!
//! Stateless per call. Consumes a ledger snapshot, a read-only threshold
//! snapshot, and market-condition inputs; never mutates any of them.
//!
//! # Check Order (fixed, part of the contract)
//!
//! 1. Parameter validity
//! 2. Order value floor / ceiling
//! 3. Position limit (tolerance band)
//! 4. Liquidity vs visible depth at the touch
//! 5. Volatility ceiling
//! 6. Daily loss limit
//!
//! Checks 4 and 5 consume market data and are governed by the configured
//! `StaleDataPolicy` when that data is stale or unavailable.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use warden_core::{MarketConditions, OrderRequest, Price, RejectReason};
use warden_ledger::Position;

use crate::thresholds::{RiskThresholds, StaleDataPolicy};
use crate::volatility::sample_volatility;

/// Outcome of a risk evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskVerdict {
    /// All checks passed.
    Accept,
    /// A check failed; carries the machine-matchable reason.
    Reject(RejectReason),
}

impl RiskVerdict {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// The rejection reason, if rejected.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Accept => None,
            Self::Reject(reason) => Some(reason),
        }
    }
}

/// Stateless rules engine for candidate orders.
pub struct RiskEvaluator;

impl RiskEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a candidate order against the current position snapshot,
    /// thresholds, market conditions, and the daily loss accumulator.
    pub fn evaluate(
        &self,
        order: &OrderRequest,
        position: &Position,
        thresholds: &RiskThresholds,
        conditions: &MarketConditions,
        daily_loss: Decimal,
    ) -> RiskVerdict {
        // Check 1: parameter validity.
        if let Some(reason) = Self::check_validity(order, conditions) {
            debug!(order = %order.id, reason = %reason, "Risk check failed: validity");
            return RiskVerdict::Reject(reason);
        }
        // Safe after check 1: a price is known to be available.
        let price = order
            .effective_price(conditions.last_price)
            .expect("validity check guarantees a price");

        // Check 2: order value floor / ceiling.
        if let Some(reason) = Self::check_order_value(order, price, thresholds) {
            debug!(order = %order.id, reason = %reason, "Risk check failed: order value");
            return RiskVerdict::Reject(reason);
        }

        // Check 3: position limit with tolerance band.
        if let Some(reason) = Self::check_position_limit(order, position, price, thresholds) {
            debug!(order = %order.id, reason = %reason, "Risk check failed: position limit");
            return RiskVerdict::Reject(reason);
        }

        // Checks 4-5 consume market data; a stale snapshot is handled per
        // the configured policy before either runs.
        let market_data_usable = conditions.is_fresh(thresholds.max_data_age_ms);
        if !market_data_usable {
            match thresholds.stale_data_policy {
                StaleDataPolicy::Restrictive => {
                    let reason = RejectReason::StaleMarketData {
                        age_ms: conditions.age_ms(),
                        max_age_ms: thresholds.max_data_age_ms,
                    };
                    debug!(order = %order.id, reason = %reason, "Risk check failed: stale data");
                    return RiskVerdict::Reject(reason);
                }
                StaleDataPolicy::Permissive => {
                    debug!(
                        order = %order.id,
                        age_ms = conditions.age_ms(),
                        "Market data stale, permissive policy skips liquidity/volatility checks"
                    );
                }
            }
        }

        if market_data_usable {
            // Check 4: liquidity at the touch.
            if let Some(reason) = Self::check_liquidity(order, conditions, thresholds) {
                debug!(order = %order.id, reason = %reason, "Risk check failed: liquidity");
                return RiskVerdict::Reject(reason);
            }

            // Check 5: volatility ceiling.
            if let Some(reason) = Self::check_volatility(order, conditions, thresholds) {
                debug!(order = %order.id, reason = %reason, "Risk check failed: volatility");
                return RiskVerdict::Reject(reason);
            }
        }

        // Check 6: daily loss limit.
        if let Some(reason) = Self::check_daily_loss(daily_loss, thresholds) {
            debug!(order = %order.id, reason = %reason, "Risk check failed: daily loss");
            return RiskVerdict::Reject(reason);
        }

        trace!(order = %order.id, "All risk checks passed");
        RiskVerdict::Accept
    }

    fn check_validity(order: &OrderRequest, conditions: &MarketConditions) -> Option<RejectReason> {
        if !order.instrument.is_valid() {
            return Some(RejectReason::InvalidOrder {
                detail: "empty instrument id".to_string(),
            });
        }
        if !order.size.is_positive() {
            return Some(RejectReason::InvalidOrder {
                detail: format!("size must be positive, got {}", order.size),
            });
        }
        if let Some(limit) = order.price.limit() {
            if !limit.is_positive() {
                return Some(RejectReason::InvalidOrder {
                    detail: format!("limit price must be positive, got {limit}"),
                });
            }
        }
        if order.effective_price(conditions.last_price).is_none() {
            return Some(RejectReason::InvalidOrder {
                detail: "no reference price available for market order".to_string(),
            });
        }
        None
    }

    fn check_order_value(
        order: &OrderRequest,
        price: Price,
        thresholds: &RiskThresholds,
    ) -> Option<RejectReason> {
        let value = order.size.notional(price);

        if !thresholds.min_order_value.is_zero() && value < thresholds.min_order_value {
            return Some(RejectReason::MinOrderValue {
                value,
                min: thresholds.min_order_value,
            });
        }
        if !thresholds.max_order_value.is_zero() && value > thresholds.max_order_value {
            return Some(RejectReason::MaxOrderValue {
                value,
                max: thresholds.max_order_value,
            });
        }
        None
    }

    fn check_position_limit(
        order: &OrderRequest,
        position: &Position,
        price: Price,
        thresholds: &RiskThresholds,
    ) -> Option<RejectReason> {
        let projected = (position.qty + order.signed_size()).abs().inner();

        // Absolute cap, tightened by the fraction-of-capital cap when set.
        let mut max_units = thresholds.max_position_size;
        if let Some(pct) = thresholds.max_position_pct {
            if thresholds.capital.is_sign_positive()
                && !thresholds.capital.is_zero()
                && price.is_positive()
            {
                let units_cap = thresholds.capital * pct / price.inner();
                max_units = max_units.min(units_cap);
            }
        }

        let allowed = max_units * (Decimal::ONE + thresholds.position_tolerance);
        if projected > allowed {
            return Some(RejectReason::PositionLimit {
                projected,
                max: max_units,
            });
        }
        None
    }

    fn check_liquidity(
        order: &OrderRequest,
        conditions: &MarketConditions,
        thresholds: &RiskThresholds,
    ) -> Option<RejectReason> {
        if thresholds.max_liquidity_fraction.is_zero() {
            return None;
        }

        match &conditions.depth {
            Some(depth) => {
                let available =
                    depth.touch_size(order.side).abs().inner() * thresholds.max_liquidity_fraction;
                if order.size.inner() > available {
                    return Some(RejectReason::Liquidity {
                        size: order.size.inner(),
                        available,
                    });
                }
                None
            }
            // No depth supplied: restrictive rejects, permissive skips.
            None => match thresholds.stale_data_policy {
                StaleDataPolicy::Restrictive => Some(RejectReason::Liquidity {
                    size: order.size.inner(),
                    available: Decimal::ZERO,
                }),
                StaleDataPolicy::Permissive => None,
            },
        }
    }

    fn check_volatility(
        order: &OrderRequest,
        conditions: &MarketConditions,
        thresholds: &RiskThresholds,
    ) -> Option<RejectReason> {
        if thresholds.volatility_ceiling.is_zero() {
            return None;
        }

        match sample_volatility(&conditions.recent_prices, thresholds.volatility_lookback) {
            Some(observed) => {
                if observed > thresholds.volatility_ceiling {
                    return Some(RejectReason::Volatility {
                        observed,
                        ceiling: thresholds.volatility_ceiling,
                    });
                }
                None
            }
            // Window too short to estimate: restrictive rejects, permissive
            // skips.
            None => match thresholds.stale_data_policy {
                StaleDataPolicy::Restrictive => Some(RejectReason::StaleMarketData {
                    age_ms: conditions.age_ms(),
                    max_age_ms: thresholds.max_data_age_ms,
                }),
                StaleDataPolicy::Permissive => {
                    trace!(order = %order.id, "Volatility window too short, permissive skip");
                    None
                }
            },
        }
    }

    fn check_daily_loss(daily_loss: Decimal, thresholds: &RiskThresholds) -> Option<RejectReason> {
        if thresholds.max_daily_loss.is_zero() {
            return None;
        }

        let reject_from = thresholds.max_daily_loss * thresholds.daily_loss_tolerance_start;
        if daily_loss >= reject_from {
            return Some(RejectReason::DailyLossLimit {
                loss: daily_loss,
                limit: thresholds.max_daily_loss,
            });
        }
        None
    }
}

impl Default for RiskEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
