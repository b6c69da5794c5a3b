//! Risk threshold configuration.
//!
//! A read-only snapshot supplied at startup. The evaluator never mutates
//! it; changes require explicit reconfiguration and a new snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Behavior when market data is stale or unavailable at evaluation time.
///
/// This is an explicit configuration choice, never inferred: `Restrictive`
/// rejects orders it cannot evaluate, `Permissive` skips the market-data
/// checks (liquidity, volatility) and lets the remaining checks decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleDataPolicy {
    /// Reject orders when market data cannot be evaluated (safe default).
    #[default]
    Restrictive,
    /// Skip market-data checks when data is stale or missing.
    Permissive,
}

/// Risk threshold configuration snapshot.
///
/// Zero-valued limits disable their check (same convention as the
/// emergency trigger thresholds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Total account capital, the base for fractional limits.
    #[serde(default = "default_capital")]
    pub capital: Decimal,

    /// Maximum absolute position size in units per instrument.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,

    /// Optional maximum position as a fraction of capital (by notional).
    /// Combined with the absolute cap by taking the tighter bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_position_pct: Option<Decimal>,

    /// Tolerance band around the position limit, as a fraction.
    /// Avoids rejecting orders that land exactly at the boundary due to
    /// rounding. Default: 0.05 (5%).
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: Decimal,

    /// Maximum net realized loss per UTC day. 0 disables the check.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,

    /// Fraction of the daily limit at which the daily-loss check starts
    /// rejecting. Default: 0.95 (reject once within 5% of the limit).
    #[serde(default = "default_daily_loss_tolerance_start")]
    pub daily_loss_tolerance_start: Decimal,

    /// Minimum order value (dust floor). 0 disables the check.
    #[serde(default = "default_min_order_value")]
    pub min_order_value: Decimal,

    /// Maximum single-order value. 0 disables the check.
    #[serde(default = "default_max_order_value")]
    pub max_order_value: Decimal,

    /// Maximum order size as a fraction of visible liquidity at the touch.
    /// 0 disables the check. Default: 0.1 (10%).
    #[serde(default = "default_max_liquidity_fraction")]
    pub max_liquidity_fraction: Decimal,

    /// Volatility ceiling (sample stddev of returns over the lookback).
    /// 0 disables the check.
    #[serde(default = "default_volatility_ceiling")]
    pub volatility_ceiling: Decimal,

    /// Number of recent prices used for the volatility estimate.
    #[serde(default = "default_volatility_lookback")]
    pub volatility_lookback: usize,

    /// Maximum market-data age in milliseconds before the stale-data
    /// policy applies.
    #[serde(default = "default_max_data_age_ms")]
    pub max_data_age_ms: i64,

    /// Behavior when market data is stale or unavailable.
    #[serde(default)]
    pub stale_data_policy: StaleDataPolicy,
}

fn default_capital() -> Decimal {
    Decimal::from(100_000)
}

fn default_max_position_size() -> Decimal {
    Decimal::ONE
}

fn default_position_tolerance() -> Decimal {
    Decimal::new(5, 2) // 0.05 = 5%
}

fn default_max_daily_loss() -> Decimal {
    Decimal::from(1000)
}

fn default_daily_loss_tolerance_start() -> Decimal {
    Decimal::new(95, 2) // 0.95
}

fn default_min_order_value() -> Decimal {
    Decimal::from(10)
}

fn default_max_order_value() -> Decimal {
    Decimal::from(1000)
}

fn default_max_liquidity_fraction() -> Decimal {
    Decimal::new(1, 1) // 0.1 = 10%
}

fn default_volatility_ceiling() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_volatility_lookback() -> usize {
    20
}

fn default_max_data_age_ms() -> i64 {
    5000
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            capital: default_capital(),
            max_position_size: default_max_position_size(),
            max_position_pct: None,
            position_tolerance: default_position_tolerance(),
            max_daily_loss: default_max_daily_loss(),
            daily_loss_tolerance_start: default_daily_loss_tolerance_start(),
            min_order_value: default_min_order_value(),
            max_order_value: default_max_order_value(),
            max_liquidity_fraction: default_max_liquidity_fraction(),
            volatility_ceiling: default_volatility_ceiling(),
            volatility_lookback: default_volatility_lookback(),
            max_data_age_ms: default_max_data_age_ms(),
            stale_data_policy: StaleDataPolicy::default(),
        }
    }
}
