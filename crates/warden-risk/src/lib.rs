//! Order risk evaluation for the warden trading executor.
//!
//! Implements the checks that must pass before any order reaches the
//! broker, in a fixed order so rejection reasons are deterministic:
//! 1. Parameter validity
//! 2. Order value floor/ceiling
//! 3. Position limit (with tolerance band)
//! 4. Liquidity vs visible depth
//! 5. Volatility ceiling (with explicit stale-data policy)
//! 6. Daily loss limit

pub mod error;
pub mod evaluator;
pub mod thresholds;
pub mod volatility;

pub use error::{RiskError, RiskResult};
pub use evaluator::{RiskEvaluator, RiskVerdict};
pub use thresholds::{RiskThresholds, StaleDataPolicy};
pub use volatility::sample_volatility;
