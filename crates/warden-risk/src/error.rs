//! Error types for warden-risk.

use thiserror::Error;

/// Risk subsystem errors.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),
}

/// Result type alias for risk operations.
pub type RiskResult<T> = Result<T, RiskError>;
