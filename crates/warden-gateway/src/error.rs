//! Error types for warden-gateway.

use thiserror::Error;

use crate::broker::BrokerError;

/// Gateway errors (distinct from order rejections, which are results).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] warden_ledger::LedgerError),
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
