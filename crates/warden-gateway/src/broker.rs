//! The broker collaborator seam.
//!
//! The gateway treats the broker as untrusted: every call has a bounded
//! timeout, and errors are split by whether the broker confirmed
//! non-execution. Confirmed failures become rejections; anything else is
//! an unknown outcome and surfaces as Indeterminate.

use async_trait::async_trait;
use thiserror::Error;

use warden_core::{ClientOrderId, Fill, OrderRequest};

/// Broker-side failure taxonomy.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// Broker confirmed it did not execute the order.
    #[error("order rejected [{code}]: {message}")]
    Rejected { code: String, message: String },

    /// The order was never sent (connection refused up front).
    #[error("broker unreachable: {0}")]
    Unreachable(String),

    /// No response within the deadline; the outcome is unknown.
    #[error("broker timeout after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Connection dropped after the order was sent; the outcome is unknown.
    #[error("broker connection lost: {0}")]
    ConnectionLost(String),
}

impl BrokerError {
    /// True when the broker confirmed the order did not execute, so the
    /// caller may safely treat the order as rejected.
    #[must_use]
    pub fn is_confirmed_failure(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Unreachable(_))
    }
}

/// Status of a previously submitted order, for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    /// The broker has no record of this order.
    Unknown,
    /// Accepted, not yet filled.
    Open,
    /// Executed.
    Filled(Fill),
    /// Cancelled without execution.
    Cancelled,
    /// Rejected without execution.
    Rejected { code: String, message: String },
}

/// Broker/exchange client collaborator.
///
/// Implementations submit orders and answer status queries. The gateway
/// never retries through this trait: retry policy belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Submit an order for execution.
    async fn submit_order(&self, order: &OrderRequest) -> Result<Fill, BrokerError>;

    /// Query the status of a previously submitted order.
    async fn get_order_status(&self, id: &ClientOrderId) -> Result<OrderStatus, BrokerError>;
}
