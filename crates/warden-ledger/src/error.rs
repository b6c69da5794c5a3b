//! Error types for warden-ledger.

use thiserror::Error;

/// Ledger error types.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Invalid fill: {0}")]
    InvalidFill(String),

    /// Fatal: position state no longer satisfies its invariants.
    ///
    /// Never corrected silently; the caller is expected to halt trading.
    #[error("Position invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
