//! Error types for warden-emergency.

use thiserror::Error;

/// Emergency subsystem errors.
#[derive(Debug, Error)]
pub enum EmergencyError {
    #[error("State persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Corrupted state record: {0}")]
    CorruptState(String),

    #[error("Resume blocked: {0}")]
    ResumeBlocked(String),
}

/// Result type alias for emergency operations.
pub type EmergencyResult<T> = Result<T, EmergencyError>;
