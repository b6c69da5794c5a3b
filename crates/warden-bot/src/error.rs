//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Emergency error: {0}")]
    Emergency(#[from] warden_emergency::EmergencyError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] warden_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
