//! Application configuration.
//!
//! A static TOML file loaded once at startup. Reconfiguration means a
//! restart; nothing reloads thresholds at runtime.

use serde::{Deserialize, Serialize};

use warden_emergency::EmergencyConfig;
use warden_gateway::GatewayConfig;
use warden_risk::RiskThresholds;

use crate::error::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// How often the run loop refreshes telemetry gauges (ms).
    /// Declared before the table sections so TOML serialization emits
    /// top-level values first.
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,

    /// Risk thresholds for the evaluator.
    #[serde(default)]
    pub risk: RiskThresholds,

    /// Emergency trigger thresholds, exposure ceiling, and state path.
    #[serde(default)]
    pub emergency: EmergencyConfig,

    /// Gateway timeouts.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_telemetry_interval_ms() -> u64 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telemetry_interval_ms: default_telemetry_interval_ms(),
            risk: RiskThresholds::default(),
            emergency: EmergencyConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the config path (CLI arg, then WARDEN_CONFIG, then the
    /// default location) and load it. A missing default file yields the
    /// built-in defaults.
    pub fn load(cli_path: Option<String>) -> AppResult<Self> {
        let path = cli_path
            .or_else(|| std::env::var("WARDEN_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        if !std::path::Path::new(&path).exists() {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {path}: {e}")))?;
        toml::from_str(&content).map_err(|e| AppError::Config(format!("cannot parse {path}: {e}")))
    }
}
