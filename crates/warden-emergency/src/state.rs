//! Emergency state and its durable record format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use rust_decimal::Decimal;
use warden_core::{InstrumentId, Price, Qty};
use warden_ledger::Position;

/// Current version of the persisted record format.
pub const STATE_RECORD_VERSION: u32 = 1;

/// Reason for an emergency halt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// Market data older than the configured maximum.
    StaleMarketData { age_ms: i64, max_age_ms: i64 },
    /// Broker connectivity lost.
    BrokerDisconnected,
    /// Order/data latency beyond threshold.
    HighLatency { latency_ms: i64, max_ms: i64 },
    /// Price moved beyond the configured fraction of its recent baseline.
    PriceAnomaly {
        instrument: InstrumentId,
        move_pct: Decimal,
        max_pct: Decimal,
    },
    /// Volume spiked beyond the configured multiple of its recent baseline.
    VolumeAnomaly {
        instrument: InstrumentId,
        volume: Decimal,
        baseline: Decimal,
    },
    /// Explicit operator halt.
    Manual { message: String },
    /// Persisted state could not be read on recovery.
    CorruptedState { detail: String },
    /// A fatal invariant violation was detected downstream.
    InvariantViolation { detail: String },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleMarketData { age_ms, max_age_ms } => {
                write!(f, "stale market data: {age_ms}ms > {max_age_ms}ms max")
            }
            Self::BrokerDisconnected => write!(f, "broker connectivity lost"),
            Self::HighLatency { latency_ms, max_ms } => {
                write!(f, "latency {latency_ms}ms > {max_ms}ms max")
            }
            Self::PriceAnomaly {
                instrument,
                move_pct,
                max_pct,
            } => write!(
                f,
                "price anomaly on {instrument}: move {move_pct} > {max_pct} of baseline"
            ),
            Self::VolumeAnomaly {
                instrument,
                volume,
                baseline,
            } => write!(
                f,
                "volume anomaly on {instrument}: {volume} vs baseline {baseline}"
            ),
            Self::Manual { message } => write!(f, "manual: {message}"),
            Self::CorruptedState { detail } => write!(f, "corrupted state record: {detail}"),
            Self::InvariantViolation { detail } => write!(f, "invariant violation: {detail}"),
        }
    }
}

/// Minimal position snapshot captured at halt time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub instrument: InstrumentId,
    pub qty: Qty,
    pub avg_entry_price: Price,
}

impl From<&Position> for PositionSnapshot {
    fn from(pos: &Position) -> Self {
        Self {
            instrument: pos.instrument.clone(),
            qty: pos.qty,
            avg_entry_price: pos.avg_entry_price,
        }
    }
}

/// Process-wide emergency state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EmergencyState {
    /// Trading allowed, subject to risk evaluation.
    Normal,
    /// All new position-opening orders are rejected.
    Halted {
        /// Human-readable halt reason.
        reason: String,
        /// When the halt was triggered.
        halted_at: DateTime<Utc>,
        /// Open positions at halt time.
        positions: Vec<PositionSnapshot>,
    },
}

impl EmergencyState {
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }

    /// The halt reason, if halted.
    pub fn halt_reason(&self) -> Option<&str> {
        match self {
            Self::Normal => None,
            Self::Halted { reason, .. } => Some(reason),
        }
    }
}

/// The durable record written to the state store.
///
/// Self-describing JSON with an explicit version field so a recovering
/// process can detect format drift instead of misreading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub version: u32,
    pub state: EmergencyState,
    pub persisted_at: DateTime<Utc>,
}

impl StateRecord {
    #[must_use]
    pub fn new(state: EmergencyState) -> Self {
        Self {
            version: STATE_RECORD_VERSION,
            state,
            persisted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_state_helpers() {
        assert!(!EmergencyState::Normal.is_halted());
        assert!(EmergencyState::Normal.halt_reason().is_none());

        let halted = EmergencyState::Halted {
            reason: "manual: test".to_string(),
            halted_at: Utc::now(),
            positions: vec![],
        };
        assert!(halted.is_halted());
        assert_eq!(halted.halt_reason(), Some("manual: test"));
    }

    #[test]
    fn test_record_roundtrip() {
        let record = StateRecord::new(EmergencyState::Halted {
            reason: "stale market data: 9000ms > 5000ms max".to_string(),
            halted_at: Utc::now(),
            positions: vec![PositionSnapshot {
                instrument: "BTC-USD".into(),
                qty: Qty::new(dec!(1.5)),
                avg_entry_price: Price::new(dec!(106.67)),
            }],
        });

        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: StateRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.version, STATE_RECORD_VERSION);
    }

    #[test]
    fn test_halt_reason_display() {
        let cases = [
            (
                HaltReason::StaleMarketData {
                    age_ms: 9000,
                    max_age_ms: 5000,
                },
                "stale market data: 9000ms > 5000ms max",
            ),
            (HaltReason::BrokerDisconnected, "broker connectivity lost"),
            (
                HaltReason::Manual {
                    message: "operator".to_string(),
                },
                "manual: operator",
            ),
        ];

        for (reason, expected) in cases {
            assert_eq!(reason.to_string(), expected);
        }
    }
}
