//! The emergency state machine.
//!
//! All transitions and persistence run under one global critical section.
//! `Normal -> Halted` is a latch: a second trigger keeps the original
//! reason. `Halted -> Normal` only happens through an explicit `resume`
//! call that re-validates system health; there is no automatic recovery.

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use warden_core::{Price, Qty, RejectReason};
use warden_ledger::PositionLedger;

use crate::error::{EmergencyError, EmergencyResult};
use crate::monitor::HealthReport;
use crate::state::{EmergencyState, HaltReason, PositionSnapshot, StateRecord};
use crate::store::StateStore;

/// Emergency machine configuration: the hard exposure ceiling plus the
/// trigger thresholds evaluated by the signal monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// Path of the durable state record.
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Hard ceiling on total exposure, independent of per-instrument
    /// limits. 0 disables the check.
    #[serde(default = "default_max_total_exposure")]
    pub max_total_exposure: Decimal,

    /// Maximum market-data age in milliseconds before halting.
    #[serde(default = "default_max_data_age_ms")]
    pub max_data_age_ms: i64,

    /// Maximum tolerated latency in milliseconds before halting.
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: i64,

    /// Price move, as a fraction of the EWMA baseline, that triggers a
    /// halt. Default: 0.1 (10%).
    #[serde(default = "default_max_price_move_pct")]
    pub max_price_move_pct: Decimal,

    /// Volume spike multiple over the EWMA baseline that triggers a halt.
    #[serde(default = "default_volume_spike_multiple")]
    pub volume_spike_multiple: Decimal,

    /// EWMA decay factor for the anomaly baselines.
    #[serde(default = "default_baseline_alpha")]
    pub baseline_alpha: Decimal,
}

fn default_state_path() -> String {
    "state/emergency_state.json".to_string()
}

fn default_max_total_exposure() -> Decimal {
    Decimal::from(250_000)
}

fn default_max_data_age_ms() -> i64 {
    5000
}

fn default_max_latency_ms() -> i64 {
    1000
}

fn default_max_price_move_pct() -> Decimal {
    Decimal::new(1, 1) // 0.1 = 10%
}

fn default_volume_spike_multiple() -> Decimal {
    Decimal::from(10)
}

fn default_baseline_alpha() -> Decimal {
    Decimal::new(5, 2) // 0.05 = slow adaptation
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            max_total_exposure: default_max_total_exposure(),
            max_data_age_ms: default_max_data_age_ms(),
            max_latency_ms: default_max_latency_ms(),
            max_price_move_pct: default_max_price_move_pct(),
            volume_spike_multiple: default_volume_spike_multiple(),
            baseline_alpha: default_baseline_alpha(),
        }
    }
}

/// Process-wide halt controller.
///
/// Thread-safe: shared across components via `Arc<EmergencyStateMachine>`.
pub struct EmergencyStateMachine {
    state: Mutex<EmergencyState>,
    store: StateStore,
    ledger: Arc<PositionLedger>,
    config: EmergencyConfig,
}

impl EmergencyStateMachine {
    /// Build the machine by recovering the last durable state.
    ///
    /// Absent record: start Normal. Halted record: stay Halted until
    /// explicitly cleared. Unreadable record: start Halted — operating on
    /// state we cannot trust is exactly what the halt exists to prevent.
    pub fn recover(store: StateStore, ledger: Arc<PositionLedger>, config: EmergencyConfig) -> Self {
        let state = match store.load() {
            Ok(None) => {
                info!("No persisted emergency state, starting Normal");
                EmergencyState::Normal
            }
            Ok(Some(record)) => {
                if let Some(reason) = record.state.halt_reason() {
                    warn!(reason, "Recovered in Halted state, trading blocked");
                }
                record.state
            }
            Err(e) => {
                let reason = HaltReason::CorruptedState {
                    detail: e.to_string(),
                };
                error!(error = %e, "Emergency state unreadable, starting Halted");
                EmergencyState::Halted {
                    reason: reason.to_string(),
                    halted_at: chrono::Utc::now(),
                    positions: Vec::new(),
                }
            }
        };

        let machine = Self {
            state: Mutex::new(state),
            store,
            ledger,
            config,
        };

        // Make the recovered decision durable (replaces a corrupt record).
        if let Err(e) = machine.persist_state() {
            warn!(error = %e, "Could not persist recovered emergency state");
        }

        machine
    }

    /// Check if the system is currently halted.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state.lock().is_halted()
    }

    /// The current halt reason, if halted.
    #[must_use]
    pub fn halt_reason(&self) -> Option<String> {
        self.state.lock().halt_reason().map(str::to_string)
    }

    /// A clone of the current state.
    #[must_use]
    pub fn state_snapshot(&self) -> EmergencyState {
        self.state.lock().clone()
    }

    /// The machine's configuration.
    #[must_use]
    pub fn config(&self) -> &EmergencyConfig {
        &self.config
    }

    /// Transition `Normal -> Halted`.
    ///
    /// If already halted, keeps the original reason. The open-position
    /// snapshot is captured and the record persisted inside the critical
    /// section. A persistence failure is returned to the caller, but the
    /// in-memory state is Halted regardless: under uncertainty the safe
    /// default is to stop trading.
    pub fn halt(&self, reason: HaltReason) -> EmergencyResult<()> {
        let mut state = self.state.lock();

        if state.is_halted() {
            warn!(new_reason = %reason, "Already halted, keeping original reason");
            return Ok(());
        }

        let positions: Vec<PositionSnapshot> = self
            .ledger
            .positions_snapshot()
            .iter()
            .map(PositionSnapshot::from)
            .collect();

        *state = EmergencyState::Halted {
            reason: reason.to_string(),
            halted_at: chrono::Utc::now(),
            positions,
        };
        error!(reason = %reason, "EMERGENCY HALT TRIGGERED");

        let record = StateRecord::new(state.clone());
        if let Err(e) = self.store.persist(&record) {
            error!(error = %e, "Halt could not be persisted, blocking on in-memory state");
            return Err(e);
        }
        Ok(())
    }

    /// Explicit, authorized `Halted -> Normal` transition.
    ///
    /// Health and data freshness are re-validated first; a report that
    /// would itself trigger a halt blocks the resume. The transition is
    /// only committed once the Normal record is durable.
    pub fn resume(&self, health: &HealthReport) -> EmergencyResult<()> {
        let mut state = self.state.lock();

        if !state.is_halted() {
            debug!("Resume requested while Normal, nothing to do");
            return Ok(());
        }

        if health.market_data_age_ms > self.config.max_data_age_ms {
            return Err(EmergencyError::ResumeBlocked(format!(
                "market data stale: {}ms > {}ms max",
                health.market_data_age_ms, self.config.max_data_age_ms
            )));
        }
        if !health.broker_connected {
            return Err(EmergencyError::ResumeBlocked(
                "broker not connected".to_string(),
            ));
        }
        if health.latency_ms > self.config.max_latency_ms {
            return Err(EmergencyError::ResumeBlocked(format!(
                "latency {}ms > {}ms max",
                health.latency_ms, self.config.max_latency_ms
            )));
        }

        let previous = std::mem::replace(&mut *state, EmergencyState::Normal);
        let record = StateRecord::new(EmergencyState::Normal);
        if let Err(e) = self.store.persist(&record) {
            // Not durable: the transition did not commit.
            *state = previous;
            error!(error = %e, "Resume could not be persisted, staying Halted");
            return Err(e);
        }

        info!("Normal operation restored");
        Ok(())
    }

    /// Gate a candidate position-opening order.
    ///
    /// Rejects unconditionally while Halted. While Normal, additionally
    /// rejects orders that would push total exposure above the hard
    /// ceiling; per-instrument limits are the risk evaluator's concern.
    pub fn validate_new_position(
        &self,
        size: Qty,
        price: Price,
        current_exposure: Decimal,
    ) -> Result<(), RejectReason> {
        let state = self.state.lock();

        if let Some(reason) = state.halt_reason() {
            return Err(RejectReason::Halted {
                reason: reason.to_string(),
            });
        }

        if !self.config.max_total_exposure.is_zero() {
            let projected = current_exposure + size.notional(price);
            if projected > self.config.max_total_exposure {
                return Err(RejectReason::ExposureCeiling {
                    projected,
                    ceiling: self.config.max_total_exposure,
                });
            }
        }

        Ok(())
    }

    /// Persist the current state.
    pub fn persist_state(&self) -> EmergencyResult<()> {
        let state = self.state.lock();
        self.store.persist(&StateRecord::new(state.clone()))
    }
}
