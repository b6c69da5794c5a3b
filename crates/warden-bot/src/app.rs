//! Application wiring and lifecycle.
//!
//! Builds the component graph: ledger → emergency machine (with durable
//! recovery) → signal monitor → gateway over the paper broker. External
//! collaborators (market data, health) push their signals through the
//! exposed handles; the run loop only refreshes telemetry gauges and
//! handles shutdown.

use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{info, warn};

use warden_emergency::{
    EmergencyStateMachine, HaltReason, HealthReport, SignalMonitor, StateStore,
};
use warden_gateway::{ExecutionGateway, PaperBroker};
use warden_ledger::{DailyLossTracker, PositionLedger};
use warden_telemetry::metrics::{DAILY_REALIZED_LOSS, EMERGENCY_HALTED};

use crate::config::AppConfig;
use crate::error::AppResult;

/// The assembled trading executor.
pub struct Application {
    config: AppConfig,
    ledger: Arc<PositionLedger>,
    emergency: Arc<EmergencyStateMachine>,
    monitor: Arc<SignalMonitor>,
    gateway: Arc<ExecutionGateway>,
    broker: Arc<PaperBroker>,
}

impl Application {
    /// Wire all components, recovering the emergency state from disk.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let ledger = Arc::new(PositionLedger::new(Arc::new(DailyLossTracker::new())));

        let store = StateStore::new(config.emergency.state_path.clone());
        let emergency = Arc::new(EmergencyStateMachine::recover(
            store,
            ledger.clone(),
            config.emergency.clone(),
        ));
        if emergency.is_halted() {
            warn!(
                reason = ?emergency.halt_reason(),
                "Starting in Halted state, awaiting explicit recovery"
            );
        }

        let monitor = Arc::new(SignalMonitor::new(emergency.clone()));
        let broker = Arc::new(PaperBroker::new());
        let gateway = Arc::new(ExecutionGateway::new(
            emergency.clone(),
            config.risk.clone(),
            ledger.clone(),
            broker.clone(),
            config.gateway.clone(),
        ));

        Ok(Self {
            config,
            ledger,
            emergency,
            monitor,
            gateway,
            broker,
        })
    }

    /// The order entry point for strategy/rebalancing callers.
    #[must_use]
    pub fn gateway(&self) -> Arc<ExecutionGateway> {
        self.gateway.clone()
    }

    /// The position ledger (read-only use from outside).
    #[must_use]
    pub fn ledger(&self) -> Arc<PositionLedger> {
        self.ledger.clone()
    }

    /// Signal intake for the health and market data collaborators.
    #[must_use]
    pub fn signal_monitor(&self) -> Arc<SignalMonitor> {
        self.monitor.clone()
    }

    /// The paper broker backing this instance.
    #[must_use]
    pub fn broker(&self) -> Arc<PaperBroker> {
        self.broker.clone()
    }

    /// Operator halt.
    pub fn halt(&self, message: impl Into<String>) -> AppResult<()> {
        self.emergency.halt(HaltReason::Manual {
            message: message.into(),
        })?;
        Ok(())
    }

    /// Operator recovery, re-validating the supplied health report.
    pub fn resume(&self, health: &HealthReport) -> AppResult<()> {
        self.emergency.resume(health)?;
        Ok(())
    }

    /// Run until shutdown, refreshing telemetry gauges periodically.
    /// State is persisted once more on the way out.
    pub async fn run(&self) -> AppResult<()> {
        info!("Warden executor running");
        let mut tick = interval(Duration::from_millis(self.config.telemetry_interval_ms));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.refresh_gauges();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        if let Err(e) = self.emergency.persist_state() {
            warn!(error = %e, "Could not persist emergency state on shutdown");
        }
        info!("Warden executor stopped");
        Ok(())
    }

    fn refresh_gauges(&self) {
        EMERGENCY_HALTED.set(if self.emergency.is_halted() { 1.0 } else { 0.0 });

        let loss = self.ledger.daily_loss().current_loss();
        DAILY_REALIZED_LOSS.set(loss.to_string().parse::<f64>().unwrap_or(0.0));
    }
}
