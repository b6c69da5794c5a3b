//! Health and market-signal intake for the emergency machine.
//!
//! Runs independently of order flow: the collaborators push health reports
//! and market samples at their own cadence, and a trigger may halt the
//! system at any time, including while an order is mid-evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use warden_core::{InstrumentId, Price};

use crate::machine::EmergencyStateMachine;
use crate::state::HaltReason;

/// Health snapshot supplied by the health collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    /// Age of the freshest market data, in milliseconds.
    pub market_data_age_ms: i64,
    /// Whether the broker connection is up.
    pub broker_connected: bool,
    /// Observed round-trip latency in milliseconds.
    pub latency_ms: i64,
}

struct Baseline {
    price_ewma: Decimal,
    volume_ewma: Decimal,
}

/// Evaluates incoming signals against the machine's trigger thresholds.
///
/// Per-instrument EWMA baselines detect abnormal price moves and volume
/// spikes. Baselines are only updated from samples that did not trigger,
/// so an anomalous sample cannot drag its own baseline toward itself.
pub struct SignalMonitor {
    machine: Arc<EmergencyStateMachine>,
    baselines: Mutex<HashMap<InstrumentId, Baseline>>,
}

impl SignalMonitor {
    /// Create a monitor feeding the given machine.
    #[must_use]
    pub fn new(machine: Arc<EmergencyStateMachine>) -> Self {
        Self {
            machine,
            baselines: Mutex::new(HashMap::new()),
        }
    }

    /// Ingest a health report, halting on any violated threshold.
    pub fn on_health_report(&self, report: &HealthReport) {
        let config = self.machine.config();

        if report.market_data_age_ms > config.max_data_age_ms {
            self.trigger(HaltReason::StaleMarketData {
                age_ms: report.market_data_age_ms,
                max_age_ms: config.max_data_age_ms,
            });
            return;
        }
        if !report.broker_connected {
            self.trigger(HaltReason::BrokerDisconnected);
            return;
        }
        if report.latency_ms > config.max_latency_ms {
            self.trigger(HaltReason::HighLatency {
                latency_ms: report.latency_ms,
                max_ms: config.max_latency_ms,
            });
        }
    }

    /// Ingest a market sample (last trade price + interval volume).
    ///
    /// The first sample for an instrument seeds the baseline and cannot
    /// trigger.
    pub fn on_market_sample(&self, instrument: &InstrumentId, price: Price, volume: Decimal) {
        let config = self.machine.config();
        let mut baselines = self.baselines.lock();

        let baseline = match baselines.get_mut(instrument) {
            Some(b) => b,
            None => {
                baselines.insert(
                    instrument.clone(),
                    Baseline {
                        price_ewma: price.inner(),
                        volume_ewma: volume,
                    },
                );
                debug!(%instrument, %price, %volume, "Baseline seeded");
                return;
            }
        };

        if !baseline.price_ewma.is_zero() {
            let move_pct = (price.inner() - baseline.price_ewma).abs() / baseline.price_ewma;
            if move_pct > config.max_price_move_pct {
                self.trigger(HaltReason::PriceAnomaly {
                    instrument: instrument.clone(),
                    move_pct,
                    max_pct: config.max_price_move_pct,
                });
                return;
            }
        }

        if !baseline.volume_ewma.is_zero()
            && volume > config.volume_spike_multiple * baseline.volume_ewma
        {
            self.trigger(HaltReason::VolumeAnomaly {
                instrument: instrument.clone(),
                volume,
                baseline: baseline.volume_ewma,
            });
            return;
        }

        // Normal sample: fold it into the baselines.
        let alpha = config.baseline_alpha;
        baseline.price_ewma = alpha * price.inner() + (Decimal::ONE - alpha) * baseline.price_ewma;
        baseline.volume_ewma = alpha * volume + (Decimal::ONE - alpha) * baseline.volume_ewma;
    }

    fn trigger(&self, reason: HaltReason) {
        // A persistence failure is already logged and the in-memory state
        // blocks trading either way.
        if let Err(e) = self.machine.halt(reason) {
            warn!(error = %e, "Halt persistence failed from signal monitor");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::EmergencyConfig;
    use crate::store::StateStore;
    use rust_decimal_macros::dec;
    use warden_ledger::{DailyLossTracker, PositionLedger};

    fn monitor_in(dir: &tempfile::TempDir) -> (SignalMonitor, Arc<EmergencyStateMachine>) {
        let store = StateStore::new(dir.path().join("emergency_state.json"));
        let ledger = Arc::new(PositionLedger::new(Arc::new(DailyLossTracker::new())));
        let machine = Arc::new(EmergencyStateMachine::recover(
            store,
            ledger,
            EmergencyConfig::default(),
        ));
        (SignalMonitor::new(machine.clone()), machine)
    }

    #[test]
    fn test_healthy_report_no_halt() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);

        monitor.on_health_report(&HealthReport {
            market_data_age_ms: 100,
            broker_connected: true,
            latency_ms: 50,
        });
        assert!(!machine.is_halted());
    }

    #[test]
    fn test_stale_data_halts() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);

        monitor.on_health_report(&HealthReport {
            market_data_age_ms: 60_000,
            broker_connected: true,
            latency_ms: 50,
        });
        assert!(machine.is_halted());
        assert!(machine.halt_reason().unwrap().starts_with("stale market data"));
    }

    #[test]
    fn test_disconnect_halts() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);

        monitor.on_health_report(&HealthReport {
            market_data_age_ms: 100,
            broker_connected: false,
            latency_ms: 50,
        });
        assert!(machine.is_halted());
    }

    #[test]
    fn test_high_latency_halts() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);

        monitor.on_health_report(&HealthReport {
            market_data_age_ms: 100,
            broker_connected: true,
            latency_ms: 5000,
        });
        assert!(machine.is_halted());
        assert!(machine.halt_reason().unwrap().starts_with("latency"));
    }

    #[test]
    fn test_first_sample_seeds_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);

        // Wild first price cannot trigger: there is no baseline yet.
        monitor.on_market_sample(&"BTC-USD".into(), Price::new(dec!(99999)), dec!(1));
        assert!(!machine.is_halted());
    }

    #[test]
    fn test_price_anomaly_halts() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);
        let instrument = InstrumentId::from("BTC-USD");

        monitor.on_market_sample(&instrument, Price::new(dec!(100)), dec!(10));
        // 20% jump vs 10% threshold.
        monitor.on_market_sample(&instrument, Price::new(dec!(120)), dec!(10));
        assert!(machine.is_halted());
        assert!(machine.halt_reason().unwrap().starts_with("price anomaly"));
    }

    #[test]
    fn test_volume_spike_halts() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);
        let instrument = InstrumentId::from("BTC-USD");

        monitor.on_market_sample(&instrument, Price::new(dec!(100)), dec!(10));
        // 200 > 10x baseline of 10.
        monitor.on_market_sample(&instrument, Price::new(dec!(100)), dec!(200));
        assert!(machine.is_halted());
        assert!(machine.halt_reason().unwrap().starts_with("volume anomaly"));
    }

    #[test]
    fn test_normal_drift_updates_baseline_without_halt() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, machine) = monitor_in(&dir);
        let instrument = InstrumentId::from("BTC-USD");

        monitor.on_market_sample(&instrument, Price::new(dec!(100)), dec!(10));
        for i in 1..=20 {
            let price = Price::new(dec!(100) + Decimal::from(i));
            monitor.on_market_sample(&instrument, price, dec!(10));
        }
        assert!(!machine.is_halted());
    }
}
