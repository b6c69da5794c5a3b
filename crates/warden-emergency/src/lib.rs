//! Emergency halt state machine for the warden trading executor.
//!
//! A single owned instance is injected into every component that needs to
//! read or trigger the halt state; there is no ambient global flag. The
//! state is persisted durably before a transition is considered committed
//! and recovered on restart.
//!
//! The system prioritizes stopping over trading when in doubt: once
//! Halted, no new position-opening order is accepted until an explicit,
//! authorized recovery re-validates system health.

pub mod error;
pub mod machine;
pub mod monitor;
pub mod state;
pub mod store;

pub use error::{EmergencyError, EmergencyResult};
pub use machine::{EmergencyConfig, EmergencyStateMachine};
pub use monitor::{HealthReport, SignalMonitor};
pub use state::{EmergencyState, HaltReason, PositionSnapshot, StateRecord, STATE_RECORD_VERSION};
pub use store::StateStore;
