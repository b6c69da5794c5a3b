//! Authoritative position ledger for the warden trading executor.
//!
//! All position state is owned here and mutated exclusively through the
//! ledger's methods in response to confirmed fills. Other components read
//! snapshots; nothing mutates position fields directly.

pub mod daily_loss;
pub mod error;
pub mod ledger;
pub mod position;

pub use daily_loss::DailyLossTracker;
pub use error::{LedgerError, LedgerResult};
pub use ledger::PositionLedger;
pub use position::{FillOutcome, Position};
