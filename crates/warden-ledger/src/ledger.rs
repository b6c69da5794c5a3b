//! The position ledger: an arena of positions keyed by instrument id.
//!
//! All access goes through the ledger's methods; components never mutate
//! position fields directly. Each instrument's read-then-write sequence
//! runs under that instrument's map entry, giving single-writer-at-a-time
//! semantics per instrument without a global lock.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use warden_core::{Fill, InstrumentId, Price};

use crate::daily_loss::DailyLossTracker;
use crate::error::LedgerResult;
use crate::position::Position;

/// Authoritative per-instrument position ledger.
pub struct PositionLedger {
    positions: DashMap<InstrumentId, Position>,
    daily_loss: Arc<DailyLossTracker>,
}

impl PositionLedger {
    /// Create an empty ledger wired to a daily loss tracker.
    #[must_use]
    pub fn new(daily_loss: Arc<DailyLossTracker>) -> Self {
        Self {
            positions: DashMap::new(),
            daily_loss,
        }
    }

    /// Apply a confirmed fill and return the updated position snapshot.
    ///
    /// Creates the position on first fill for an instrument. Realized
    /// losses and profits are forwarded to the daily loss tracker. An
    /// invariant violation is returned to the caller, never corrected.
    pub fn apply_fill(&self, fill: &Fill) -> LedgerResult<Position> {
        // The entry guard is the per-instrument critical section.
        let mut entry = self
            .positions
            .entry(fill.instrument.clone())
            .or_insert_with(|| Position::flat(fill.instrument.clone()));

        let outcome = match entry.apply_fill(fill) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    instrument = %fill.instrument,
                    error = %e,
                    "Fill application failed"
                );
                return Err(e);
            }
        };

        if !outcome.realized_delta.is_zero() {
            self.daily_loss.record_realized(outcome.realized_delta);
        }

        debug!(
            instrument = %fill.instrument,
            qty = %outcome.position.qty,
            avg_entry = %outcome.position.avg_entry_price,
            realized = %outcome.realized_delta,
            "Fill applied"
        );

        Ok(outcome.position)
    }

    /// Current snapshot for an instrument.
    ///
    /// Absent instruments return a flat position, never an error.
    #[must_use]
    pub fn get_position(&self, instrument: &InstrumentId) -> Position {
        self.positions
            .get(instrument)
            .map(|p| p.clone())
            .unwrap_or_else(|| Position::flat(instrument.clone()))
    }

    /// Total exposure: sum of |qty| * current_price across instruments.
    ///
    /// Instruments with no supplied price fall back to their average entry
    /// price.
    #[must_use]
    pub fn total_exposure(&self, prices: &HashMap<InstrumentId, Price>) -> Decimal {
        let mut total = Decimal::ZERO;

        for entry in self.positions.iter() {
            let pos = entry.value();
            if pos.is_flat() {
                continue;
            }
            match prices.get(&pos.instrument) {
                Some(px) => total += pos.exposure(*px),
                None => {
                    total += pos.exposure(pos.avg_entry_price);
                    warn!(
                        instrument = %pos.instrument,
                        "No current price for position, using entry price"
                    );
                }
            }
        }

        total
    }

    /// Snapshot of all non-flat positions.
    #[must_use]
    pub fn positions_snapshot(&self) -> Vec<Position> {
        self.positions
            .iter()
            .filter(|e| !e.value().is_flat())
            .map(|e| e.value().clone())
            .collect()
    }

    /// The daily loss tracker fed by this ledger.
    #[must_use]
    pub fn daily_loss(&self) -> &Arc<DailyLossTracker> {
        &self.daily_loss
    }
}
