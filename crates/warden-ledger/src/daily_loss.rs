//! Daily realized-loss accumulator.
//!
//! Tracks the running net realized loss for the current UTC trading day.
//! Profits offset losses; the risk evaluator compares the net loss against
//! the configured daily limit. The accumulator resets exactly once per day
//! boundary, on the first record or read after UTC midnight.

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};

struct DayState {
    day: NaiveDate,
    /// Net realized loss so far today. Positive = net loss.
    net_loss: Decimal,
}

/// Thread-safe daily loss tracker.
pub struct DailyLossTracker {
    inner: Mutex<DayState>,
}

impl DailyLossTracker {
    /// Create a tracker starting at zero for the current UTC day.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DayState {
                day: Utc::now().date_naive(),
                net_loss: Decimal::ZERO,
            }),
        }
    }

    /// Record a realized P&L event (positive = profit, negative = loss).
    pub fn record_realized(&self, pnl: Decimal) {
        self.record_realized_on(pnl, Utc::now().date_naive());
    }

    /// Record a realized P&L event against an explicit UTC day.
    pub fn record_realized_on(&self, pnl: Decimal, today: NaiveDate) {
        let mut state = self.inner.lock();
        Self::roll(&mut state, today);

        state.net_loss -= pnl;
        debug!(pnl = %pnl, net_loss = %state.net_loss, "Realized P&L recorded");
    }

    /// Net realized loss for the current UTC day. Negative values mean the
    /// day is net profitable.
    #[must_use]
    pub fn current_loss(&self) -> Decimal {
        self.current_loss_on(Utc::now().date_naive())
    }

    /// Net realized loss as of an explicit UTC day.
    #[must_use]
    pub fn current_loss_on(&self, today: NaiveDate) -> Decimal {
        let mut state = self.inner.lock();
        Self::roll(&mut state, today);
        state.net_loss
    }

    fn roll(state: &mut DayState, today: NaiveDate) {
        if state.day != today {
            info!(
                previous_day = %state.day,
                previous_loss = %state.net_loss,
                "Daily loss accumulator reset"
            );
            state.day = today;
            state.net_loss = Decimal::ZERO;
        }
    }
}

impl Default for DailyLossTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_losses_accumulate() {
        let tracker = DailyLossTracker::new();
        let d = day("2026-08-06");

        tracker.record_realized_on(dec!(-30), d);
        tracker.record_realized_on(dec!(-20), d);
        assert_eq!(tracker.current_loss_on(d), dec!(50));
    }

    #[test]
    fn test_profits_offset_losses() {
        let tracker = DailyLossTracker::new();
        let d = day("2026-08-06");

        tracker.record_realized_on(dec!(-80), d);
        tracker.record_realized_on(dec!(50), d);
        assert_eq!(tracker.current_loss_on(d), dec!(30));
    }

    #[test]
    fn test_net_profitable_day_is_negative_loss() {
        let tracker = DailyLossTracker::new();
        let d = day("2026-08-06");

        tracker.record_realized_on(dec!(100), d);
        assert_eq!(tracker.current_loss_on(d), dec!(-100));
    }

    #[test]
    fn test_reset_on_day_boundary() {
        let tracker = DailyLossTracker::new();

        tracker.record_realized_on(dec!(-75), day("2026-08-06"));
        assert_eq!(tracker.current_loss_on(day("2026-08-06")), dec!(75));

        // Next day: reset happens exactly once, on first observation.
        assert_eq!(tracker.current_loss_on(day("2026-08-07")), Decimal::ZERO);
        tracker.record_realized_on(dec!(-10), day("2026-08-07"));
        assert_eq!(tracker.current_loss_on(day("2026-08-07")), dec!(10));
    }
}
