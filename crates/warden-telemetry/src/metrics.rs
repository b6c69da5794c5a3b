//! Prometheus metrics for the execution core.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration
//! fails, it indicates a fatal configuration error (e.g., duplicate metric
//! names) that should crash at startup rather than fail silently. These
//! panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Gauge, Histogram,
};

/// Total order requests received by the gateway.
pub static ORDERS_SUBMITTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "warden_orders_submitted_total",
        "Total order requests received by the gateway"
    )
    .unwrap()
});

/// Total filled orders.
pub static ORDERS_FILLED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("warden_orders_filled_total", "Total filled orders").unwrap()
});

/// Total rejected orders, by reason code.
pub static ORDERS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "warden_orders_rejected_total",
        "Total rejected orders by reason code",
        &["reason"]
    )
    .unwrap()
});

/// Total indeterminate order outcomes.
pub static ORDERS_INDETERMINATE_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "warden_orders_indeterminate_total",
        "Total order submissions with unknown broker outcome"
    )
    .unwrap()
});

/// Emergency halt state (1 = halted, 0 = normal).
pub static EMERGENCY_HALTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "warden_emergency_halted",
        "Emergency halt state (1=halted)"
    )
    .unwrap()
});

/// Broker submit latency in milliseconds.
pub static BROKER_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "warden_broker_latency_ms",
        "Broker submit latency in milliseconds",
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// Net realized loss for the current day (USD).
pub static DAILY_REALIZED_LOSS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "warden_daily_realized_loss",
        "Net realized loss for the current UTC day"
    )
    .unwrap()
});
