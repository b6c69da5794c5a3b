//! The execution gateway: the single entry point for order flow.
//!
//! # Submit Pipeline (Strict)
//!
//! 1. Emergency gate          → Rejected("halted: ...") / exposure ceiling
//! 2. Risk evaluation         → Rejected(reason unchanged)
//! 3. Broker submit (bounded) → Rejected (confirmed) / Indeterminate (unknown)
//! 4. Halt re-check           → Rejected before any fill is applied
//! 5. Ledger apply_fill       → Filled; invariant violation halts the system
//!
//! The per-instrument submission lock is held across the whole pipeline,
//! so a "snapshot, decide, commit" race between two orders on the same
//! instrument cannot occur: the second order re-evaluates against the
//! first one's fill. No retries happen here; a retry is a new request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use warden_core::{
    ClientOrderId, InstrumentId, MarketConditions, OrderRequest, OrderResult, Price, RejectReason,
};
use warden_emergency::{EmergencyStateMachine, HaltReason};
use warden_ledger::{LedgerError, PositionLedger};
use warden_risk::{RiskEvaluator, RiskThresholds, RiskVerdict};
use warden_telemetry::metrics::{
    BROKER_LATENCY_MS, ORDERS_FILLED_TOTAL, ORDERS_INDETERMINATE_TOTAL, ORDERS_REJECTED_TOTAL,
    ORDERS_SUBMITTED_TOTAL,
};

use crate::broker::{BrokerClient, BrokerError, OrderStatus};

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Deadline for a broker submission in milliseconds. After this the
    /// outcome is reported Indeterminate rather than blocking.
    #[serde(default = "default_broker_timeout_ms")]
    pub broker_timeout_ms: u64,
}

fn default_broker_timeout_ms() -> u64 {
    5000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            broker_timeout_ms: default_broker_timeout_ms(),
        }
    }
}

/// Orchestrator for the risk-gated execution pipeline.
pub struct ExecutionGateway {
    emergency: Arc<EmergencyStateMachine>,
    evaluator: RiskEvaluator,
    thresholds: RiskThresholds,
    ledger: Arc<PositionLedger>,
    broker: Arc<dyn BrokerClient>,
    /// One submission at a time per instrument, held across
    /// evaluate + submit + apply.
    submission_locks: DashMap<InstrumentId, Arc<tokio::sync::Mutex<()>>>,
    config: GatewayConfig,
}

impl ExecutionGateway {
    pub fn new(
        emergency: Arc<EmergencyStateMachine>,
        thresholds: RiskThresholds,
        ledger: Arc<PositionLedger>,
        broker: Arc<dyn BrokerClient>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            emergency,
            evaluator: RiskEvaluator::new(),
            thresholds,
            ledger,
            broker,
            submission_locks: DashMap::new(),
            config,
        }
    }

    /// Submit an order request through the full pipeline.
    ///
    /// `conditions` is the market snapshot for the order's instrument,
    /// supplied by the market data collaborator.
    ///
    /// Dropping the returned future before step 3 abandons the evaluation
    /// with no side effects; once the order is forwarded to the broker it
    /// is no longer cancelable from here.
    pub async fn submit(
        &self,
        order: &OrderRequest,
        conditions: &MarketConditions,
    ) -> OrderResult {
        ORDERS_SUBMITTED_TOTAL.inc();

        let lock = self
            .submission_locks
            .entry(order.instrument.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Step 1: emergency gate (halt state + hard exposure ceiling).
        let reference_price = order
            .effective_price(conditions.last_price)
            .unwrap_or(Price::ZERO);
        let exposure = self.current_exposure(order, conditions);
        if let Err(reason) =
            self.emergency
                .validate_new_position(order.size, reference_price, exposure)
        {
            return self.reject(order, reason);
        }

        // Step 2: risk evaluation against a fresh snapshot, taken under
        // the submission lock so it cannot go stale before the fill.
        let position = self.ledger.get_position(&order.instrument);
        let daily_loss = self.ledger.daily_loss().current_loss();
        if let RiskVerdict::Reject(reason) =
            self.evaluator
                .evaluate(order, &position, &self.thresholds, conditions, daily_loss)
        {
            return self.reject(order, reason);
        }

        // Step 3: broker submission with a bounded deadline.
        let started = Instant::now();
        let deadline = Duration::from_millis(self.config.broker_timeout_ms);
        let outcome = tokio::time::timeout(deadline, self.broker.submit_order(order)).await;
        BROKER_LATENCY_MS.observe(started.elapsed().as_millis() as f64);

        let fill = match outcome {
            Err(_) => {
                warn!(order = %order.id, timeout_ms = self.config.broker_timeout_ms,
                    "Broker deadline elapsed, outcome unknown");
                ORDERS_INDETERMINATE_TOTAL.inc();
                return OrderResult::indeterminate(
                    order.id.clone(),
                    format!(
                        "broker timeout after {}ms, reconcile via status query",
                        self.config.broker_timeout_ms
                    ),
                );
            }
            Ok(Err(e)) if e.is_confirmed_failure() => {
                let reason = match e {
                    BrokerError::Rejected { code, message } => {
                        RejectReason::Broker { code, message }
                    }
                    other => RejectReason::Broker {
                        code: "unreachable".to_string(),
                        message: other.to_string(),
                    },
                };
                return self.reject(order, reason);
            }
            Ok(Err(e)) => {
                warn!(order = %order.id, error = %e, "Broker outcome unknown");
                ORDERS_INDETERMINATE_TOTAL.inc();
                return OrderResult::indeterminate(order.id.clone(), e.to_string());
            }
            Ok(Ok(fill)) => fill,
        };

        // Step 4: a halt that became visible while the order was in
        // flight rejects it before any fill is applied.
        if let Some(reason) = self.emergency.halt_reason() {
            warn!(order = %order.id, reason = %reason,
                "Halt during in-flight order, fill discarded");
            return self.reject(order, RejectReason::Halted { reason });
        }

        // Step 5: ledger mutation. Corrupt state is fatal: halt and stop.
        match self.ledger.apply_fill(&fill) {
            Ok(position) => {
                ORDERS_FILLED_TOTAL.inc();
                info!(
                    order = %order.id,
                    instrument = %fill.instrument,
                    price = %fill.price,
                    size = %fill.size,
                    qty = %position.qty,
                    "Order filled"
                );
                OrderResult::filled(fill)
            }
            Err(LedgerError::InvariantViolation(detail)) => {
                // Never continue on corrupted position data.
                let _ = self.emergency.halt(HaltReason::InvariantViolation {
                    detail: detail.clone(),
                });
                self.reject(
                    order,
                    RejectReason::Halted {
                        reason: format!("invariant violation: {detail}"),
                    },
                )
            }
            Err(LedgerError::InvalidFill(detail)) => self.reject(
                order,
                RejectReason::Broker {
                    code: "invalid_fill".to_string(),
                    message: detail,
                },
            ),
        }
    }

    /// Resolve an Indeterminate outcome via the broker's status query.
    pub async fn reconcile(&self, id: &ClientOrderId) -> Result<OrderStatus, BrokerError> {
        self.broker.get_order_status(id).await
    }

    /// The thresholds this gateway evaluates against.
    #[must_use]
    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    fn current_exposure(&self, order: &OrderRequest, conditions: &MarketConditions) -> rust_decimal::Decimal {
        let mut prices: HashMap<InstrumentId, Price> = HashMap::new();
        if let Some(px) = conditions.last_price {
            prices.insert(order.instrument.clone(), px);
        }
        self.ledger.total_exposure(&prices)
    }

    fn reject(&self, order: &OrderRequest, reason: RejectReason) -> OrderResult {
        ORDERS_REJECTED_TOTAL
            .with_label_values(&[reason.code()])
            .inc();
        debug!(order = %order.id, code = reason.code(), reason = %reason, "Order rejected");
        OrderResult::rejected(reason)
    }
}
