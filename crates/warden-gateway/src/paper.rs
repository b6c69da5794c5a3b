//! Paper broker: an in-process simulation of the broker collaborator.
//!
//! Fills limit orders instantly at their limit price and market orders at
//! the configured mark price. Keeps an order-status ledger for
//! reconciliation queries and supports one-shot failure injection so the
//! gateway's error paths can be exercised end to end.

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use async_trait::async_trait;

use warden_core::{ClientOrderId, Fill, InstrumentId, OrderRequest, Price};

use crate::broker::{BrokerClient, BrokerError, OrderStatus};

/// One-shot failure to inject into the next `submit_order` call.
#[derive(Debug, Clone)]
pub enum PaperFailure {
    /// Confirm rejection of the next order.
    Reject { code: String, message: String },
    /// Time out on the next order (outcome unknown to the caller).
    Timeout,
    /// Drop the connection after the next order is sent.
    ConnectionLost,
}

/// In-process broker simulation.
pub struct PaperBroker {
    orders: DashMap<ClientOrderId, OrderStatus>,
    mark_prices: DashMap<InstrumentId, Price>,
    next_failure: Mutex<Option<PaperFailure>>,
}

impl PaperBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            mark_prices: DashMap::new(),
            next_failure: Mutex::new(None),
        }
    }

    /// Set the mark price used to fill market orders for an instrument.
    pub fn set_mark_price(&self, instrument: InstrumentId, price: Price) {
        self.mark_prices.insert(instrument, price);
    }

    /// Inject a one-shot failure for the next submission.
    pub fn inject_failure(&self, failure: PaperFailure) {
        *self.next_failure.lock() = Some(failure);
    }

    /// Number of orders this broker has seen.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn submit_order(&self, order: &OrderRequest) -> Result<Fill, BrokerError> {
        if let Some(failure) = self.next_failure.lock().take() {
            match failure {
                PaperFailure::Reject { code, message } => {
                    self.orders.insert(
                        order.id.clone(),
                        OrderStatus::Rejected {
                            code: code.clone(),
                            message: message.clone(),
                        },
                    );
                    return Err(BrokerError::Rejected { code, message });
                }
                PaperFailure::Timeout => {
                    // The order "executed" broker-side; the caller only
                    // learns that through a status query.
                    let price = match order.effective_price(
                        self.mark_prices.get(&order.instrument).map(|p| *p),
                    ) {
                        Some(p) => p,
                        None => return Err(BrokerError::Timeout { elapsed_ms: 0 }),
                    };
                    let fill = Fill::new(
                        order.id.clone(),
                        order.instrument.clone(),
                        order.side,
                        order.size,
                        price,
                    );
                    self.orders
                        .insert(order.id.clone(), OrderStatus::Filled(fill));
                    return Err(BrokerError::Timeout { elapsed_ms: 0 });
                }
                PaperFailure::ConnectionLost => {
                    return Err(BrokerError::ConnectionLost("injected".to_string()));
                }
            }
        }

        let mark = self.mark_prices.get(&order.instrument).map(|p| *p);
        let price = order.effective_price(mark).ok_or_else(|| {
            BrokerError::Rejected {
                code: "no_price".to_string(),
                message: format!("no mark price for {}", order.instrument),
            }
        })?;

        let fill = Fill::new(
            order.id.clone(),
            order.instrument.clone(),
            order.side,
            order.size,
            price,
        );
        self.orders
            .insert(order.id.clone(), OrderStatus::Filled(fill.clone()));

        debug!(order = %order.id, price = %price, "Paper fill");
        Ok(fill)
    }

    async fn get_order_status(&self, id: &ClientOrderId) -> Result<OrderStatus, BrokerError> {
        Ok(self
            .orders
            .get(id)
            .map(|s| s.clone())
            .unwrap_or(OrderStatus::Unknown))
    }
}
