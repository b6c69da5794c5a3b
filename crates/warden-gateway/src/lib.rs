//! Execution gateway for the warden trading executor.
//!
//! Orchestrates the full order pipeline: emergency gate, risk evaluation,
//! broker submission with a bounded timeout, and ledger mutation on fill.
//! The broker is an untrusted, possibly slow or failing collaborator
//! behind the `BrokerClient` trait.

pub mod broker;
pub mod error;
pub mod gateway;
pub mod paper;

pub use broker::{BrokerClient, BrokerError, OrderStatus};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{ExecutionGateway, GatewayConfig};
pub use paper::{PaperBroker, PaperFailure};
