//! Concurrency properties of the execution pipeline.
//!
//! The submission lock must prevent the "snapshot, decide, commit" race:
//! two orders that are each individually within limits but jointly over
//! them may never both be accepted.

use std::sync::Arc;

use rust_decimal_macros::dec;

use warden_core::{BookDepth, MarketConditions, OrderRequest, OrderSide, Price, Qty};
use warden_emergency::{EmergencyConfig, EmergencyStateMachine, HaltReason, StateStore};
use warden_gateway::{ExecutionGateway, GatewayConfig, PaperBroker};
use warden_ledger::{DailyLossTracker, PositionLedger};
use warden_risk::RiskThresholds;

fn conditions(instrument: &str) -> MarketConditions {
    let mut c = MarketConditions::new(instrument.into());
    c.last_price = Some(Price::new(dec!(100)));
    c.recent_prices = vec![Price::new(dec!(100)); 20];
    c.depth = Some(BookDepth::new(
        Price::new(dec!(99)),
        Qty::new(dec!(1000)),
        Price::new(dec!(100)),
        Qty::new(dec!(1000)),
    ));
    c
}

fn buy(instrument: &str, size: rust_decimal::Decimal) -> OrderRequest {
    OrderRequest::limit(
        instrument.into(),
        OrderSide::Buy,
        Qty::new(size),
        Price::new(dec!(100)),
    )
}

struct Fixture {
    gateway: Arc<ExecutionGateway>,
    emergency: Arc<EmergencyStateMachine>,
    ledger: Arc<PositionLedger>,
    _dir: tempfile::TempDir,
}

fn fixture(max_position_size: rust_decimal::Decimal) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(PositionLedger::new(Arc::new(DailyLossTracker::new())));
    let store = StateStore::new(dir.path().join("emergency_state.json"));
    let emergency = Arc::new(EmergencyStateMachine::recover(
        store,
        ledger.clone(),
        EmergencyConfig::default(),
    ));

    let thresholds = RiskThresholds {
        max_position_size,
        min_order_value: dec!(1),
        max_order_value: dec!(100000),
        max_daily_loss: dec!(100000),
        ..Default::default()
    };

    let gateway = Arc::new(ExecutionGateway::new(
        emergency.clone(),
        thresholds,
        ledger.clone(),
        Arc::new(PaperBroker::new()),
        GatewayConfig::default(),
    ));

    Fixture {
        gateway,
        emergency,
        ledger,
        _dir: dir,
    }
}

#[tokio::test]
async fn concurrent_orders_cannot_jointly_exceed_limit() {
    // Max 1.0 with 5% tolerance. Each 0.6 order is fine alone; together
    // they would project 1.2. Exactly one must be accepted.
    let f = fixture(dec!(1.0));

    let g1 = f.gateway.clone();
    let g2 = f.gateway.clone();
    let (r1, r2) = tokio::join!(
        async move { g1.submit(&buy("BTC-USD", dec!(0.6)), &conditions("BTC-USD")).await },
        async move { g2.submit(&buy("BTC-USD", dec!(0.6)), &conditions("BTC-USD")).await },
    );

    let fills = [&r1, &r2].iter().filter(|r| r.is_filled()).count();
    let rejects = [&r1, &r2].iter().filter(|r| r.is_rejected()).count();
    assert_eq!(fills, 1, "exactly one order must fill, got {r1:?} / {r2:?}");
    assert_eq!(rejects, 1);

    let position = f.ledger.get_position(&"BTC-USD".into());
    assert_eq!(position.qty, Qty::new(dec!(0.6)));

    // The loser failed on the position limit specifically.
    let rejected = if r1.is_rejected() { &r1 } else { &r2 };
    assert_eq!(
        rejected.reject_reason().unwrap().code(),
        "position_limit"
    );
}

#[tokio::test]
async fn concurrent_orders_on_different_instruments_both_fill() {
    let f = fixture(dec!(1.0));

    let g1 = f.gateway.clone();
    let g2 = f.gateway.clone();
    let (r1, r2) = tokio::join!(
        async move { g1.submit(&buy("BTC-USD", dec!(0.6)), &conditions("BTC-USD")).await },
        async move { g2.submit(&buy("ETH-USD", dec!(0.6)), &conditions("ETH-USD")).await },
    );

    assert!(r1.is_filled());
    assert!(r2.is_filled());
}

#[tokio::test]
async fn halt_blocks_interleaved_submissions_until_resumed() {
    let f = fixture(dec!(100));

    f.emergency
        .halt(HaltReason::Manual {
            message: "drill".to_string(),
        })
        .unwrap();

    // A burst of concurrent submissions while halted: all rejected.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let gateway = f.gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway
                .submit(&buy("BTC-USD", dec!(0.1)), &conditions("BTC-USD"))
                .await
        }));
    }
    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.reject_reason().unwrap().code(), "halted");
    }
    assert!(f.ledger.get_position(&"BTC-USD".into()).is_flat());

    // Explicit authorized recovery restores order flow.
    f.emergency
        .resume(&warden_emergency::HealthReport {
            market_data_age_ms: 10,
            broker_connected: true,
            latency_ms: 5,
        })
        .unwrap();

    let result = f
        .gateway
        .submit(&buy("BTC-USD", dec!(0.1)), &conditions("BTC-USD"))
        .await;
    assert!(result.is_filled());
}

#[tokio::test]
async fn sequential_fills_accumulate_average_entry() {
    // End-to-end version of the ledger scenario through the gateway.
    let f = fixture(dec!(100));

    assert!(f
        .gateway
        .submit(&buy("BTC-USD", dec!(1.0)), &conditions("BTC-USD"))
        .await
        .is_filled());

    let second = OrderRequest::limit(
        "BTC-USD".into(),
        OrderSide::Buy,
        Qty::new(dec!(0.5)),
        Price::new(dec!(110)),
    );
    assert!(f
        .gateway
        .submit(&second, &conditions("BTC-USD"))
        .await
        .is_filled());

    let position = f.ledger.get_position(&"BTC-USD".into());
    assert_eq!(position.qty, Qty::new(dec!(1.5)));
    assert_eq!(position.avg_entry_price.inner(), dec!(160) / dec!(1.5));

    let sell = OrderRequest::limit(
        "BTC-USD".into(),
        OrderSide::Sell,
        Qty::new(dec!(1.0)),
        Price::new(dec!(120)),
    );
    assert!(f
        .gateway
        .submit(&sell, &conditions("BTC-USD"))
        .await
        .is_filled());

    let position = f.ledger.get_position(&"BTC-USD".into());
    let avg = dec!(160) / dec!(1.5);
    assert_eq!(position.qty, Qty::new(dec!(0.5)));
    assert_eq!(position.avg_entry_price.inner(), avg);
    assert_eq!(position.realized_pnl, (dec!(120) - avg) * dec!(1.0));
}
