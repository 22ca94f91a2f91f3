//! Integration test: payment lifecycle from routing to a final state.
//!
//! Drives plans through the engine with mock mixer and executor backends
//! and checks the transitions observed by event subscribers and the
//! durability sink.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chainroute_core::{
    FailureReason, PaymentEvent, PaymentId, PaymentPlan, PaymentStateMachine, PaymentStatus,
    PrivacyLevel,
};
use chainroute_settlement::adapters::{MockExecutor, MockMixer};
use chainroute_settlement::{EngineError, LifecycleEvent, PaymentLookup};
use common::{usd, TestNode};
use tokio::sync::broadcast;

fn drain(rx: &mut broadcast::Receiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Every observed status change must be a legal edge of the lifecycle.
fn assert_legal_transitions(events: &[LifecycleEvent]) {
    for event in events {
        if let LifecycleEvent::StatusChanged { from, to, .. } = event {
            let legal = [
                PaymentEvent::MixingStarted,
                PaymentEvent::SubmissionStarted,
                PaymentEvent::Confirmed,
                PaymentEvent::Failed,
            ]
            .into_iter()
            .any(|e| PaymentStateMachine::transition(*from, e).ok() == Some(*to));
            assert!(legal, "illegal transition {} -> {}", from, to);
        }
    }
}

// =========================================================================
// Happy paths
// =========================================================================

#[tokio::test]
async fn test_route_execute_confirm_without_mixing() {
    let node = TestNode::new();
    let mut rx = node.engine.subscribe();

    let plan = node.engine.route(usd(10.0)).await.unwrap();
    assert!(!plan.needs_mixing);
    let result = node.engine.execute(&plan.payment_id).await.unwrap();
    assert_eq!(result.tx_hash.len(), 64);

    match node.engine.get_payment_status(&plan.payment_id) {
        PaymentLookup::Found { status, payment } => {
            assert_eq!(status, PaymentStatus::Confirmed);
            assert_eq!(payment.tx_hash.as_deref(), Some(result.tx_hash.as_str()));
            assert!(payment.confirmed_at.is_some());
            assert!(payment.mix_id.is_none());
        }
        PaymentLookup::NotFound => panic!("payment should be tracked"),
    }

    assert_eq!(node.mixer.calls(), 0);
    assert_eq!(
        node.durability.history(&plan.payment_id),
        vec![PaymentStatus::Executing, PaymentStatus::Confirmed]
    );

    let events = drain(&mut rx);
    assert!(matches!(events[0], LifecycleEvent::Routed { .. }));
    assert_eq!(events.len(), 3);
    assert_legal_transitions(&events);
}

#[tokio::test]
async fn test_high_privacy_payment_is_mixed_first() {
    let node = TestNode::new();
    let plan = node
        .engine
        .route(usd(0.5).with_privacy(PrivacyLevel::Maximum))
        .await
        .unwrap();
    node.engine.execute(&plan.payment_id).await.unwrap();

    assert_eq!(node.mixer.calls(), 1);
    assert_eq!(
        node.durability.history(&plan.payment_id),
        vec![
            PaymentStatus::Mixing,
            PaymentStatus::Executing,
            PaymentStatus::Confirmed
        ]
    );
    let stored = node.engine.get_payment_status(&plan.payment_id);
    match stored {
        PaymentLookup::Found { payment, .. } => assert!(payment.mix_id.is_some()),
        PaymentLookup::NotFound => panic!("payment should be tracked"),
    }
}

#[tokio::test]
async fn test_large_payment_is_mixed_at_low_privacy() {
    let node = TestNode::new();
    let plan = node.engine.route(usd(500.0)).await.unwrap();
    assert!(plan.needs_mixing);
    node.engine.execute(&plan.payment_id).await.unwrap();
    assert_eq!(node.mixer.calls(), 1);
}

// =========================================================================
// Idempotence and concurrency
// =========================================================================

#[tokio::test]
async fn test_execute_twice_submits_once() {
    let node = TestNode::new();
    let plan = node.engine.route(usd(10.0)).await.unwrap();

    let first = node.engine.execute(&plan.payment_id).await.unwrap();
    let second = node.engine.execute(&plan.payment_id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(node.executor.submissions_for(&plan.payment_id), 1);
}

#[tokio::test]
async fn test_concurrent_execute_submits_once() {
    let node = TestNode::slow(Duration::from_millis(50));
    let plan = node.engine.route(usd(10.0)).await.unwrap();

    let calls = (0..8).map(|_| {
        let engine = Arc::clone(&node.engine);
        let id = plan.payment_id;
        tokio::spawn(async move { engine.execute(&id).await })
    });
    let results = futures::future::join_all(calls).await;

    let hashes: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap().tx_hash)
        .collect();
    assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(node.executor.submissions_for(&plan.payment_id), 1);
    assert_eq!(node.executor.calls(), 1);
}

#[tokio::test]
async fn test_failed_payment_stays_failed() {
    let node = TestNode::with_backends(
        MockMixer::new(),
        MockExecutor::new().failing("node unreachable"),
        None,
    );
    let plan = node.engine.route(usd(10.0)).await.unwrap();

    let err = node.engine.execute(&plan.payment_id).await.unwrap_err();
    assert!(matches!(err, EngineError::ExecutionFailure { .. }));
    let again = node.engine.execute(&plan.payment_id).await.unwrap_err();
    assert!(matches!(again, EngineError::ExecutionFailure { .. }));
    assert_eq!(node.executor.calls(), 1);

    match node.engine.get_payment_status(&plan.payment_id) {
        PaymentLookup::Found { status, payment } => {
            assert_eq!(status, PaymentStatus::Failed);
            assert!(matches!(payment.failure, Some(FailureReason::Execution(_))));
        }
        PaymentLookup::NotFound => panic!("payment should be tracked"),
    }
}

#[tokio::test]
async fn test_mixing_failure_never_submits() {
    let mixer = MockMixer::new().failing("pool drained");
    let node = TestNode::with_backends(mixer, MockExecutor::new(), None);
    let plan = node
        .engine
        .route(usd(1.0).with_privacy(PrivacyLevel::High))
        .await
        .unwrap();

    let err = node.engine.execute(&plan.payment_id).await.unwrap_err();
    assert!(matches!(err, EngineError::MixingFailure { .. }));
    assert_eq!(node.executor.calls(), 0);
    assert_eq!(
        node.durability.history(&plan.payment_id),
        vec![PaymentStatus::Mixing, PaymentStatus::Failed]
    );
}

// =========================================================================
// Cancellation and unknown ids
// =========================================================================

#[tokio::test]
async fn test_cancelled_payment_cannot_execute() {
    let node = TestNode::new();
    let plan = node.engine.route(usd(10.0)).await.unwrap();

    let cancelled = node.engine.cancel(&plan.payment_id).await.unwrap();
    assert_eq!(cancelled.status, PaymentStatus::Failed);
    assert_eq!(cancelled.failure, Some(FailureReason::Cancelled));

    let err = node.engine.execute(&plan.payment_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled(id) if id == plan.payment_id));
    assert_eq!(node.executor.calls(), 0);
}

#[tokio::test]
async fn test_unknown_payment() {
    let node = TestNode::new();
    let id = PaymentId::new();
    assert_eq!(node.engine.get_payment_status(&id), PaymentLookup::NotFound);
    assert!(matches!(
        node.engine.execute(&id).await,
        Err(EngineError::PaymentNotFound(_))
    ));
    assert!(matches!(
        node.engine.cancel(&id).await,
        Err(EngineError::PaymentNotFound(_))
    ));
}

// =========================================================================
// Properties
// =========================================================================

#[tokio::test]
async fn test_mixed_workload_only_takes_legal_transitions() {
    let node = TestNode::new();
    let mut rx = node.engine.subscribe();

    let requests = vec![
        usd(2.0),
        usd(0.5).with_privacy(PrivacyLevel::Maximum),
        usd(150.0),
        usd(40.0).with_privacy(PrivacyLevel::Medium),
        usd(3.0),
    ];
    let mut ids = Vec::new();
    for request in requests {
        ids.push(node.engine.route(request).await.unwrap().payment_id);
    }
    node.engine.cancel(&ids[4]).await.unwrap();
    for id in &ids {
        let _ = node.engine.execute(id).await;
    }

    let events = drain(&mut rx);
    assert_legal_transitions(&events);

    // Each payment reaches exactly one final state.
    for id in &ids {
        let finals = events
            .iter()
            .filter(|e| {
                matches!(e, LifecycleEvent::StatusChanged { payment_id, to, .. }
                    if payment_id == id && to.is_final())
            })
            .count();
        assert_eq!(finals, 1, "payment {} reached {} final states", id, finals);
    }
}

#[tokio::test]
async fn test_pending_plan_survives_serialization() {
    let node = TestNode::new();
    let plan = node
        .engine
        .route(usd(75.0).with_reason("invoice 42"))
        .await
        .unwrap();

    let json = serde_json::to_string(&plan).unwrap();
    let restored: PaymentPlan = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.payment_id, plan.payment_id);
    assert_eq!(restored.chain, plan.chain);
    assert_eq!(restored.created_at, plan.created_at);
    assert_eq!(restored.alternatives.len(), plan.alternatives.len());
    assert!((restored.total_score - plan.total_score).abs() < 1e-9);
    assert!((restored.chain_amount - plan.chain_amount).abs() < 1e-12);
    assert_eq!(restored.status, PaymentStatus::Pending);
    assert_eq!(restored.request.reason, "invoice 42");

    let persisted = node.durability.payments();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0], plan);
}
