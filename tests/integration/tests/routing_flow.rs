//! Integration test: routing decisions across registry, rates and scoring.

mod common;

use chainroute_core::{
    ChainId, PaymentRequest, PaymentStatus, PrivacyLevel, ScoreBreakdown, SpeedTier,
};
use chainroute_routing::{ChainRegistry, RoutingError};
use chainroute_settlement::adapters::{MockExecutor, MockMixer};
use chainroute_settlement::{BatchItem, EngineError};
use common::{usd, usd_chain, TestNode};

// =========================================================================
// Single-payment routing
// =========================================================================

#[tokio::test]
async fn test_small_maximum_privacy_payment_routes_to_private_chain() {
    let node = TestNode::new();
    let plan = node
        .engine
        .route(usd(0.5).with_privacy(PrivacyLevel::Maximum))
        .await
        .unwrap();

    let chain = node.engine.registry().get(&plan.chain).unwrap();
    assert_eq!(chain.privacy_level, PrivacyLevel::Maximum);
    assert_eq!(plan.chain, ChainId::new("XMR"));
    assert!(plan.needs_mixing);
    assert_eq!(plan.status, PaymentStatus::Pending);
    assert!((plan.chain_amount - 0.5 / 150.0).abs() < 1e-12);
}

#[tokio::test]
async fn test_instant_speed_prefers_fast_confirmation() {
    let registry = ChainRegistry::new();
    registry
        .register(usd_chain("FAST", 400, PrivacyLevel::Low))
        .unwrap();
    registry
        .register(usd_chain("SLOW", 600_000, PrivacyLevel::Low))
        .unwrap();
    let node = TestNode::with_backends(MockMixer::new(), MockExecutor::new(), Some(registry));

    let request = usd(5.0).with_speed(SpeedTier::Instant);
    let ranked = node.engine.rank(&request).unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].chain, ChainId::new("FAST"));
    assert!(ranked[0].breakdown.speed_match > ranked[1].breakdown.speed_match);

    let plan = node.engine.route(request).await.unwrap();
    assert_eq!(plan.chain, ChainId::new("FAST"));
    assert_eq!(plan.alternatives.len(), 1);
    assert_eq!(plan.alternatives[0].chain, ChainId::new("SLOW"));
}

#[tokio::test]
async fn test_scores_stay_within_component_bounds() {
    let node = TestNode::new();
    for amount in [0.01, 1.0, 250.0, 50_000.0] {
        for privacy in [PrivacyLevel::Low, PrivacyLevel::High, PrivacyLevel::Maximum] {
            let ranked = node.engine.rank(&usd(amount).with_privacy(privacy)).unwrap();
            for c in &ranked {
                let b = &c.breakdown;
                let bounds = [
                    (b.amount_fit, ScoreBreakdown::MAX_AMOUNT_FIT),
                    (b.privacy_match, ScoreBreakdown::MAX_PRIVACY_MATCH),
                    (b.speed_match, ScoreBreakdown::MAX_SPEED_MATCH),
                    (b.cost_efficiency, ScoreBreakdown::MAX_COST_EFFICIENCY),
                ];
                for (score, max) in bounds {
                    assert!((0.0..=max).contains(&score), "{}: {:?}", c.chain, b);
                }
                assert!((c.total - b.total()).abs() < 1e-9);
            }
            assert!(ranked.windows(2).all(|w| w[0].total >= w[1].total));
        }
    }
}

#[tokio::test]
async fn test_disabled_chains_are_never_chosen() {
    let node = TestNode::new();
    let xmr = ChainId::new("XMR");
    node.engine.set_chain_enabled(&xmr, false).unwrap();

    let plan = node
        .engine
        .route(usd(0.5).with_privacy(PrivacyLevel::Maximum))
        .await
        .unwrap();
    assert_ne!(plan.chain, xmr);
    assert!(plan.alternatives.iter().all(|a| a.chain != xmr));

    for chain in node.engine.list_chains() {
        node.engine.set_chain_enabled(&chain.id, false).unwrap();
    }
    let err = node.engine.route(usd(10.0)).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Routing(RoutingError::NoAvailableBackend)
    ));
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let node = TestNode::new();
    for amount in [0.0, -1.0, f64::NAN] {
        let err = node.engine.route(usd(amount)).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Routing(RoutingError::InvalidAmount(_))
        ));
    }

    let err = node
        .engine
        .route(PaymentRequest::new("a", "b", 5.0, "DOGE"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Routing(RoutingError::UnsupportedCurrency(_))
    ));
    assert!(node.engine.payments().is_empty());
}

#[tokio::test]
async fn test_recommendation_matches_route() {
    let node = TestNode::new();
    let recommended = node
        .engine
        .get_recommended_chain(0.5, "USD", PrivacyLevel::Maximum)
        .unwrap();
    let plan = node
        .engine
        .route(usd(0.5).with_privacy(PrivacyLevel::Maximum))
        .await
        .unwrap();
    assert_eq!(recommended, plan.chain);
}

// =========================================================================
// Batch routing
// =========================================================================

#[tokio::test]
async fn test_batch_isolates_failures() {
    let node = TestNode::new();
    let summary = node
        .engine
        .batch_route(vec![usd(10.0), usd(-1.0), usd(25.0)])
        .await;

    assert_eq!(summary.total_payments, 3);
    assert_eq!(summary.successful_routes, 2);
    assert_eq!(summary.routes.len(), 3);
    assert!(summary.routes[0].plan().is_some());
    assert!(matches!(summary.routes[1], BatchItem::Failed { index: 1, .. }));
    assert!(summary.routes[2].plan().is_some());

    let grouped: usize = summary.by_chain.values().map(Vec::len).sum();
    assert_eq!(grouped, 2);
    assert_eq!(node.engine.payments().len(), 2);
}

#[tokio::test]
async fn test_batch_plans_are_individually_executable() {
    let node = TestNode::new();
    let summary = node
        .engine
        .batch_route((1..=4).map(|i| usd(f64::from(i) * 5.0)).collect())
        .await;
    assert_eq!(summary.successful_routes, 4);

    for ids in summary.by_chain.values() {
        for id in ids {
            node.engine.execute(id).await.unwrap();
        }
    }
    let stats = node.engine.get_stats();
    assert_eq!(stats.total_payments, 4);
    assert_eq!(stats.by_status.get(&PaymentStatus::Confirmed), Some(&4));
    assert_eq!(node.executor.calls(), 4);
}
