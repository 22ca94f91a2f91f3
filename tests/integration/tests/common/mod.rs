//! Shared fixtures for the cross-crate integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chainroute_core::{ChainProfile, PaymentRequest, PrivacyLevel};
use chainroute_routing::{ChainRegistry, RateTable};
use chainroute_settlement::adapters::{MemoryDurability, MockExecutor, MockMixer};
use chainroute_settlement::RoutingEngine;

/// An engine wired to mock backends, with handles kept for assertions.
pub struct TestNode {
    pub engine: Arc<RoutingEngine>,
    pub mixer: Arc<MockMixer>,
    pub executor: Arc<MockExecutor>,
    pub durability: Arc<MemoryDurability>,
}

impl TestNode {
    /// Default chains and rates, instant backends.
    pub fn new() -> Self {
        Self::with_backends(MockMixer::new(), MockExecutor::new(), None)
    }

    /// Default chains and rates with the given backends. `registry` replaces
    /// the default chain set when given.
    pub fn with_backends(
        mixer: MockMixer,
        executor: MockExecutor,
        registry: Option<ChainRegistry>,
    ) -> Self {
        let mixer = Arc::new(mixer);
        let executor = Arc::new(executor);
        let durability = Arc::new(MemoryDurability::new());
        let mut builder = RoutingEngine::builder(mixer.clone(), executor.clone())
            .rates(Arc::new(RateTable::with_defaults()))
            .durability(durability.clone());
        if let Some(registry) = registry {
            builder = builder.registry(Arc::new(registry));
        }
        Self {
            engine: Arc::new(builder.build()),
            mixer,
            executor,
            durability,
        }
    }

    /// An executor that takes `latency` per submission.
    pub fn slow(latency: Duration) -> Self {
        Self::with_backends(
            MockMixer::new(),
            MockExecutor::new().with_latency(latency),
            None,
        )
    }
}

impl Default for TestNode {
    fn default() -> Self {
        Self::new()
    }
}

/// A plain USD payment with default preferences.
pub fn usd(amount: f64) -> PaymentRequest {
    PaymentRequest::new("alice", "bob", amount, "USD")
}

/// A chain priced directly in USD so only its capability profile matters.
pub fn usd_chain(id: &str, confirmation_time_ms: u64, privacy: PrivacyLevel) -> ChainProfile {
    ChainProfile::new(id, id, 0.01, 1_000.0, 0.01, confirmation_time_ms, privacy).with_asset("USD")
}
