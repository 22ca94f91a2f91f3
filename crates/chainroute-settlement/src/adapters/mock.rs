use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chainroute_core::{ExecutionResult, PaymentId, PaymentPlan};
use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use uuid::Uuid;

use crate::error::BackendError;
use crate::traits::{ChainExecutor, MixOutcome, MixRequest, Mixer};

/// Mixer that splits the amount into a few random parts without touching any
/// network. Counts calls so tests can assert at-most-once behaviour.
#[derive(Debug, Default)]
pub struct MockMixer {
    latency: Duration,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every call with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn split(amount: f64) -> Vec<f64> {
        let mut rng = rand::thread_rng();
        let parts = rng.gen_range(2..=4);
        let weights: Vec<f64> = (0..parts).map(|_| rng.gen_range(1.0..10.0)).collect();
        let sum: f64 = weights.iter().sum();
        weights.into_iter().map(|w| amount * w / sum).collect()
    }
}

#[async_trait]
impl Mixer for MockMixer {
    async fn mix(&self, request: MixRequest) -> Result<MixOutcome, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(reason) = &self.failure {
            return Err(BackendError::Rejected(reason.clone()));
        }

        let outcome = MixOutcome {
            mix_id: format!("mix-{}", Uuid::now_v7().simple()),
            splits: Self::split(request.amount),
        };
        tracing::info!(
            payment_id = %request.payment_id,
            mix_id = %outcome.mix_id,
            splits = outcome.splits.len(),
            "Mock mix completed"
        );
        Ok(outcome)
    }
}

/// Executor that fabricates a transaction hash instead of broadcasting.
#[derive(Debug)]
pub struct MockExecutor {
    latency: Duration,
    failure: Option<String>,
    confirmations: u32,
    calls: AtomicUsize,
    submitted: DashMap<PaymentId, usize>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            failure: None,
            confirmations: 1,
            calls: AtomicUsize::new(0),
            submitted: DashMap::new(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Total number of `submit` calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successful `submit` calls for one payment.
    pub fn submissions_for(&self, payment_id: &PaymentId) -> usize {
        self.submitted.get(payment_id).map(|n| *n).unwrap_or(0)
    }

    /// Deterministic-looking hash over the payment id, chain and time.
    fn tx_hash(plan: &PaymentPlan) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(plan.payment_id.as_uuid().as_bytes());
        hasher.update(plan.chain.as_str().as_bytes());
        hasher.update(&Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainExecutor for MockExecutor {
    async fn submit(&self, plan: &PaymentPlan) -> Result<ExecutionResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(reason) = &self.failure {
            return Err(BackendError::Unavailable(reason.clone()));
        }

        let tx_hash = Self::tx_hash(plan);
        let mut count = self.submitted.entry(plan.payment_id).or_insert(0);
        *count += 1;
        if *count > 1 {
            tracing::warn!(
                payment_id = %plan.payment_id,
                submissions = *count,
                "Payment submitted more than once"
            );
        }
        drop(count);
        tracing::info!(
            payment_id = %plan.payment_id,
            chain = %plan.chain,
            %tx_hash,
            "Mock submission confirmed"
        );

        Ok(ExecutionResult {
            tx_hash,
            confirmations: self.confirmations,
            fee_charged: plan.fee.native,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_plan;

    #[tokio::test]
    async fn test_mock_mixer_splits_preserve_amount() {
        let mixer = MockMixer::new();
        let plan = sample_plan();
        let outcome = mixer.mix(MixRequest::for_plan(&plan, "SOL")).await.unwrap();
        assert!(outcome.mix_id.starts_with("mix-"));
        assert!((2..=4).contains(&outcome.splits.len()));
        let total: f64 = outcome.splits.iter().sum();
        assert!((total - plan.chain_amount).abs() < 1e-9);
        assert_eq!(mixer.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_mixer_failure() {
        let mixer = MockMixer::new().failing("pool drained");
        let err = mixer
            .mix(MixRequest::for_plan(&sample_plan(), "SOL"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pool drained"));
    }

    #[tokio::test]
    async fn test_mock_executor_fabricates_hash() {
        let executor = MockExecutor::new().with_confirmations(6);
        let plan = sample_plan();
        let result = executor.submit(&plan).await.unwrap();
        assert_eq!(result.tx_hash.len(), 64);
        assert_eq!(result.confirmations, 6);
        assert_eq!(result.fee_charged, plan.fee.native);
        assert_eq!(executor.submissions_for(&plan.payment_id), 1);
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_executor_failure_counts_call() {
        let executor = MockExecutor::new().failing("rpc down");
        assert!(executor.submit(&sample_plan()).await.is_err());
        assert_eq!(executor.calls(), 1);
    }
}
