use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chainroute_core::{
    ChainId, ChainProfile, EnginePolicy, ExecutionResult, FailureReason, PaymentEvent, PaymentId,
    PaymentPlan, PaymentRequest, PaymentStatus, PrivacyLevel, RouteAlternative,
};
use chainroute_routing::{
    ChainRegistry, ExchangeRateFeed, FeeCalculator, RateSnapshot, RateTable, Router,
    RoutingError, ScoredCandidate,
};
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;

use crate::adapters::NoopDurability;
use crate::error::EngineError;
use crate::events::{EventBus, LifecycleEvent};
use crate::store::{InMemoryPaymentStore, PaymentStore};
use crate::traits::{ChainExecutor, Durability, MixRequest, Mixer};

/// Result of a status lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentLookup {
    NotFound,
    Found {
        status: PaymentStatus,
        payment: PaymentPlan,
    },
}

impl PaymentLookup {
    pub fn status(&self) -> Option<PaymentStatus> {
        match self {
            Self::NotFound => None,
            Self::Found { status, .. } => Some(*status),
        }
    }
}

/// Settlement routing engine: chooses a chain for each payment and drives
/// the plan through mixing and submission.
///
/// All public operations take `&self`. Clones are handles onto the same
/// registry, rates, store and event bus.
#[derive(Clone)]
pub struct RoutingEngine {
    pub(crate) router: Router,
    pub(crate) store: Arc<dyn PaymentStore>,
    mixer: Arc<dyn Mixer>,
    executor: Arc<dyn ChainExecutor>,
    durability: Arc<dyn Durability>,
    events: EventBus,
    policy: EnginePolicy,
    /// Held shared from ranking until the plan is stored, exclusively while
    /// a chain is removed.
    chain_admin: Arc<RwLock<()>>,
}

/// Assembles a [`RoutingEngine`]. Everything except the two settlement
/// collaborators has a default.
pub struct EngineBuilder {
    registry: Option<Arc<ChainRegistry>>,
    rates: Option<Arc<RateTable>>,
    fees: FeeCalculator,
    store: Option<Arc<dyn PaymentStore>>,
    mixer: Arc<dyn Mixer>,
    executor: Arc<dyn ChainExecutor>,
    durability: Arc<dyn Durability>,
    policy: EnginePolicy,
}

impl EngineBuilder {
    pub fn registry(mut self, registry: Arc<ChainRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn rates(mut self, rates: Arc<RateTable>) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn fees(mut self, fees: FeeCalculator) -> Self {
        self.fees = fees;
        self
    }

    pub fn store(mut self, store: Arc<dyn PaymentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn durability(mut self, durability: Arc<dyn Durability>) -> Self {
        self.durability = durability;
        self
    }

    pub fn policy(mut self, policy: EnginePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> RoutingEngine {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ChainRegistry::with_defaults()));
        let rates = self
            .rates
            .unwrap_or_else(|| Arc::new(RateTable::with_defaults()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryPaymentStore::new()));

        tracing::info!(
            chains = registry.len(),
            currencies = rates.snapshot().len(),
            disclosure_threshold = self.policy.disclosure_threshold,
            execute_timeout_ms = self.policy.execute_timeout_ms,
            "Routing engine initialized"
        );

        RoutingEngine {
            router: Router::new(registry, rates, self.fees),
            store,
            mixer: self.mixer,
            executor: self.executor,
            durability: self.durability,
            events: EventBus::new(self.policy.event_channel_capacity),
            policy: self.policy,
            chain_admin: Arc::new(RwLock::new(())),
        }
    }
}

impl RoutingEngine {
    /// Start building an engine around the given mixer and chain executor.
    pub fn builder(mixer: Arc<dyn Mixer>, executor: Arc<dyn ChainExecutor>) -> EngineBuilder {
        EngineBuilder {
            registry: None,
            rates: None,
            fees: FeeCalculator::new(),
            store: None,
            mixer,
            executor,
            durability: Arc::new(NoopDurability),
            policy: EnginePolicy::default(),
        }
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        self.router.registry()
    }

    pub fn rates(&self) -> &Arc<RateTable> {
        self.router.rates()
    }

    // ── Routing ──────────────────────────────────────────────────────

    /// Rank enabled chains for `request` without creating a plan.
    pub fn rank(&self, request: &PaymentRequest) -> Result<Vec<ScoredCandidate>, EngineError> {
        Ok(self.router.rank(request)?)
    }

    /// Choose a chain for `request` and track the resulting plan as `Pending`.
    pub async fn route(&self, request: PaymentRequest) -> Result<PaymentPlan, EngineError> {
        let plan = {
            let _admin = self
                .chain_admin
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let ranked = self.router.rank(&request)?;
            let plan = self.build_plan(request, ranked)?;
            self.store.insert(plan.clone())?;
            plan
        };
        if let Err(e) = self.durability.record_payment(&plan).await {
            tracing::warn!(
                payment_id = %plan.payment_id,
                error = %e,
                "Failed to persist routed plan"
            );
        }
        self.events.publish(LifecycleEvent::Routed {
            payment_id: plan.payment_id,
            chain: plan.chain.clone(),
            needs_mixing: plan.needs_mixing,
            at: plan.created_at,
        });

        tracing::info!(
            payment_id = %plan.payment_id,
            chain = %plan.chain,
            score = plan.total_score,
            needs_mixing = plan.needs_mixing,
            alternatives = plan.alternatives.len(),
            "Payment routed"
        );
        Ok(plan)
    }

    fn build_plan(
        &self,
        request: PaymentRequest,
        ranked: Vec<ScoredCandidate>,
    ) -> Result<PaymentPlan, EngineError> {
        let mut ranked = ranked.into_iter();
        let best = ranked.next().ok_or(RoutingError::NoAvailableBackend)?;
        let alternatives = ranked
            .take(self.policy.alternatives_limit())
            .map(to_alternative)
            .collect();

        let needs_mixing = request.preferences.privacy.requires_mixing()
            || request.amount > self.policy.disclosure_threshold;

        let created_at = Utc::now();
        let estimated_confirmation_at = i64::try_from(best.confirmation_time_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|latency| created_at.checked_add_signed(latency))
            .unwrap_or(created_at);

        Ok(PaymentPlan {
            payment_id: PaymentId::new(),
            request,
            chain: best.chain,
            chain_amount: best.chain_amount,
            fee: best.fee,
            score: best.breakdown,
            total_score: best.total,
            needs_mixing,
            alternatives,
            status: PaymentStatus::Pending,
            created_at,
            estimated_confirmation_at,
            confirmed_at: None,
            mix_id: None,
            tx_hash: None,
            execution: None,
            failure: None,
        })
    }

    /// Preview the chain a payment would most likely use.
    pub fn get_recommended_chain(
        &self,
        amount: f64,
        currency: &str,
        privacy: PrivacyLevel,
    ) -> Result<ChainId, EngineError> {
        Ok(self.router.recommend(amount, currency, privacy)?)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Drive a `Pending` plan to `Confirmed` or `Failed`.
    ///
    /// Calls for the same payment are serialized. Once a plan has left
    /// `Pending`, later calls return the recorded outcome and never touch the
    /// mixer or executor again.
    ///
    /// The work runs on its own task: dropping the returned future (a caller
    /// timeout, a disconnected HTTP client) does not stop the payment from
    /// reaching `Confirmed` or `Failed`.
    pub async fn execute(&self, payment_id: &PaymentId) -> Result<ExecutionResult, EngineError> {
        let engine = self.clone();
        let id = *payment_id;
        tokio::spawn(async move { engine.execute_serialized(&id).await })
            .await
            .map_err(|e| EngineError::ExecutionFailure {
                payment_id: id,
                reason: format!("execution task ended abnormally: {}", e),
            })?
    }

    async fn execute_serialized(
        &self,
        payment_id: &PaymentId,
    ) -> Result<ExecutionResult, EngineError> {
        let lock = self
            .store
            .execution_lock(payment_id)
            .ok_or(EngineError::PaymentNotFound(*payment_id))?;
        let _guard = lock.lock().await;

        let mut plan = self
            .store
            .get(payment_id)
            .ok_or(EngineError::PaymentNotFound(*payment_id))?;
        if plan.status != PaymentStatus::Pending {
            tracing::debug!(%payment_id, status = %plan.status, "Returning recorded outcome");
            return recorded_outcome(&plan);
        }

        tracing::info!(
            %payment_id,
            chain = %plan.chain,
            needs_mixing = plan.needs_mixing,
            "Executing payment"
        );
        let started = Instant::now();
        let outcome = match self.policy.execute_timeout() {
            Some(deadline) => match tokio::time::timeout(deadline, self.drive(&mut plan)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(EngineError::Timeout {
                    payment_id: *payment_id,
                    after_ms: self.policy.execute_timeout_ms,
                }),
            },
            None => self.drive(&mut plan).await,
        };

        match outcome {
            Ok(result) => {
                let from = plan.status;
                plan.confirm(result.clone())?;
                self.commit(
                    &plan,
                    from,
                    json!({
                        "tx_hash": result.tx_hash,
                        "confirmations": result.confirmations,
                        "fee_charged": result.fee_charged,
                    }),
                )
                .await?;
                tracing::info!(
                    %payment_id,
                    chain = %plan.chain,
                    tx_hash = %result.tx_hash,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Payment confirmed"
                );
                Ok(result)
            }
            Err(err) => {
                let reason = err
                    .failure_reason()
                    .unwrap_or_else(|| FailureReason::Execution(err.to_string()));
                if !plan.status.is_final() {
                    let from = plan.status;
                    plan.fail(reason.clone())?;
                    self.commit(&plan, from, json!({ "reason": reason })).await?;
                }
                tracing::warn!(%payment_id, chain = %plan.chain, error = %err, "Payment failed");
                Err(err)
            }
        }
    }

    /// Mixing (when required) and submission. Each intermediate status is
    /// committed before the collaborator call it announces.
    async fn drive(&self, plan: &mut PaymentPlan) -> Result<ExecutionResult, EngineError> {
        if plan.needs_mixing {
            self.transition(plan, PaymentEvent::MixingStarted, json!({}))
                .await?;
            let asset = self.settlement_asset(&plan.chain);
            let outcome = self
                .mixer
                .mix(MixRequest::for_plan(plan, &asset))
                .await
                .map_err(|e| EngineError::MixingFailure {
                    payment_id: plan.payment_id,
                    reason: e.to_string(),
                })?;
            tracing::debug!(
                payment_id = %plan.payment_id,
                mix_id = %outcome.mix_id,
                "Mixing finished"
            );
            plan.mix_id = Some(outcome.mix_id);
        }

        let meta = json!({ "chain": plan.chain, "mix_id": plan.mix_id });
        self.transition(plan, PaymentEvent::SubmissionStarted, meta)
            .await?;
        self.executor
            .submit(plan)
            .await
            .map_err(|e| EngineError::ExecutionFailure {
                payment_id: plan.payment_id,
                reason: e.to_string(),
            })
    }

    fn settlement_asset(&self, chain: &ChainId) -> String {
        self.registry()
            .get(chain)
            .map(|p| p.rate_asset().to_string())
            .unwrap_or_else(|| chain.base_asset().to_string())
    }

    /// Cancel a plan that has not started executing.
    ///
    /// Terminal plans are returned unchanged. Plans that are mixing or
    /// executing cannot be recalled.
    pub async fn cancel(&self, payment_id: &PaymentId) -> Result<PaymentPlan, EngineError> {
        let lock = self
            .store
            .execution_lock(payment_id)
            .ok_or(EngineError::PaymentNotFound(*payment_id))?;
        let Ok(_guard) = lock.try_lock() else {
            // A replayed execute may hold the lock on a plan that is already final.
            return match self.store.get(payment_id) {
                Some(plan) if plan.status.is_final() => Ok(plan),
                plan => Err(EngineError::CancellationRejected {
                    payment_id: *payment_id,
                    status: plan.map(|p| p.status).unwrap_or(PaymentStatus::Executing),
                }),
            };
        };

        let mut plan = self
            .store
            .get(payment_id)
            .ok_or(EngineError::PaymentNotFound(*payment_id))?;
        match plan.status {
            PaymentStatus::Pending => {
                plan.fail(FailureReason::Cancelled)?;
                let detail = json!({ "reason": FailureReason::Cancelled });
                self.commit(&plan, PaymentStatus::Pending, detail).await?;
                tracing::info!(%payment_id, "Payment cancelled");
                Ok(plan)
            }
            status if status.is_final() => Ok(plan),
            status => Err(EngineError::CancellationRejected {
                payment_id: *payment_id,
                status,
            }),
        }
    }

    pub fn get_payment_status(&self, payment_id: &PaymentId) -> PaymentLookup {
        match self.store.get(payment_id) {
            Some(payment) => PaymentLookup::Found {
                status: payment.status,
                payment,
            },
            None => PaymentLookup::NotFound,
        }
    }

    /// Every tracked plan, in no particular order.
    pub fn payments(&self) -> Vec<PaymentPlan> {
        self.store.list()
    }

    async fn transition(
        &self,
        plan: &mut PaymentPlan,
        event: PaymentEvent,
        meta: serde_json::Value,
    ) -> Result<(), EngineError> {
        let from = plan.status;
        plan.apply(event)?;
        self.commit(plan, from, meta).await
    }

    /// Publish a status change that has already been applied to `plan`.
    async fn commit(
        &self,
        plan: &PaymentPlan,
        from: PaymentStatus,
        meta: serde_json::Value,
    ) -> Result<(), EngineError> {
        self.store.save(plan)?;
        if let Err(e) = self.durability.record_payment(plan).await {
            tracing::warn!(
                payment_id = %plan.payment_id,
                status = %plan.status,
                error = %e,
                "Failed to persist plan snapshot"
            );
        }
        if let Err(e) = self
            .durability
            .record_status_change(&plan.payment_id, plan.status, meta)
            .await
        {
            tracing::warn!(
                payment_id = %plan.payment_id,
                status = %plan.status,
                error = %e,
                "Failed to persist status change"
            );
        }
        self.events.publish(LifecycleEvent::StatusChanged {
            payment_id: plan.payment_id,
            from,
            to: plan.status,
            at: Utc::now(),
        });
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    // ── Chain administration ─────────────────────────────────────────

    pub fn register_chain(&self, profile: ChainProfile) -> Result<(), EngineError> {
        Ok(self.registry().register(profile)?)
    }

    pub fn set_chain_enabled(&self, id: &ChainId, enabled: bool) -> Result<(), EngineError> {
        Ok(self.registry().set_enabled(id, enabled)?)
    }

    pub fn list_chains(&self) -> Vec<ChainProfile> {
        self.registry().list_all()
    }

    /// Remove a chain that no unfinished plan settles on.
    pub fn remove_chain(&self, id: &ChainId) -> Result<ChainProfile, EngineError> {
        let _admin = self
            .chain_admin
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let in_flight = self
            .store
            .list()
            .iter()
            .filter(|p| !p.status.is_final() && p.uses_chain(id))
            .count();
        if in_flight > 0 {
            return Err(EngineError::ChainInUse {
                chain: id.clone(),
                payments: in_flight,
            });
        }
        Ok(self.registry().deregister(id)?)
    }

    /// Replace the exchange rates with a fresh pull from `feed`.
    pub async fn refresh_rates(
        &self,
        feed: &dyn ExchangeRateFeed,
    ) -> Result<Arc<RateSnapshot>, EngineError> {
        Ok(self.rates().refresh_from(feed).await?)
    }
}

fn to_alternative(candidate: ScoredCandidate) -> RouteAlternative {
    RouteAlternative {
        chain: candidate.chain,
        chain_amount: candidate.chain_amount,
        fee: candidate.fee,
        score: candidate.breakdown,
        total_score: candidate.total,
    }
}

/// The outcome a plan that already left `Pending` reports to callers.
fn recorded_outcome(plan: &PaymentPlan) -> Result<ExecutionResult, EngineError> {
    let payment_id = plan.payment_id;
    match plan.status {
        PaymentStatus::Confirmed => {
            plan.execution
                .clone()
                .ok_or_else(|| EngineError::ExecutionFailure {
                    payment_id,
                    reason: "confirmed plan has no execution record".into(),
                })
        }
        PaymentStatus::Failed => Err(match &plan.failure {
            Some(reason) => EngineError::from_failure(payment_id, reason),
            None => EngineError::ExecutionFailure {
                payment_id,
                reason: "failed plan has no recorded reason".into(),
            },
        }),
        status => Err(EngineError::ExecutionInProgress { payment_id, status }),
    }
}
