use async_trait::async_trait;
use chainroute_core::{ExecutionResult, PaymentId, PaymentPlan, PaymentStatus, SpeedTier};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, PersistenceError};

/// Input handed to a [`Mixer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixRequest {
    pub payment_id: PaymentId,
    pub from: String,
    pub to: String,
    /// Amount in the chosen chain's native units.
    pub amount: f64,
    /// Asset of `amount`.
    pub currency: String,
    pub urgency: SpeedTier,
}

impl MixRequest {
    pub fn for_plan(plan: &PaymentPlan, currency: &str) -> Self {
        Self {
            payment_id: plan.payment_id,
            from: plan.request.from.clone(),
            to: plan.request.to.clone(),
            amount: plan.chain_amount,
            currency: currency.to_string(),
            urgency: plan.request.preferences.speed,
        }
    }
}

/// What the mixer reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixOutcome {
    pub mix_id: String,
    /// Amounts of the individual outputs the mixer created.
    pub splits: Vec<f64>,
}

/// Privacy pre-processing step. Called at most once per payment.
#[async_trait]
pub trait Mixer: Send + Sync {
    async fn mix(&self, request: MixRequest) -> Result<MixOutcome, BackendError>;
}

/// Settlement backend that broadcasts a routed plan.
///
/// Implementations may take up to the chain's confirmation time to return.
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    async fn submit(&self, plan: &PaymentPlan) -> Result<ExecutionResult, BackendError>;
}

/// Record sink for plans and their status changes.
///
/// `record_payment` stores the latest snapshot of a plan, replacing any
/// earlier one; it is called at routing time and after every transition.
/// `record_status_change` appends to the plan's history.
///
/// Failures are logged by the engine and never roll back an in-memory
/// transition.
#[async_trait]
pub trait Durability: Send + Sync {
    async fn record_payment(&self, plan: &PaymentPlan) -> Result<(), PersistenceError>;

    async fn record_status_change(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        meta: serde_json::Value,
    ) -> Result<(), PersistenceError>;
}
