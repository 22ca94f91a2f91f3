use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;
use crate::state_machine::{PaymentEvent, PaymentStateMachine, PaymentStatus};
use crate::types::{ChainId, PaymentRequest};

/// Globally unique payment identifier, doubling as the idempotency key for
/// execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub Uuid);

impl PaymentId {
    /// Create a new identifier from the OS random source (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::Validation(format!("invalid payment id {s:?}: {e}")))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-criterion scores for one candidate chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 0..=30
    pub amount_fit: f64,
    /// 0..=25
    pub privacy_match: f64,
    /// 0..=20
    pub speed_match: f64,
    /// 0..=25
    pub cost_efficiency: f64,
}

impl ScoreBreakdown {
    pub const MAX_AMOUNT_FIT: f64 = 30.0;
    pub const MAX_PRIVACY_MATCH: f64 = 25.0;
    pub const MAX_SPEED_MATCH: f64 = 20.0;
    pub const MAX_COST_EFFICIENCY: f64 = 25.0;

    /// Sum of all components, in `0..=100`.
    pub fn total(&self) -> f64 {
        self.amount_fit + self.privacy_match + self.speed_match + self.cost_efficiency
    }
}

/// Fee estimate for settling on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Fee in the chain's native units.
    pub native: f64,
    /// Fee in USD.
    pub usd: f64,
    /// Fee expressed in the request currency.
    pub request_currency: f64,
    /// Congestion multiplier applied to the chain's average fee.
    pub congestion_multiplier: f64,
}

/// A ranked runner-up chain attached to a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAlternative {
    pub chain: ChainId,
    pub chain_amount: f64,
    pub fee: FeeEstimate,
    pub score: ScoreBreakdown,
    pub total_score: f64,
}

/// Settlement evidence returned by a chain executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub tx_hash: String,
    pub confirmations: u32,
    /// Fee actually charged, in native units.
    pub fee_charged: f64,
    pub timestamp: DateTime<Utc>,
}

/// Why a plan ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    Mixing(String),
    Execution(String),
    Timeout { after_ms: u64 },
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mixing(msg) => write!(f, "mixing failed: {}", msg),
            Self::Execution(msg) => write!(f, "execution failed: {}", msg),
            Self::Timeout { after_ms } => write!(f, "execution timed out after {} ms", after_ms),
            Self::Cancelled => write!(f, "cancelled before execution"),
        }
    }
}

/// A routed payment and everything learned about it during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub payment_id: PaymentId,
    pub request: PaymentRequest,
    /// The chosen chain.
    pub chain: ChainId,
    /// Request amount converted into the chosen chain's native units.
    pub chain_amount: f64,
    pub fee: FeeEstimate,
    pub score: ScoreBreakdown,
    pub total_score: f64,
    pub needs_mixing: bool,
    /// Up to two ranked runner-ups.
    pub alternatives: Vec<RouteAlternative>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_confirmation_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub mix_id: Option<String>,
    pub tx_hash: Option<String>,
    pub execution: Option<ExecutionResult>,
    pub failure: Option<FailureReason>,
}

impl PaymentPlan {
    /// Apply a lifecycle event, updating `status` on success.
    pub fn apply(&mut self, event: PaymentEvent) -> Result<PaymentStatus, CoreError> {
        let next = PaymentStateMachine::transition(self.status, event)?;
        self.status = next;
        Ok(next)
    }

    /// Record a successful settlement and move to `Confirmed`.
    pub fn confirm(&mut self, result: ExecutionResult) -> Result<(), CoreError> {
        self.apply(PaymentEvent::Confirmed)?;
        self.tx_hash = Some(result.tx_hash.clone());
        self.confirmed_at = Some(Utc::now());
        self.execution = Some(result);
        Ok(())
    }

    /// Record a failure and move to `Failed`.
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), CoreError> {
        self.apply(PaymentEvent::Failed)?;
        self.failure = Some(reason);
        Ok(())
    }

    /// Milliseconds between creation and confirmation, once confirmed.
    pub fn confirmation_duration_ms(&self) -> Option<i64> {
        self.confirmed_at
            .map(|at| at.signed_duration_since(self.created_at).num_milliseconds())
    }

    /// Whether the plan settles on (or is currently headed to) `chain`.
    pub fn uses_chain(&self, chain: &ChainId) -> bool {
        &self.chain == chain
    }
}
