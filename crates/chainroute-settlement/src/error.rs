use chainroute_core::{ChainId, CoreError, FailureReason, PaymentId, PaymentStatus};
use chainroute_routing::RoutingError;

/// Error reported by an external collaborator (mixer or chain executor).
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

/// Error reported by a [`Durability`](crate::traits::Durability) sink.
#[derive(Debug, Clone, thiserror::Error)]
#[error("persistence failure: {0}")]
pub struct PersistenceError(pub String);

/// Errors surfaced by the routing engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("payment already exists: {0}")]
    DuplicatePayment(PaymentId),

    #[error("mixing failed for payment {payment_id}: {reason}")]
    MixingFailure { payment_id: PaymentId, reason: String },

    #[error("execution failed for payment {payment_id}: {reason}")]
    ExecutionFailure { payment_id: PaymentId, reason: String },

    #[error("payment {payment_id} timed out after {after_ms} ms")]
    Timeout { payment_id: PaymentId, after_ms: u64 },

    #[error("payment {0} was cancelled")]
    Cancelled(PaymentId),

    #[error("payment {payment_id} is already {status}")]
    ExecutionInProgress {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    #[error("payment {payment_id} cannot be cancelled while {status}")]
    CancellationRejected {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    #[error("chain {chain} is referenced by {payments} in-flight payment(s)")]
    ChainInUse { chain: ChainId, payments: usize },
}

impl EngineError {
    /// Rebuild the error that a failed plan reported when it failed.
    pub fn from_failure(payment_id: PaymentId, reason: &FailureReason) -> Self {
        match reason {
            FailureReason::Mixing(reason) => Self::MixingFailure {
                payment_id,
                reason: reason.clone(),
            },
            FailureReason::Execution(reason) => Self::ExecutionFailure {
                payment_id,
                reason: reason.clone(),
            },
            FailureReason::Timeout { after_ms } => Self::Timeout {
                payment_id,
                after_ms: *after_ms,
            },
            FailureReason::Cancelled => Self::Cancelled(payment_id),
        }
    }

    /// The failure reason to record on a plan for this error, if it ends the
    /// plan's lifecycle.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::MixingFailure { reason, .. } => Some(FailureReason::Mixing(reason.clone())),
            Self::ExecutionFailure { reason, .. } => Some(FailureReason::Execution(reason.clone())),
            Self::Timeout { after_ms, .. } => Some(FailureReason::Timeout {
                after_ms: *after_ms,
            }),
            Self::Cancelled(_) => Some(FailureReason::Cancelled),
            _ => None,
        }
    }
}
