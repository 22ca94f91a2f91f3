use std::fmt;

use crate::error::CoreError;

/// The lifecycle states of a routed payment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Plan created by routing, nothing submitted yet.
    Pending,
    /// Funds are being passed through the mixer.
    Mixing,
    /// Submitted to the chain executor, awaiting settlement.
    Executing,
    /// Settlement confirmed. Final state.
    Confirmed,
    /// Mixing, execution, deadline or cancellation failed. Final state.
    Failed,
}

impl PaymentStatus {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Whether an execution has moved the plan past `Pending` but not yet
    /// reached a final state.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Mixing | Self::Executing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Mixing => "mixing",
            Self::Executing => "executing",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that trigger lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    /// The mixer accepted the payment.
    MixingStarted,
    /// The plan was handed to the chain executor.
    SubmissionStarted,
    /// The executor reported settlement.
    Confirmed,
    /// Any error, deadline expiry or cancellation.
    Failed,
}

/// Lifecycle transition table.
///
/// Valid transitions:
/// - Pending → Mixing (MixingStarted)
/// - Pending → Executing (SubmissionStarted)
/// - Mixing → Executing (SubmissionStarted)
/// - Executing → Confirmed (Confirmed)
/// - Pending | Mixing | Executing → Failed (Failed)
pub struct PaymentStateMachine;

impl PaymentStateMachine {
    /// Attempt a state transition based on an event.
    /// Returns the new state on success, or an error for invalid transitions.
    pub fn transition(
        current: PaymentStatus,
        event: PaymentEvent,
    ) -> Result<PaymentStatus, CoreError> {
        let next = match (current, event) {
            (PaymentStatus::Pending, PaymentEvent::MixingStarted) => PaymentStatus::Mixing,
            (PaymentStatus::Pending, PaymentEvent::SubmissionStarted) => PaymentStatus::Executing,
            (PaymentStatus::Mixing, PaymentEvent::SubmissionStarted) => PaymentStatus::Executing,
            (PaymentStatus::Executing, PaymentEvent::Confirmed) => PaymentStatus::Confirmed,
            (
                PaymentStatus::Pending | PaymentStatus::Mixing | PaymentStatus::Executing,
                PaymentEvent::Failed,
            ) => PaymentStatus::Failed,
            _ => {
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: Self::target_of(event),
                });
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "payment status transition");

        Ok(next)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: PaymentStatus, event: PaymentEvent) -> bool {
        Self::transition(current, event).is_ok()
    }

    fn target_of(event: PaymentEvent) -> PaymentStatus {
        match event {
            PaymentEvent::MixingStarted => PaymentStatus::Mixing,
            PaymentEvent::SubmissionStarted => PaymentStatus::Executing,
            PaymentEvent::Confirmed => PaymentStatus::Confirmed,
            PaymentEvent::Failed => PaymentStatus::Failed,
        }
    }
}
