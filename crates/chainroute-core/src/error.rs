use crate::state_machine::PaymentStatus;

/// Core model errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("validation failed: {0}")]
    Validation(String),
}
