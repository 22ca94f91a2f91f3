//! Chainroute core: the shared vocabulary of the settlement routing engine.
//!
//! Chain capability profiles, payment requests and plans, and the payment
//! lifecycle state machine used by the routing and settlement crates.

pub mod config;
pub mod error;
pub mod payment;
pub mod state_machine;
pub mod types;

pub use config::{EnginePolicy, MAX_ALTERNATIVES};
pub use error::CoreError;
pub use payment::{
    ExecutionResult, FailureReason, FeeEstimate, PaymentId, PaymentPlan, RouteAlternative,
    ScoreBreakdown,
};
pub use state_machine::{PaymentEvent, PaymentStateMachine, PaymentStatus};
pub use types::{
    ChainId, ChainProfile, CostPreference, PaymentRequest, PrivacyLevel, RoutingPreferences,
    SpeedTier,
};
