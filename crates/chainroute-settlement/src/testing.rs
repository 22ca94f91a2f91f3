//! Shared fixtures for unit tests.

use chainroute_core::{
    ChainId, FeeEstimate, PaymentId, PaymentPlan, PaymentRequest, PaymentStatus, ScoreBreakdown,
};
use chrono::Utc;

/// A pending plan that settles 10 USD on SOL.
pub(crate) fn sample_plan() -> PaymentPlan {
    let now = Utc::now();
    PaymentPlan {
        payment_id: PaymentId::new(),
        request: PaymentRequest::new("alice", "bob", 10.0, "USD"),
        chain: ChainId::new("SOL"),
        chain_amount: 10.0 / 150.0,
        fee: FeeEstimate {
            native: 0.000005,
            usd: 0.00075,
            request_currency: 0.00075,
            congestion_multiplier: 1.0,
        },
        score: ScoreBreakdown::default(),
        total_score: 0.0,
        needs_mixing: false,
        alternatives: Vec::new(),
        status: PaymentStatus::Pending,
        created_at: now,
        estimated_confirmation_at: now,
        confirmed_at: None,
        mix_id: None,
        tx_hash: None,
        execution: None,
        failure: None,
    }
}
