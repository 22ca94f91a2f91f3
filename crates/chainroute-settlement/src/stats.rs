use std::collections::BTreeMap;

use chainroute_core::{ChainId, PaymentStatus};
use chainroute_routing::convert;
use serde::{Deserialize, Serialize};

use crate::engine::RoutingEngine;

/// Aggregates for one chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    pub payments: usize,
    pub confirmed: usize,
    pub failed: usize,
    /// Request amounts valued at the current rates.
    pub volume_usd: f64,
    /// Estimated fees, in USD at routing time.
    pub fees_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_payments: usize,
    pub by_chain: BTreeMap<ChainId, ChainStats>,
    pub by_status: BTreeMap<PaymentStatus, usize>,
    /// Mean of `confirmed_at - created_at` over confirmed plans.
    pub avg_confirmation_time_ms: Option<f64>,
    pub enabled_chains: Vec<ChainId>,
}

impl RoutingEngine {
    /// Read-only summary of every tracked plan.
    pub fn get_stats(&self) -> EngineStats {
        let snapshot = self.rates().snapshot();
        let plans = self.payments();

        let mut stats = EngineStats {
            total_payments: plans.len(),
            enabled_chains: self.registry().enabled_ids(),
            ..EngineStats::default()
        };
        let mut durations = Vec::new();

        for plan in &plans {
            *stats.by_status.entry(plan.status).or_default() += 1;

            let chain = stats.by_chain.entry(plan.chain.clone()).or_default();
            chain.payments += 1;
            chain.fees_usd += plan.fee.usd;
            match convert(plan.request.amount, &plan.request.currency, "USD", &snapshot) {
                Ok(usd) => chain.volume_usd += usd,
                Err(e) => {
                    tracing::debug!(
                        payment_id = %plan.payment_id,
                        error = %e,
                        "Volume left out of stats"
                    )
                }
            }
            match plan.status {
                PaymentStatus::Confirmed => chain.confirmed += 1,
                PaymentStatus::Failed => chain.failed += 1,
                _ => {}
            }

            if let Some(ms) = plan.confirmation_duration_ms() {
                durations.push(ms as f64);
            }
        }

        if !durations.is_empty() {
            stats.avg_confirmation_time_ms =
                Some(durations.iter().sum::<f64>() / durations.len() as f64);
        }
        stats
    }
}
