use std::collections::BTreeMap;

use chainroute_core::{ChainId, PaymentId, PaymentPlan, PaymentRequest};
use futures::future::join_all;
use serde::Serialize;

use crate::engine::RoutingEngine;

/// Outcome for one request of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchItem {
    Routed { index: usize, plan: Box<PaymentPlan> },
    Failed { index: usize, error: String },
}

impl BatchItem {
    pub fn index(&self) -> usize {
        match self {
            Self::Routed { index, .. } | Self::Failed { index, .. } => *index,
        }
    }

    pub fn plan(&self) -> Option<&PaymentPlan> {
        match self {
            Self::Routed { plan, .. } => Some(plan),
            Self::Failed { .. } => None,
        }
    }
}

/// Result of [`RoutingEngine::batch_route`].
#[derive(Debug, Clone, Serialize)]
pub struct BatchRouteSummary {
    /// One entry per request, in input order.
    pub routes: Vec<BatchItem>,
    /// Payment ids grouped by the chain they were routed to.
    pub by_chain: BTreeMap<ChainId, Vec<PaymentId>>,
    pub total_payments: usize,
    pub successful_routes: usize,
}

impl RoutingEngine {
    /// Route every request independently. A failing request is reported in
    /// its slot and does not affect the others.
    pub async fn batch_route(&self, requests: Vec<PaymentRequest>) -> BatchRouteSummary {
        let total_payments = requests.len();
        let outcomes = join_all(requests.into_iter().map(|r| self.route(r))).await;

        let mut by_chain: BTreeMap<ChainId, Vec<PaymentId>> = BTreeMap::new();
        let routes: Vec<BatchItem> = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| match outcome {
                Ok(plan) => {
                    by_chain
                        .entry(plan.chain.clone())
                        .or_default()
                        .push(plan.payment_id);
                    BatchItem::Routed {
                        index,
                        plan: Box::new(plan),
                    }
                }
                Err(e) => {
                    tracing::debug!(index, error = %e, "Batch item not routed");
                    BatchItem::Failed {
                        index,
                        error: e.to_string(),
                    }
                }
            })
            .collect();

        let successful_routes = routes.iter().filter(|r| r.plan().is_some()).count();
        tracing::info!(total_payments, successful_routes, chains = by_chain.len(), "Batch routed");

        BatchRouteSummary {
            routes,
            by_chain,
            total_payments,
            successful_routes,
        }
    }
}
