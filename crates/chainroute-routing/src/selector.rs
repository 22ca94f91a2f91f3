use std::cmp::Ordering;
use std::sync::Arc;

use chainroute_core::{ChainId, ChainProfile, PaymentRequest, PrivacyLevel};

use crate::error::RoutingError;
use crate::fees::FeeCalculator;
use crate::rates::{convert, RateTable};
use crate::registry::ChainRegistry;
use crate::scoring::{compare_candidates, score_chain, ScoredCandidate};

/// Ranks enabled chains for payment requests.
///
/// Every call takes one registry snapshot and one rate snapshot, so a
/// concurrent rate refresh or chain toggle never leaks into a computation
/// halfway through.
#[derive(Clone)]
pub struct Router {
    registry: Arc<ChainRegistry>,
    rates: Arc<RateTable>,
    fees: FeeCalculator,
}

impl Router {
    pub fn new(registry: Arc<ChainRegistry>, rates: Arc<RateTable>, fees: FeeCalculator) -> Self {
        Self {
            registry,
            rates,
            fees,
        }
    }

    /// Router over the built-in chains and reference rates.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(ChainRegistry::with_defaults()),
            Arc::new(RateTable::with_defaults()),
            FeeCalculator::new(),
        )
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub fn rates(&self) -> &Arc<RateTable> {
        &self.rates
    }

    /// Score every enabled chain for `request`, best first.
    ///
    /// Chains whose asset has no exchange rate are skipped.
    pub fn rank(&self, request: &PaymentRequest) -> Result<Vec<ScoredCandidate>, RoutingError> {
        request
            .validate_amount()
            .map_err(|e| RoutingError::InvalidAmount(e.to_string()))?;

        let chains = self.registry.list_enabled();
        if chains.is_empty() {
            return Err(RoutingError::NoAvailableBackend);
        }

        let snapshot = self.rates.snapshot();
        snapshot.require(&request.currency)?;

        let mut candidates = Vec::with_capacity(chains.len());
        for profile in &chains {
            match score_chain(request, profile, &snapshot, &self.fees) {
                Ok(candidate) => candidates.push(candidate),
                Err(RoutingError::UnsupportedCurrency(asset)) => {
                    tracing::warn!(
                        chain = %profile.id,
                        %asset,
                        "Skipping chain without exchange rate"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if candidates.is_empty() {
            return Err(RoutingError::NoAvailableBackend);
        }

        candidates.sort_by(compare_candidates);
        Ok(candidates)
    }

    /// Quick recommendation for previews; does not run the full scoring.
    ///
    /// Prefers chains whose amount range covers the payment, then chains that
    /// meet the privacy tier (or the most private ones available), then the
    /// lowest USD fee, then the lowest latency.
    pub fn recommend(
        &self,
        amount: f64,
        currency: &str,
        privacy: PrivacyLevel,
    ) -> Result<ChainId, RoutingError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RoutingError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount
            )));
        }

        let snapshot = self.rates.snapshot();
        snapshot.require(currency)?;

        // (profile, native amount, fee in USD)
        let priced: Vec<(ChainProfile, f64, f64)> = self
            .registry
            .list_enabled()
            .into_iter()
            .filter_map(|p| {
                let native = convert(amount, currency, p.rate_asset(), &snapshot).ok()?;
                let fee_usd = self.fees.estimate(&p, currency, &snapshot).ok()?.usd;
                Some((p, native, fee_usd))
            })
            .collect();
        if priced.is_empty() {
            return Err(RoutingError::NoAvailableBackend);
        }

        let in_range: Vec<_> = priced
            .iter()
            .filter(|(p, native, _)| *native >= p.min_amount && *native <= p.max_amount)
            .collect();
        let pool: Vec<_> = if in_range.is_empty() {
            priced.iter().collect()
        } else {
            in_range
        };

        let best_tier = pool
            .iter()
            .map(|(p, _, _)| p.privacy_level)
            .max()
            .unwrap_or(PrivacyLevel::Low);
        let required = privacy.min(best_tier);

        pool.into_iter()
            .filter(|(p, _, _)| p.privacy_level >= required)
            .min_by(|a, b| {
                a.2.partial_cmp(&b.2)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.0.confirmation_time_ms.cmp(&b.0.confirmation_time_ms))
                    .then_with(|| a.0.id.cmp(&b.0.id))
            })
            .map(|(p, _, _)| p.id.clone())
            .ok_or(RoutingError::NoAvailableBackend)
    }
}
