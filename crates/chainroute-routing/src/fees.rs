use std::sync::Arc;

use chainroute_core::{ChainId, ChainProfile, FeeEstimate};
use dashmap::DashMap;

use crate::error::RoutingError;
use crate::rates::{convert, RateSnapshot};

/// Source of per-chain fee multipliers reflecting current network load.
pub trait CongestionFeed: Send + Sync {
    /// Multiplier for `chain`, or `None` when no reading is available.
    fn multiplier(&self, chain: &ChainId) -> Option<f64>;
}

/// Operator-maintained congestion readings.
#[derive(Default)]
pub struct StaticCongestion {
    multipliers: DashMap<ChainId, f64>,
}

impl StaticCongestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, chain: ChainId, multiplier: f64) {
        self.multipliers.insert(chain, multiplier);
    }

    pub fn clear(&self, chain: &ChainId) {
        self.multipliers.remove(chain);
    }
}

impl CongestionFeed for StaticCongestion {
    fn multiplier(&self, chain: &ChainId) -> Option<f64> {
        self.multipliers.get(chain).map(|m| *m)
    }
}

/// Estimates what settling on a chain will cost.
#[derive(Clone, Default)]
pub struct FeeCalculator {
    congestion: Option<Arc<dyn CongestionFeed>>,
}

impl FeeCalculator {
    /// Calculator without a congestion feed (multiplier 1.0 everywhere).
    pub fn new() -> Self {
        Self { congestion: None }
    }

    pub fn with_congestion(congestion: Arc<dyn CongestionFeed>) -> Self {
        Self {
            congestion: Some(congestion),
        }
    }

    /// Effective multiplier for `chain`. Missing, negative or non-finite
    /// readings fall back to sane values.
    pub fn multiplier(&self, chain: &ChainId) -> f64 {
        match self.congestion.as_ref().and_then(|c| c.multiplier(chain)) {
            Some(m) if m.is_finite() => m.max(0.0),
            _ => 1.0,
        }
    }

    /// Fee for settling on `profile`, in native units, USD, and the request
    /// currency.
    pub fn estimate(
        &self,
        profile: &ChainProfile,
        request_currency: &str,
        snapshot: &RateSnapshot,
    ) -> Result<FeeEstimate, RoutingError> {
        let congestion_multiplier = self.multiplier(&profile.id);
        let native = profile.avg_fee * congestion_multiplier;
        let usd = native * snapshot.require(profile.rate_asset())?;
        let request_currency = convert(native, profile.rate_asset(), request_currency, snapshot)?;
        Ok(FeeEstimate {
            native,
            usd,
            request_currency,
            congestion_multiplier,
        })
    }
}
