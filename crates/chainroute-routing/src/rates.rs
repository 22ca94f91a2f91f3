use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// Source of USD exchange rates (market data ingestion lives elsewhere).
#[async_trait]
pub trait ExchangeRateFeed: Send + Sync {
    /// Current `currency -> USD` quotes.
    async fn get_rates(&self) -> Result<HashMap<String, f64>, RoutingError>;
}

/// Immutable set of `currency -> USD` rates captured at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    rates: HashMap<String, f64>,
    pub captured_at: DateTime<Utc>,
}

impl RateSnapshot {
    /// Build a snapshot, normalising codes to upper case and dropping
    /// non-positive or non-finite quotes.
    pub fn new(rates: HashMap<String, f64>) -> Self {
        let rates = rates
            .into_iter()
            .filter_map(|(code, rate)| {
                if rate.is_finite() && rate > 0.0 {
                    Some((code.to_ascii_uppercase(), rate))
                } else {
                    tracing::warn!(currency = %code, rate, "Dropping invalid exchange rate");
                    None
                }
            })
            .collect();
        Self {
            rates,
            captured_at: Utc::now(),
        }
    }

    /// Snapshot with the built-in reference rates.
    pub fn with_defaults() -> Self {
        Self::new(default_rates())
    }

    /// USD value of one unit of `code`.
    ///
    /// Resolution order: `USD` itself, the exact code, then the base asset
    /// (`BTC-LN` resolves through `BTC`).
    pub fn usd_rate(&self, code: &str) -> Option<f64> {
        let code = code.to_ascii_uppercase();
        if code == "USD" {
            return Some(1.0);
        }
        if let Some(rate) = self.rates.get(&code) {
            return Some(*rate);
        }
        let base = code.split('-').next()?;
        if base == "USD" {
            return Some(1.0);
        }
        self.rates.get(base).copied()
    }

    /// Like [`usd_rate`](Self::usd_rate) but fails with `UnsupportedCurrency`.
    pub fn require(&self, code: &str) -> Result<f64, RoutingError> {
        self.usd_rate(code)
            .ok_or_else(|| RoutingError::UnsupportedCurrency(code.to_string()))
    }

    /// Number of explicit quotes (USD is implicit).
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Copy of the raw quotes.
    pub fn to_map(&self) -> HashMap<String, f64> {
        self.rates.clone()
    }
}

/// Convert `amount` of `from` into `to` through USD using one snapshot.
pub fn convert(
    amount: f64,
    from: &str,
    to: &str,
    snapshot: &RateSnapshot,
) -> Result<f64, RoutingError> {
    if from.eq_ignore_ascii_case(to) {
        return Ok(amount);
    }
    let from_usd = snapshot.require(from)?;
    let to_usd = snapshot.require(to)?;
    Ok(amount * from_usd / to_usd)
}

/// Shared holder of the current [`RateSnapshot`].
///
/// Updates build a fresh snapshot and swap it in; routing calls take one
/// `Arc` and use it for the whole computation.
pub struct RateTable {
    current: RwLock<Arc<RateSnapshot>>,
}

impl RateTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self {
            current: RwLock::new(Arc::new(RateSnapshot::new(rates))),
        }
    }

    /// Table seeded with the built-in reference rates.
    pub fn with_defaults() -> Self {
        Self::new(default_rates())
    }

    /// The snapshot to use for one computation.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace all rates.
    pub fn apply(&self, rates: HashMap<String, f64>) -> Arc<RateSnapshot> {
        let next = Arc::new(RateSnapshot::new(rates));
        self.swap(next.clone());
        tracing::info!(currencies = next.len(), "Exchange rates replaced");
        next
    }

    /// Overlay `updates` onto the current rates.
    pub fn merge(&self, updates: HashMap<String, f64>) -> Arc<RateSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut rates = guard.to_map();
        for (code, rate) in updates {
            rates.insert(code.to_ascii_uppercase(), rate);
        }
        let next = Arc::new(RateSnapshot::new(rates));
        *guard = next.clone();
        tracing::debug!(currencies = next.len(), "Exchange rates merged");
        next
    }

    /// Pull fresh quotes from `feed` and swap them in.
    pub async fn refresh_from(
        &self,
        feed: &dyn ExchangeRateFeed,
    ) -> Result<Arc<RateSnapshot>, RoutingError> {
        let rates = feed.get_rates().await?;
        Ok(self.apply(rates))
    }

    fn swap(&self, next: Arc<RateSnapshot>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Feed that always serves the same quotes. Useful for tests and demos.
pub struct StaticRateFeed {
    rates: HashMap<String, f64>,
}

impl StaticRateFeed {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl ExchangeRateFeed for StaticRateFeed {
    async fn get_rates(&self) -> Result<HashMap<String, f64>, RoutingError> {
        Ok(self.rates.clone())
    }
}

/// Built-in reference rates in USD.
pub fn default_rates() -> HashMap<String, f64> {
    [
        ("USD", 1.0),
        ("USDC", 1.0),
        ("EUR", 1.08),
        ("BTC", 60_000.0),
        ("ETH", 3_000.0),
        ("SOL", 150.0),
        ("XMR", 150.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Built-in rates with `overrides` applied on top.
pub fn default_rates_with(overrides: &HashMap<String, f64>) -> HashMap<String, f64> {
    let mut rates = default_rates();
    for (code, rate) in overrides {
        rates.insert(code.to_ascii_uppercase(), *rate);
    }
    rates
}
