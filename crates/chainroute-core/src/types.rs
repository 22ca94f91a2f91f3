use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::CoreError;

/// Identifier of a settlement backend ("chain"), e.g. `BTC` or `BTC-LN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Create a chain ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base asset this chain settles in.
    ///
    /// Suffixed variants such as `BTC-LN` share the base asset `BTC` for
    /// pricing while keeping their own capability profile.
    pub fn base_asset(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ChainId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// How much transactional metadata a backend exposes, ordered from most to
/// least revealing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    #[default]
    Low,
    Medium,
    High,
    Maximum,
}

impl PrivacyLevel {
    /// Ordinal used by the privacy scoring component (low = 0 .. maximum = 3).
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Maximum => 3,
        }
    }

    /// Whether a request at this tier must be mixed before settlement.
    pub fn requires_mixing(&self) -> bool {
        matches!(self, Self::High | Self::Maximum)
    }

    /// Parse a tier name (`low`, `medium`, `high`, `maximum`).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "maximum" => Ok(Self::Maximum),
            other => Err(CoreError::Validation(format!(
                "unknown privacy level: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Maximum => write!(f, "maximum"),
        }
    }
}

/// Requested settlement latency tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Instant,
    Fast,
    #[default]
    Normal,
    Patient,
}

impl fmt::Display for SpeedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instant => write!(f, "instant"),
            Self::Fast => write!(f, "fast"),
            Self::Normal => write!(f, "normal"),
            Self::Patient => write!(f, "patient"),
        }
    }
}

/// How strongly fees should weigh in the routing decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostPreference {
    Minimize,
    #[default]
    Balanced,
    DontCare,
}

impl fmt::Display for CostPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimize => write!(f, "minimize"),
            Self::Balanced => write!(f, "balanced"),
            Self::DontCare => write!(f, "dont_care"),
        }
    }
}

/// Per-request routing preferences. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingPreferences {
    pub privacy: PrivacyLevel,
    pub speed: SpeedTier,
    pub cost: CostPreference,
}

/// Capability profile of a settlement backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainProfile {
    /// Unique chain identifier.
    pub id: ChainId,
    /// Human-readable name.
    pub name: String,
    /// Asset used to look up the exchange rate. Defaults to the base asset
    /// of `id`.
    #[serde(default)]
    pub asset: String,
    /// Smallest amount (native units) the backend handles well.
    pub min_amount: f64,
    /// Largest amount (native units) the backend handles well.
    pub max_amount: f64,
    /// Average fee in native units.
    pub avg_fee: f64,
    /// Expected latency from submission to settlement.
    pub confirmation_time_ms: u64,
    /// Privacy tier of the backend.
    pub privacy_level: PrivacyLevel,
    /// Whether the backend may be chosen by new routing decisions.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ChainProfile {
    /// Create an enabled profile whose rate asset is derived from the id.
    pub fn new(
        id: impl Into<ChainId>,
        name: impl Into<String>,
        min_amount: f64,
        max_amount: f64,
        avg_fee: f64,
        confirmation_time_ms: u64,
        privacy_level: PrivacyLevel,
    ) -> Self {
        let id = id.into();
        let asset = id.base_asset().to_string();
        Self {
            id,
            name: name.into(),
            asset,
            min_amount,
            max_amount,
            avg_fee,
            confirmation_time_ms,
            privacy_level,
            enabled: true,
        }
    }

    /// Override the rate asset.
    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = asset.into();
        self
    }

    /// The asset key used for exchange-rate lookups.
    pub fn rate_asset(&self) -> &str {
        if self.asset.is_empty() {
            self.id.base_asset()
        } else {
            &self.asset
        }
    }

    /// Validate that all fields are within acceptable ranges.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.as_str().trim().is_empty() {
            return Err(CoreError::Validation("chain id is empty".into()));
        }
        if !self.min_amount.is_finite() || self.min_amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "min_amount out of range: {}",
                self.min_amount
            )));
        }
        if !self.max_amount.is_finite() || self.max_amount < self.min_amount {
            return Err(CoreError::Validation(format!(
                "max_amount {} is below min_amount {}",
                self.max_amount, self.min_amount
            )));
        }
        if !self.avg_fee.is_finite() || self.avg_fee < 0.0 {
            return Err(CoreError::Validation(format!(
                "avg_fee out of range: {}",
                self.avg_fee
            )));
        }
        Ok(())
    }
}

/// A caller's request to move value from one party to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub from: String,
    pub to: String,
    /// Amount in `currency` units. Must be positive.
    pub amount: f64,
    /// Currency code of `amount` (e.g. `USD`, `BTC`).
    pub currency: String,
    #[serde(default)]
    pub reason: String,
    /// Optional caller correlation id.
    #[serde(default)]
    pub clip_id: Option<String>,
    #[serde(default)]
    pub preferences: RoutingPreferences,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentRequest {
    /// Create a request with default preferences and no metadata.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            currency: currency.into(),
            reason: String::new(),
            clip_id: None,
            preferences: RoutingPreferences::default(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_preferences(mut self, preferences: RoutingPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacyLevel) -> Self {
        self.preferences.privacy = privacy;
        self
    }

    pub fn with_speed(mut self, speed: SpeedTier) -> Self {
        self.preferences.speed = speed;
        self
    }

    pub fn with_cost(mut self, cost: CostPreference) -> Self {
        self.preferences.cost = cost;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Reject non-positive or non-finite amounts.
    pub fn validate_amount(&self) -> Result<(), CoreError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(CoreError::InvalidAmount(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}
