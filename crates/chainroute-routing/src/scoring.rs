//! Multi-criteria chain scoring.
//!
//! Each enabled chain is scored on four criteria whose maxima add up to 100:
//!
//! | criterion         | max | input                                   |
//! |-------------------|-----|-----------------------------------------|
//! | `amount_fit`      | 30  | position of the amount in `[min, max]`  |
//! | `privacy_match`   | 25  | chain tier vs requested tier            |
//! | `speed_match`     | 20  | confirmation time vs requested speed    |
//! | `cost_efficiency` | 25  | fee / amount in the request currency    |

use std::cmp::Ordering;

use chainroute_core::{
    ChainId, ChainProfile, CostPreference, FeeEstimate, PaymentRequest, PrivacyLevel,
    ScoreBreakdown, SpeedTier,
};
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::fees::FeeCalculator;
use crate::rates::{convert, RateSnapshot};

/// Position within `[min, max]` that earns the full amount score.
const AMOUNT_SWEET_SPOT: f64 = 0.3;
/// Score for amounts above a chain's comfortable maximum.
const ABOVE_MAX_SCORE: f64 = 10.0;
/// Flat cost score when the caller does not care about fees.
const DONT_CARE_COST_SCORE: f64 = 15.0;

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// One ranked chain for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub chain: ChainId,
    /// Request amount in the chain's native units.
    pub chain_amount: f64,
    pub fee: FeeEstimate,
    pub breakdown: ScoreBreakdown,
    pub total: f64,
    /// Expected settlement latency of the chain at scoring time.
    pub confirmation_time_ms: u64,
}

/// Amount score: 0 below `min`, a flat 10 above `max`, otherwise peaking at
/// 30% into the range and falling off linearly on both sides.
pub fn amount_fit(native_amount: f64, profile: &ChainProfile) -> f64 {
    if native_amount < profile.min_amount {
        return 0.0;
    }
    if native_amount > profile.max_amount {
        return ABOVE_MAX_SCORE;
    }
    let span = profile.max_amount - profile.min_amount;
    let position = if span > 0.0 {
        (native_amount - profile.min_amount) / span
    } else {
        0.0
    };
    (ScoreBreakdown::MAX_AMOUNT_FIT - 60.0 * (position - AMOUNT_SWEET_SPOT).abs()).max(0.0)
}

/// Privacy score: full marks when the chain meets the tier, proportional
/// otherwise.
pub fn privacy_match(chain: PrivacyLevel, required: PrivacyLevel) -> f64 {
    if chain.ordinal() >= required.ordinal() {
        return ScoreBreakdown::MAX_PRIVACY_MATCH;
    }
    // required >= 1 here: low is met by every chain.
    ScoreBreakdown::MAX_PRIVACY_MATCH * f64::from(chain.ordinal()) / f64::from(required.ordinal())
}

/// Stepped speed score for a chain's confirmation latency.
pub fn speed_match(confirmation_time_ms: u64, speed: SpeedTier) -> f64 {
    let t = confirmation_time_ms;
    match speed {
        SpeedTier::Instant => {
            if t < 5 * SECOND_MS {
                20.0
            } else if t < 30 * SECOND_MS {
                10.0
            } else if t <= MINUTE_MS {
                5.0
            } else {
                0.0
            }
        }
        SpeedTier::Fast => {
            if t <= MINUTE_MS {
                20.0
            } else if t <= 10 * MINUTE_MS {
                10.0
            } else {
                3.0
            }
        }
        SpeedTier::Normal => {
            if t <= 10 * MINUTE_MS {
                20.0
            } else if t <= HOUR_MS {
                12.0
            } else {
                5.0
            }
        }
        SpeedTier::Patient => ScoreBreakdown::MAX_SPEED_MATCH,
    }
}

/// Cost score for `fee_ratio = fee / amount` (both in the request currency).
pub fn cost_efficiency(fee_ratio: f64, cost: CostPreference) -> f64 {
    let (full_until, zero_from) = match cost {
        CostPreference::Minimize => (0.01, 0.10),
        CostPreference::Balanced => (0.05, 0.30),
        CostPreference::DontCare => return DONT_CARE_COST_SCORE,
    };
    if fee_ratio <= full_until {
        ScoreBreakdown::MAX_COST_EFFICIENCY
    } else if fee_ratio >= zero_from {
        0.0
    } else {
        ScoreBreakdown::MAX_COST_EFFICIENCY * (zero_from - fee_ratio) / (zero_from - full_until)
    }
}

/// Score one chain for `request` against a single rate snapshot.
pub fn score_chain(
    request: &PaymentRequest,
    profile: &ChainProfile,
    snapshot: &RateSnapshot,
    fees: &FeeCalculator,
) -> Result<ScoredCandidate, RoutingError> {
    let prefs = &request.preferences;
    let chain_amount = convert(request.amount, &request.currency, profile.rate_asset(), snapshot)?;
    let fee = fees.estimate(profile, &request.currency, snapshot)?;
    let fee_ratio = fee.request_currency / request.amount;

    let breakdown = ScoreBreakdown {
        amount_fit: amount_fit(chain_amount, profile),
        privacy_match: privacy_match(profile.privacy_level, prefs.privacy),
        speed_match: speed_match(profile.confirmation_time_ms, prefs.speed),
        cost_efficiency: cost_efficiency(fee_ratio, prefs.cost),
    };

    tracing::debug!(
        chain = %profile.id,
        chain_amount,
        fee_ratio,
        amount_fit = breakdown.amount_fit,
        privacy_match = breakdown.privacy_match,
        speed_match = breakdown.speed_match,
        cost_efficiency = breakdown.cost_efficiency,
        "scored chain"
    );

    Ok(ScoredCandidate {
        chain: profile.id.clone(),
        chain_amount,
        fee,
        total: breakdown.total(),
        breakdown,
        confirmation_time_ms: profile.confirmation_time_ms,
    })
}

/// Ranking order: higher total first, then lower USD fee, then chain id.
pub fn compare_candidates(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.total
        .partial_cmp(&a.total)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.fee.usd.partial_cmp(&b.fee.usd).unwrap_or(Ordering::Equal))
        .then_with(|| a.chain.cmp(&b.chain))
}
