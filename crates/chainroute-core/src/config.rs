use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on runner-up chains attached to a plan.
pub const MAX_ALTERNATIVES: usize = 2;

/// Tunable routing and lifecycle policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// Requests above this amount (in request-currency units) are mixed
    /// regardless of the requested privacy tier.
    #[serde(default = "default_disclosure_threshold")]
    pub disclosure_threshold: f64,
    /// Deadline for the mixer and executor work of one `execute` call.
    /// `0` disables the deadline.
    #[serde(default = "default_execute_timeout_ms")]
    pub execute_timeout_ms: u64,
    /// Number of runner-up chains attached to each plan, at most
    /// [`MAX_ALTERNATIVES`].
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    /// Capacity of the lifecycle event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

fn default_disclosure_threshold() -> f64 {
    100.0
}
fn default_execute_timeout_ms() -> u64 {
    120_000
}
fn default_max_alternatives() -> usize {
    2
}
fn default_event_capacity() -> usize {
    256
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            disclosure_threshold: default_disclosure_threshold(),
            execute_timeout_ms: default_execute_timeout_ms(),
            max_alternatives: default_max_alternatives(),
            event_channel_capacity: default_event_capacity(),
        }
    }
}

impl EnginePolicy {
    /// The execution deadline, if one is configured.
    pub fn execute_timeout(&self) -> Option<Duration> {
        (self.execute_timeout_ms > 0).then(|| Duration::from_millis(self.execute_timeout_ms))
    }

    /// Runner-up chains to keep, clamped to [`MAX_ALTERNATIVES`].
    pub fn alternatives_limit(&self) -> usize {
        self.max_alternatives.min(MAX_ALTERNATIVES)
    }
}
