//! Chainroute Routing: backend selection for the settlement routing engine.
//!
//! This crate provides:
//! - [`ChainRegistry`]: copy-on-write registry of chain capability profiles.
//! - [`RateTable`] and [`RateSnapshot`]: atomically swapped USD exchange rates.
//! - [`FeeCalculator`]: congestion-aware fee estimates per chain.
//! - [`scoring`]: the four-criterion (amount, privacy, speed, cost) score.
//! - [`Router`]: ranks enabled chains for a request and offers a quick
//!   recommendation heuristic.

pub mod error;
pub mod fees;
pub mod rates;
pub mod registry;
pub mod scoring;
pub mod selector;

// Re-exports for convenience.
pub use error::RoutingError;
pub use fees::{CongestionFeed, FeeCalculator, StaticCongestion};
pub use rates::{
    convert, default_rates, default_rates_with, ExchangeRateFeed, RateSnapshot, RateTable,
    StaticRateFeed,
};
pub use registry::{default_profiles, ChainRegistry};
pub use scoring::ScoredCandidate;
pub use selector::Router;
