//! Chainroute Settlement: the payment lifecycle side of the routing engine.
//!
//! Provides the collaborator interfaces (mixer, chain executor, durability),
//! the payment store, lifecycle events, and [`RoutingEngine`], which routes
//! payments, drives them to settlement, batches them and reports stats.

pub mod adapters;
pub mod batch;
pub mod engine;
pub mod error;
pub mod events;
pub mod stats;
pub mod store;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchItem, BatchRouteSummary};
pub use engine::{EngineBuilder, PaymentLookup, RoutingEngine};
pub use error::{BackendError, EngineError, PersistenceError};
pub use events::{EventBus, LifecycleEvent};
pub use stats::{ChainStats, EngineStats};
pub use store::{ExecutionLock, InMemoryPaymentStore, PaymentStore};
pub use traits::{ChainExecutor, Durability, MixOutcome, MixRequest, Mixer};
