//! Shared node state for the HTTP handlers.

use chainroute_settlement::RoutingEngine;
use std::sync::Arc;
use std::time::Instant;

use crate::storage::Storage;

/// Shared state for the running node, accessible from HTTP handlers.
pub struct AppState {
    /// The routing engine.
    pub engine: Arc<RoutingEngine>,
    /// Persistent storage, when enabled.
    pub storage: Option<Arc<Storage>>,
    /// When the node started.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<RoutingEngine>, storage: Option<Arc<Storage>>) -> Self {
        Self {
            engine,
            storage,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
