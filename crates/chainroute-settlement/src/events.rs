//! Lifecycle notifications.
//!
//! Every routed plan and every status transition is published on a
//! broadcast channel so that observers (audit logs, webhooks, dashboards)
//! can follow payments without polling the store.

use chainroute_core::{ChainId, PaymentId, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the routing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A new plan was created in `Pending`.
    Routed {
        payment_id: PaymentId,
        chain: ChainId,
        needs_mixing: bool,
        at: DateTime<Utc>,
    },
    /// A plan moved between lifecycle states.
    StatusChanged {
        payment_id: PaymentId,
        from: PaymentStatus,
        to: PaymentStatus,
        at: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    pub fn payment_id(&self) -> PaymentId {
        match self {
            Self::Routed { payment_id, .. } | Self::StatusChanged { payment_id, .. } => *payment_id,
        }
    }
}

/// Fan-out of [`LifecycleEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: LifecycleEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("lifecycle event dropped: no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
