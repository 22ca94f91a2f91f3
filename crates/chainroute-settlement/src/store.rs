use std::sync::Arc;

use chainroute_core::{PaymentId, PaymentPlan};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::EngineError;

/// Guard that serializes lifecycle work on one payment.
pub type ExecutionLock = Arc<Mutex<()>>;

/// Repository of tracked payment plans.
///
/// The committed view (`get`/`list`) is always readable without waiting on
/// an execution; writers take the payment's [`ExecutionLock`] first.
pub trait PaymentStore: Send + Sync {
    /// Insert a new plan. Fails if the id is already tracked.
    fn insert(&self, plan: PaymentPlan) -> Result<(), EngineError>;

    /// Overwrite the committed view of an existing plan.
    fn save(&self, plan: &PaymentPlan) -> Result<(), EngineError>;

    fn get(&self, id: &PaymentId) -> Option<PaymentPlan>;

    /// The lock owning lifecycle transitions for `id`.
    fn execution_lock(&self, id: &PaymentId) -> Option<ExecutionLock>;

    /// Snapshot of every tracked plan.
    fn list(&self) -> Vec<PaymentPlan>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Slot {
    plan: PaymentPlan,
    lock: ExecutionLock,
}

/// In-memory [`PaymentStore`] backed by a sharded concurrent map, so work on
/// different payments never contends on a single lock.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    slots: DashMap<PaymentId, Slot>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentStore for InMemoryPaymentStore {
    fn insert(&self, plan: PaymentPlan) -> Result<(), EngineError> {
        match self.slots.entry(plan.payment_id) {
            Entry::Occupied(_) => Err(EngineError::DuplicatePayment(plan.payment_id)),
            Entry::Vacant(v) => {
                v.insert(Slot {
                    plan,
                    lock: Arc::new(Mutex::new(())),
                });
                Ok(())
            }
        }
    }

    fn save(&self, plan: &PaymentPlan) -> Result<(), EngineError> {
        let mut slot = self
            .slots
            .get_mut(&plan.payment_id)
            .ok_or(EngineError::PaymentNotFound(plan.payment_id))?;
        slot.plan = plan.clone();
        Ok(())
    }

    fn get(&self, id: &PaymentId) -> Option<PaymentPlan> {
        self.slots.get(id).map(|s| s.plan.clone())
    }

    fn execution_lock(&self, id: &PaymentId) -> Option<ExecutionLock> {
        self.slots.get(id).map(|s| Arc::clone(&s.lock))
    }

    fn list(&self) -> Vec<PaymentPlan> {
        self.slots.iter().map(|s| s.plan.clone()).collect()
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}
