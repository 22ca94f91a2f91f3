use async_trait::async_trait;
use chainroute_core::{PaymentId, PaymentPlan, PaymentStatus};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::PersistenceError;
use crate::traits::Durability;

/// Sink that discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDurability;

#[async_trait]
impl Durability for NoopDurability {
    async fn record_payment(&self, _plan: &PaymentPlan) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn record_status_change(
        &self,
        _payment_id: &PaymentId,
        _status: PaymentStatus,
        _meta: serde_json::Value,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// One appended status record.
#[derive(Debug, Clone)]
pub struct StatusRecord {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub meta: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// In-memory append-only log. Can be switched into a failing mode to
/// exercise the non-fatal persistence path.
#[derive(Debug, Default)]
pub struct MemoryDurability {
    payments: Mutex<Vec<PaymentPlan>>,
    status_log: Mutex<Vec<StatusRecord>>,
    failing: AtomicBool,
}

impl MemoryDurability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn payments(&self) -> Vec<PaymentPlan> {
        self.payments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status_log(&self) -> Vec<StatusRecord> {
        self.status_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Statuses recorded for one payment, in order.
    pub fn history(&self, payment_id: &PaymentId) -> Vec<PaymentStatus> {
        self.status_log()
            .into_iter()
            .filter(|r| &r.payment_id == payment_id)
            .map(|r| r.status)
            .collect()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError("durability sink offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Durability for MemoryDurability {
    async fn record_payment(&self, plan: &PaymentPlan) -> Result<(), PersistenceError> {
        self.check()?;
        let mut payments = self.payments.lock().unwrap_or_else(PoisonError::into_inner);
        match payments.iter_mut().find(|p| p.payment_id == plan.payment_id) {
            Some(existing) => *existing = plan.clone(),
            None => payments.push(plan.clone()),
        }
        Ok(())
    }

    async fn record_status_change(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        meta: serde_json::Value,
    ) -> Result<(), PersistenceError> {
        self.check()?;
        self.status_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StatusRecord {
                payment_id: *payment_id,
                status,
                meta,
                recorded_at: Utc::now(),
            });
        Ok(())
    }
}
