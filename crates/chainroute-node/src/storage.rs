//! RocksDB storage backend for the routing node.
//!
//! Plans are kept in `payments` keyed by payment id. Status changes are
//! appended to `status_log` keyed by `<payment id>/<sequence>` so one prefix
//! scan returns a payment's history in order.

use anyhow::Result;
use async_trait::async_trait;
use chainroute_core::{PaymentId, PaymentPlan, PaymentStatus};
use chainroute_settlement::{Durability, PersistenceError};
use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column family names for different data types.
const CF_PAYMENTS: &str = "payments";
const CF_STATUS_LOG: &str = "status_log";

/// One entry of the status log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub meta: serde_json::Value,
    pub recorded_at_ms: i64,
}

/// RocksDB-backed storage for the routing node.
pub struct Storage {
    db: DB,
    sequence: AtomicU64,
}

impl Storage {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_STATUS_LOG, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        // Continue the sequence past anything already logged.
        let sequence = AtomicU64::new(Self::max_sequence(&db)? + 1);
        Ok(Self { db, sequence })
    }

    fn max_sequence(db: &DB) -> Result<u64> {
        let cf = db
            .cf_handle(CF_STATUS_LOG)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", CF_STATUS_LOG))?;
        let mut max = 0;
        for item in db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item?;
            if let Some(seq) = key.rsplit(|b| *b == b'/').next().and_then(parse_sequence) {
                max = max.max(seq);
            }
        }
        Ok(max)
    }

    /// Put a value into a column family.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    /// Get a value from a column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        let value = self.db.get_cf(&cf, key)?;
        Ok(value)
    }

    /// Store the latest snapshot of a plan.
    pub fn put_payment(&self, plan: &PaymentPlan) -> Result<()> {
        let data = serde_json::to_vec(plan)?;
        self.put(CF_PAYMENTS, plan.payment_id.to_string().as_bytes(), &data)
    }

    pub fn get_payment(&self, id: &PaymentId) -> Result<Option<PaymentPlan>> {
        match self.get(CF_PAYMENTS, id.to_string().as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Every stored plan.
    pub fn list_payments(&self) -> Result<Vec<PaymentPlan>> {
        let cf = self
            .db
            .cf_handle(CF_PAYMENTS)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", CF_PAYMENTS))?;
        let mut plans = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            plans.push(serde_json::from_slice(&value)?);
        }
        Ok(plans)
    }

    /// Append a status change to the log.
    pub fn append_status(&self, entry: &StatusEntry) -> Result<()> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}/{:020}", entry.payment_id, seq);
        let data = serde_json::to_vec(entry)?;
        self.put(CF_STATUS_LOG, key.as_bytes(), &data)
    }

    /// Status changes of one payment, oldest first.
    pub fn status_history(&self, id: &PaymentId) -> Result<Vec<StatusEntry>> {
        let cf = self
            .db
            .cf_handle(CF_STATUS_LOG)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", CF_STATUS_LOG))?;
        let prefix = format!("{}/", id);
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }
}

fn parse_sequence(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

#[async_trait]
impl Durability for Storage {
    async fn record_payment(&self, plan: &PaymentPlan) -> Result<(), PersistenceError> {
        self.put_payment(plan)
            .map_err(|e| PersistenceError(e.to_string()))
    }

    async fn record_status_change(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        meta: serde_json::Value,
    ) -> Result<(), PersistenceError> {
        let entry = StatusEntry {
            payment_id: *payment_id,
            status,
            meta,
            recorded_at_ms: Utc::now().timestamp_millis(),
        };
        self.append_status(&entry)
            .map_err(|e| PersistenceError(e.to_string()))
    }
}
