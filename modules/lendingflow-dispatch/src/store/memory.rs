//! In-process dispatch records for single-instance deployments.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use lendingflow_common::{DispatchRecord, DispatchStatus};

use crate::guard::{Admission, DispatchStore};

/// Mutex-protected record map. Admission decisions happen under the lock,
/// which gives the compare-and-set semantics a single process needs.
pub struct MemoryDispatchStore {
    records: Mutex<HashMap<String, DispatchRecord>>,
    pending_lease: Duration,
    retention: Duration,
}

impl MemoryDispatchStore {
    pub fn new(pending_lease: Duration, retention: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            pending_lease,
            retention,
        }
    }

    fn reclaimable(&self, record: &DispatchRecord, now: DateTime<Utc>) -> bool {
        if age(now, record.created_at) >= self.retention {
            return true;
        }
        match record.status {
            DispatchStatus::Failed => true,
            DispatchStatus::Pending => age(now, record.created_at) >= self.pending_lease,
            DispatchStatus::Submitted => false,
        }
    }
}

/// Elapsed time since `created`, clamped to zero for clock skew.
fn age(now: DateTime<Utc>, created: DateTime<Utc>) -> Duration {
    (now - created).to_std().unwrap_or_default()
}

#[async_trait]
impl DispatchStore for MemoryDispatchStore {
    async fn admit(&self, event_id: &str) -> anyhow::Result<Admission> {
        let now = Utc::now();
        let mut records = self.records.lock().await;
        if let Some(existing) = records.get(event_id) {
            if !self.reclaimable(existing, now) {
                return Ok(Admission::AlreadyHandled);
            }
        }
        records.insert(
            event_id.to_string(),
            DispatchRecord {
                event_id: event_id.to_string(),
                status: DispatchStatus::Pending,
                created_at: now,
                submitted_at: None,
                job_handle: None,
                failure_reason: None,
            },
        );
        Ok(Admission::Admitted)
    }

    async fn mark_submitted(&self, event_id: &str, job_handle: &str) -> anyhow::Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(event_id.to_string())
            .or_insert_with(|| DispatchRecord {
                event_id: event_id.to_string(),
                status: DispatchStatus::Pending,
                created_at: Utc::now(),
                submitted_at: None,
                job_handle: None,
                failure_reason: None,
            });
        record.status = DispatchStatus::Submitted;
        record.submitted_at = Some(Utc::now());
        record.job_handle = Some(job_handle.to_string());
        record.failure_reason = None;
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, reason: &str) -> anyhow::Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(event_id.to_string())
            .or_insert_with(|| DispatchRecord {
                event_id: event_id.to_string(),
                status: DispatchStatus::Pending,
                created_at: Utc::now(),
                submitted_at: None,
                job_handle: None,
                failure_reason: None,
            });
        record.status = DispatchStatus::Failed;
        record.failure_reason = Some(reason.to_string());
        Ok(())
    }

    async fn get(&self, event_id: &str) -> anyhow::Result<Option<DispatchRecord>> {
        Ok(self.records.lock().await.get(event_id).cloned())
    }

    async fn evict_expired(&self) -> anyhow::Result<u64> {
        let now = Utc::now();
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| age(now, record.created_at) < self.retention);
        Ok((before - records.len()) as u64)
    }
}
