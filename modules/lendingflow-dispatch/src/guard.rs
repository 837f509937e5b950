//! Dispatch idempotency guard: at-least-once delivery in, at-most-once
//! effective submission out.

use async_trait::async_trait;

use lendingflow_common::DispatchRecord;

/// Outcome of asking the guard to admit an event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting (or a failed/abandoned/expired record): the caller
    /// owns the dispatch attempt.
    Admitted,
    /// A live record already covers this event id.
    AlreadyHandled,
}

/// Shared store of dispatch records, keyed by event id.
///
/// `admit` is first-writer-wins: among concurrent calls for one event id
/// exactly one sees `Admitted`, however many instances share the store. The
/// record written at admission stays `Pending` until the attempt is
/// finalized, so an attempt cancelled mid-flight (shutdown, dropped future)
/// leaves `Pending` and becomes re-admittable once the pending lease lapses.
/// A `Failed` record always re-admits; `Submitted` is terminal until the
/// retention window evicts it.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    async fn admit(&self, event_id: &str) -> anyhow::Result<Admission>;

    /// Finalize the record after the downstream service accepted the job.
    async fn mark_submitted(&self, event_id: &str, job_handle: &str) -> anyhow::Result<()>;

    /// Finalize the record after a permanent failure. The record re-admits
    /// on the next delivery of the same event id.
    async fn mark_failed(&self, event_id: &str, reason: &str) -> anyhow::Result<()>;

    /// Current record, if any. For tests and operational inspection.
    async fn get(&self, event_id: &str) -> anyhow::Result<Option<DispatchRecord>>;

    /// Drop records older than the retention window. Returns how many went.
    async fn evict_expired(&self) -> anyhow::Result<u64>;
}
