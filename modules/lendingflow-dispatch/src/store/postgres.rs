//! Postgres-backed dispatch records for multi-instance deployments.
//!
//! Every admission race resolves inside a single conditional statement, so
//! instances never need an external lock.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use lendingflow_common::{DispatchRecord, DispatchStatus};

use crate::guard::{Admission, DispatchStore};

pub struct PostgresDispatchStore {
    pool: PgPool,
    pending_lease: Duration,
    retention: Duration,
}

impl PostgresDispatchStore {
    pub fn new(pool: PgPool, pending_lease: Duration, retention: Duration) -> Self {
        Self {
            pool,
            pending_lease,
            retention,
        }
    }

    /// Create the records table if it does not exist. Safe to run on every
    /// startup.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dispatch_records (
                event_id       TEXT         PRIMARY KEY,
                status         TEXT         NOT NULL,
                created_at     TIMESTAMPTZ  NOT NULL DEFAULT now(),
                submitted_at   TIMESTAMPTZ,
                job_handle     TEXT,
                failure_reason TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// `now` minus `window`, clamped instead of panicking on absurd configs.
fn cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait]
impl DispatchStore for PostgresDispatchStore {
    async fn admit(&self, event_id: &str) -> anyhow::Result<Admission> {
        let now = Utc::now();
        // Insert wins the race outright; the conditional update reclaims
        // failed, lease-expired pending, and retention-expired records. A
        // row comes back only when this caller took ownership.
        let row = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO dispatch_records (event_id, status, created_at)
            VALUES ($1, 'pending', $2)
            ON CONFLICT (event_id) DO UPDATE
            SET status = 'pending',
                created_at = EXCLUDED.created_at,
                submitted_at = NULL,
                job_handle = NULL,
                failure_reason = NULL
            WHERE dispatch_records.status = 'failed'
               OR (dispatch_records.status = 'pending' AND dispatch_records.created_at < $3)
               OR dispatch_records.created_at < $4
            RETURNING event_id
            "#,
        )
        .bind(event_id)
        .bind(now)
        .bind(cutoff(now, self.pending_lease))
        .bind(cutoff(now, self.retention))
        .fetch_optional(&self.pool)
        .await?;

        Ok(if row.is_some() {
            Admission::Admitted
        } else {
            Admission::AlreadyHandled
        })
    }

    async fn mark_submitted(&self, event_id: &str, job_handle: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_records
            SET status = 'submitted', submitted_at = now(), job_handle = $2, failure_reason = NULL
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(job_handle)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, reason: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_records
            SET status = 'failed', failure_reason = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, event_id: &str) -> anyhow::Result<Option<DispatchRecord>> {
        type Row = (
            String,
            String,
            DateTime<Utc>,
            Option<DateTime<Utc>>,
            Option<String>,
            Option<String>,
        );
        let row = sqlx::query_as::<_, Row>(
            r#"
            SELECT event_id, status, created_at, submitted_at, job_handle, failure_reason
            FROM dispatch_records
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(event_id, status, created_at, submitted_at, job_handle, failure_reason)| {
            let status = DispatchStatus::parse(&status)
                .ok_or_else(|| anyhow::anyhow!("unknown dispatch status '{status}'"))?;
            Ok(DispatchRecord {
                event_id,
                status,
                created_at,
                submitted_at,
                job_handle,
                failure_reason,
            })
        })
        .transpose()
    }

    async fn evict_expired(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM dispatch_records WHERE created_at < $1")
            .bind(cutoff(Utc::now(), self.retention))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
