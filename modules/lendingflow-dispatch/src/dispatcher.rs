//! Orchestrates one dispatch attempt per admitted event.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use docai_client::{AutomationError, AutomationService, JobRequest};
use lendingflow_common::{DispatchError, DispatchOutcome, DispatchResult, IntakeEvent};

use crate::guard::{Admission, DispatchStore};
use crate::locations::RouteTable;
use crate::profiles::ProfileResolver;

/// Base backoff between submission attempts. Actual delay is
/// base * 2^attempt + jitter.
const SUBMIT_RETRY_BASE: Duration = Duration::from_millis(500);

pub struct Dispatcher {
    table: RouteTable,
    resolver: ProfileResolver,
    service: Arc<dyn AutomationService>,
    store: Arc<dyn DispatchStore>,
    max_attempts: u32,
}

impl Dispatcher {
    pub fn new(
        table: RouteTable,
        resolver: ProfileResolver,
        service: Arc<dyn AutomationService>,
        store: Arc<dyn DispatchStore>,
        max_attempts: u32,
    ) -> Self {
        Self {
            table,
            resolver,
            service,
            store,
            max_attempts,
        }
    }

    /// Run the admission -> derive -> resolve -> submit sequence for one
    /// event. Every path lands on exactly one of `Submitted | Skipped |
    /// Failed`, and at most one downstream job is submitted per admitted
    /// event id. If the caller drops this future before submission is
    /// accepted, the record stays `Pending` and re-admits after the lease.
    pub async fn dispatch(&self, event: IntakeEvent) -> DispatchOutcome {
        match self.store.admit(&event.event_id).await {
            Ok(Admission::Admitted) => {}
            Ok(Admission::AlreadyHandled) => {
                info!(event_id = %event.event_id, "Duplicate delivery, skipping");
                return DispatchOutcome::Skipped;
            }
            Err(e) => return DispatchOutcome::Failed(DispatchError::Store(e)),
        }

        match self.attempt(&event).await {
            Ok(job_handle) => {
                // The job is already accepted downstream; a failed record
                // update must not turn an accepted submission into an error.
                if let Err(e) = self.store.mark_submitted(&event.event_id, &job_handle).await {
                    warn!(
                        event_id = %event.event_id,
                        error = %e,
                        "Failed to finalize dispatch record"
                    );
                }
                info!(
                    event_id = %event.event_id,
                    job_handle = %job_handle,
                    key = %event.object_key,
                    "Processing job submitted"
                );
                DispatchOutcome::Submitted { job_handle }
            }
            Err(error) => {
                if let Err(e) = self
                    .store
                    .mark_failed(&event.event_id, &error.to_string())
                    .await
                {
                    warn!(
                        event_id = %event.event_id,
                        error = %e,
                        "Failed to record dispatch failure"
                    );
                }
                warn!(
                    event_id = %event.event_id,
                    key = %event.object_key,
                    error = %error,
                    "Dispatch failed"
                );
                DispatchOutcome::Failed(error)
            }
        }
    }

    async fn attempt(&self, event: &IntakeEvent) -> DispatchResult<String> {
        let location = self.table.derive(&event.source_bucket, &event.object_key)?;
        let profile_name = self
            .table
            .match_prefix(&event.object_key)
            .and_then(|prefix| self.table.profile_for(prefix));
        let profile = self.resolver.resolve(profile_name).await?;

        let request = JobRequest {
            input_uri: location.input_uri,
            output_uri: location.output_uri,
            profile_handle: profile.resolved_handle,
            notify_on_completion: true,
        };
        self.submit_with_retry(&request).await
    }

    async fn submit_with_retry(&self, request: &JobRequest) -> DispatchResult<String> {
        let mut attempt = 0;
        loop {
            match self.service.submit_job(request).await {
                Ok(job_handle) => return Ok(job_handle),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    warn!(attempt = attempt + 1, error = %e, "Submission failed, retrying");
                    let backoff = SUBMIT_RETRY_BASE * 2u32.pow(attempt);
                    let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                    tokio::time::sleep(backoff + jitter).await;
                    attempt += 1;
                }
                Err(e) => return Err(classify_submit_error(e)),
            }
        }
    }
}

/// Map a client-side failure to the dispatch taxonomy once the retry budget
/// is spent (or immediately, for permanent rejections).
fn classify_submit_error(error: AutomationError) -> DispatchError {
    match error {
        AutomationError::Throttled => DispatchError::DispatchThrottled,
        AutomationError::Timeout
        | AutomationError::Unavailable { .. }
        | AutomationError::Http(_) => DispatchError::DispatchUnavailable {
            message: error.to_string(),
        },
        other => DispatchError::DispatchRejected {
            message: other.to_string(),
        },
    }
}
