use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Normalized object-created notification, built at the ingress boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntakeEvent {
    pub source_bucket: String,
    pub object_key: String,
    pub event_id: String,
    pub received_at: DateTime<Utc>,
}

/// Fully-qualified input/output locations for one processing job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingLocation {
    pub input_uri: String,
    pub output_uri: String,
}

/// A profile name resolved to a durable service-side handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileReference {
    pub name: String,
    pub resolved_handle: String,
}

/// Lifecycle of a dispatch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Pending,
    Submitted,
    Failed,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Pending => "pending",
            DispatchStatus::Submitted => "submitted",
            DispatchStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DispatchStatus::Pending),
            "submitted" => Some(DispatchStatus::Submitted),
            "failed" => Some(DispatchStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per logical event id, owned by the idempotency guard.
///
/// `created_at` is the moment the current admission was granted — the basis
/// for both the pending lease and the retention window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchRecord {
    pub event_id: String,
    pub status: DispatchStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub job_handle: Option<String>,
    pub failure_reason: Option<String>,
}

/// Terminal result of one dispatch attempt.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Job accepted by the automation service.
    Submitted { job_handle: String },
    /// Duplicate delivery; an earlier admission already handled this event.
    Skipped,
    /// Attempt failed; the error says whether redelivery can help.
    Failed(DispatchError),
}
