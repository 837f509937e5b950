//! Ingress-side routing: notification wire shape, prefix filtering, and
//! `IntakeEvent` construction.

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use lendingflow_common::IntakeEvent;

use crate::locations::RouteTable;

/// EventBridge-shaped object-created notification.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectCreatedNotification {
    pub id: String,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    pub detail: NotificationDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationDetail {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

/// What the router decided about one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Valid and matching: dispatch it.
    Accepted(IntakeEvent),
    /// Structurally valid but not for this dispatcher (foreign bucket,
    /// unmatched prefix, non-creation event).
    Ignored { reason: &'static str },
    /// Malformed: required fields missing or empty. Never reaches dispatch.
    Rejected { reason: &'static str },
}

/// Static prefix router in front of the dispatcher. Filtering here is
/// advisory; the location deriver re-validates the prefix.
pub struct Router {
    table: RouteTable,
    target_bucket: Option<String>,
}

impl Router {
    pub fn new(table: RouteTable, target_bucket: Option<String>) -> Self {
        Self {
            table,
            target_bucket,
        }
    }

    pub fn route(&self, notification: &ObjectCreatedNotification) -> RouteDecision {
        let event_id = notification.id.trim();
        let bucket = notification.detail.bucket.name.trim();
        let key = notification.detail.object.key.trim();

        if event_id.is_empty() || bucket.is_empty() || key.is_empty() {
            return RouteDecision::Rejected {
                reason: "id, bucket name and object key are required",
            };
        }

        if let Some(detail_type) = notification.detail_type.as_deref() {
            if detail_type != "Object Created" {
                return RouteDecision::Ignored {
                    reason: "not an object-created notification",
                };
            }
        }

        if let Some(target) = &self.target_bucket {
            if bucket != target {
                debug!(bucket, "Notification for a foreign bucket, ignoring");
                return RouteDecision::Ignored {
                    reason: "bucket is not routed here",
                };
            }
        }

        if self.table.match_prefix(key).is_none() {
            debug!(key, "Key outside configured input prefixes, ignoring");
            return RouteDecision::Ignored {
                reason: "key does not match a configured input prefix",
            };
        }

        RouteDecision::Accepted(IntakeEvent {
            source_bucket: bucket.to_string(),
            object_key: key.to_string(),
            event_id: event_id.to_string(),
            received_at: Utc::now(),
        })
    }
}
