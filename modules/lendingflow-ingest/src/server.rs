//! HTTP ingress: notification intake and health.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;

use lendingflow_common::DispatchOutcome;
use lendingflow_dispatch::{Dispatcher, ObjectCreatedNotification, RouteDecision, Router};

pub struct AppState {
    pub router: Router,
    pub dispatcher: Dispatcher,
}

pub fn app(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/v1/notifications", post(api_notifications))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// POST /v1/notifications — one object-created notification in, one dispatch
/// outcome out. Status codes are chosen for an at-least-once upstream:
/// transient failures return 5xx so delivery is retried, permanent ones
/// return 4xx so it is not.
async fn api_notifications(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let notification: ObjectCreatedNotification = match serde_json::from_value(body) {
        Ok(n) => n,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "malformed notification",
                    "message": error.to_string(),
                })),
            )
                .into_response();
        }
    };

    let event = match state.router.route(&notification) {
        RouteDecision::Accepted(event) => event,
        RouteDecision::Ignored { reason } => {
            return (
                StatusCode::OK,
                Json(json!({"outcome": "ignored", "reason": reason})),
            )
                .into_response();
        }
        RouteDecision::Rejected { reason } => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "malformed notification", "message": reason})),
            )
                .into_response();
        }
    };

    match state.dispatcher.dispatch(event).await {
        DispatchOutcome::Submitted { job_handle } => (
            StatusCode::ACCEPTED,
            Json(json!({"outcome": "submitted", "job_handle": job_handle})),
        )
            .into_response(),
        DispatchOutcome::Skipped => {
            (StatusCode::OK, Json(json!({"outcome": "skipped"}))).into_response()
        }
        DispatchOutcome::Failed(error) => {
            let status = if error.is_transient() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (
                status,
                Json(json!({"outcome": "failed", "error": error.to_string()})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use docai_client::{
        AutomationError, AutomationResult, AutomationService, JobRequest, ProfileEntry,
    };
    use lendingflow_dispatch::{MemoryDispatchStore, ProfileResolver, RouteTable};

    use super::*;

    struct FakeAutomation {
        profiles: Vec<ProfileEntry>,
        submit_failures: Mutex<VecDeque<AutomationError>>,
    }

    #[async_trait]
    impl AutomationService for FakeAutomation {
        async fn find_profile(&self, name: &str) -> AutomationResult<ProfileEntry> {
            self.profiles
                .iter()
                .find(|p| p.name == name)
                .cloned()
                .ok_or_else(|| AutomationError::ProfileNotFound {
                    name: name.to_string(),
                })
        }

        async fn submit_job(&self, _request: &JobRequest) -> AutomationResult<String> {
            if let Some(error) = self.submit_failures.lock().await.pop_front() {
                return Err(error);
            }
            Ok("job-1".to_string())
        }
    }

    async fn test_app(
        route_profiles: &[(&str, &str)],
        submit_failures: Vec<AutomationError>,
    ) -> axum::Router {
        let service = Arc::new(FakeAutomation {
            profiles: vec![ProfileEntry {
                name: "lending-default".to_string(),
                handle: "arn:profile/1".to_string(),
            }],
            submit_failures: Mutex::new(submit_failures.into()),
        });
        let table = RouteTable::new(
            vec!["documents".to_string()],
            HashMap::from([("documents".to_string(), "documents-output".to_string())]),
            route_profiles
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
        .unwrap();
        let resolver = ProfileResolver::new(
            service.clone(),
            Some("lending-default"),
            Duration::from_secs(600),
        )
        .await
        .unwrap();
        let store = Arc::new(MemoryDispatchStore::new(
            Duration::from_secs(120),
            Duration::from_secs(24 * 3600),
        ));
        let dispatcher = Dispatcher::new(table.clone(), resolver, service, store, 3);
        let router = Router::new(table, None);
        app(Arc::new(AppState { router, dispatcher }))
    }

    fn notification_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/notifications")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn object_created(id: &str, key: &str) -> serde_json::Value {
        json!({
            "id": id,
            "detail-type": "Object Created",
            "detail": {
                "bucket": { "name": "lending" },
                "object": { "key": key }
            }
        })
    }

    #[tokio::test]
    async fn malformed_notifications_never_reach_dispatch() {
        let app = test_app(&[], vec![]).await;
        let response = app
            .oneshot(notification_request(json!({"id": "evt-1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_required_fields_are_rejected() {
        let app = test_app(&[], vec![]).await;
        let response = app
            .oneshot(notification_request(object_created("evt-1", "   ")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_matching_prefixes_are_acknowledged_and_ignored() {
        let app = test_app(&[], vec![]).await;
        let response = app
            .oneshot(notification_request(object_created(
                "evt-1",
                "uploads/loan.pdf",
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submission_returns_accepted_and_duplicates_return_ok() {
        let app = test_app(&[], vec![]).await;

        let first = app
            .clone()
            .oneshot(notification_request(object_created(
                "evt-1",
                "documents/loan.pdf",
            )))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app
            .oneshot(notification_request(object_created(
                "evt-1",
                "documents/loan.pdf",
            )))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn permanent_failures_map_to_unprocessable() {
        let app = test_app(&[("documents", "missing-profile")], vec![]).await;
        let response = app
            .oneshot(notification_request(object_created(
                "evt-1",
                "documents/loan.pdf",
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn exhausted_transient_failures_map_to_service_unavailable() {
        let app = test_app(
            &[],
            vec![
                AutomationError::Throttled,
                AutomationError::Throttled,
                AutomationError::Throttled,
            ],
        )
        .await;
        let response = app
            .oneshot(notification_request(object_created(
                "evt-1",
                "documents/loan.pdf",
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = test_app(&[], vec![]).await;
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
