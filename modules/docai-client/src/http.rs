use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AutomationError, AutomationResult};
use crate::traits::AutomationService;
use crate::types::{JobRequest, ProfileEntry};

/// HTTP client for the automation service.
pub struct HttpAutomationClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    lookup_timeout: Duration,
    submit_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ProfileListResponse {
    profiles: Vec<ProfileEntry>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

impl HttpAutomationClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            lookup_timeout: Duration::from_secs(5),
            submit_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeouts(mut self, lookup: Duration, submit: Duration) -> Self {
        self.lookup_timeout = lookup;
        self.submit_timeout = submit;
        self
    }

    async fn read_failure(response: reqwest::Response) -> AutomationError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        classify_status(status, message)
    }
}

fn classify_status(status: u16, message: String) -> AutomationError {
    match status {
        429 => AutomationError::Throttled,
        s if s >= 500 => AutomationError::Unavailable { status: s, message },
        s => AutomationError::Rejected { status: s, message },
    }
}

fn transport_error(e: reqwest::Error) -> AutomationError {
    if e.is_timeout() {
        AutomationError::Timeout
    } else {
        AutomationError::Http(Box::new(e))
    }
}

#[async_trait]
impl AutomationService for HttpAutomationClient {
    async fn find_profile(&self, name: &str) -> AutomationResult<ProfileEntry> {
        let url = format!("{}/v1/profiles", self.base_url);
        debug!(profile = name, "Profile catalog lookup");

        let response = self
            .http
            .get(&url)
            .query(&[("name", name)])
            .bearer_auth(&self.api_key)
            .timeout(self.lookup_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().as_u16() == 404 {
            return Err(AutomationError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let listing: ProfileListResponse = response.json().await.map_err(transport_error)?;
        listing
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AutomationError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    async fn submit_job(&self, request: &JobRequest) -> AutomationResult<String> {
        let url = format!("{}/v1/jobs", self.base_url);
        debug!(
            input = %request.input_uri,
            output = %request.output_uri,
            "Submitting processing job"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.submit_timeout)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let accepted: SubmitResponse = response.json().await.map_err(transport_error)?;
        Ok(accepted.job_id)
    }
}
