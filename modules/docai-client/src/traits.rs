use async_trait::async_trait;

use crate::error::AutomationResult;
use crate::types::{JobRequest, ProfileEntry};

/// Client-side seam for the managed document-automation service.
#[async_trait]
pub trait AutomationService: Send + Sync {
    /// Look up a processing profile by exact name in the service catalog.
    async fn find_profile(&self, name: &str) -> AutomationResult<ProfileEntry>;

    /// Submit one asynchronous processing job. Returns the accepted job id;
    /// the job itself runs out-of-band and is never awaited here.
    async fn submit_job(&self, request: &JobRequest) -> AutomationResult<String>;
}
