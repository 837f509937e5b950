//! Typed errors for automation service calls.

use thiserror::Error;

/// Errors returned by the document-automation service client.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Named profile is not in the service catalog
    #[error("profile not found: {name}")]
    ProfileNotFound { name: String },

    /// Service throttled the request
    #[error("throttled by the automation service")]
    Throttled,

    /// Request hit its deadline
    #[error("automation service timed out")]
    Timeout,

    /// Service-side failure (5xx)
    #[error("automation service unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    /// Request rejected outright (4xx other than throttling)
    #[error("automation service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AutomationError {
    /// Whether a retry with backoff can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AutomationError::Throttled
                | AutomationError::Timeout
                | AutomationError::Unavailable { .. }
                | AutomationError::Http(_)
        )
    }
}

/// Result type alias for automation service calls.
pub type AutomationResult<T> = std::result::Result<T, AutomationError>;
