//! Typed errors for routing and dispatch operations.

use thiserror::Error;

/// Errors that can occur while routing a notification and dispatching its
/// processing job.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Object key does not start with any configured input prefix
    #[error("unroutable key: {key}")]
    UnroutableKey { key: String },

    /// Observed input prefix has no configured output counterpart
    #[error("no output mapping for input prefix: {prefix}")]
    UnmappedPrefix { prefix: String },

    /// Profile name is not in the automation service catalog
    #[error("processing profile not found: {name}")]
    ProfileNotFound { name: String },

    /// Catalog lookups kept failing transiently until the retry budget ran out
    #[error("profile resolution timed out for: {name}")]
    ProfileResolutionTimeout { name: String },

    /// Automation service throttled the submission
    #[error("dispatch throttled by the automation service")]
    DispatchThrottled,

    /// Automation service was unreachable or failing when the retry budget
    /// ran out
    #[error("automation service unavailable: {message}")]
    DispatchUnavailable { message: String },

    /// Automation service rejected the request outright
    #[error("automation service rejected the request: {message}")]
    DispatchRejected { message: String },

    /// The event named no profile and no default profile is configured
    #[error("no default processing profile configured")]
    MissingProfileConfig,

    /// Dispatch record store failure
    #[error("dispatch store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl DispatchError {
    /// Transient failures may succeed on redelivery; everything else is a
    /// caller or configuration bug until the configuration changes.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DispatchError::ProfileResolutionTimeout { .. }
                | DispatchError::DispatchThrottled
                | DispatchError::DispatchUnavailable { .. }
                | DispatchError::Store(_)
        )
    }
}

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
