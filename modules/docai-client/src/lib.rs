//! Client for the managed document-automation service.
//!
//! The service is consumed through the [`AutomationService`] trait so the
//! dispatcher can swap the HTTP implementation for a fake in tests.

pub mod error;
pub mod http;
pub mod traits;
pub mod types;

pub use error::{AutomationError, AutomationResult};
pub use http::HttpAutomationClient;
pub use traits::AutomationService;
pub use types::{JobRequest, ProfileEntry};
