use serde::{Deserialize, Serialize};

/// Parameters for one asynchronous processing job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRequest {
    pub input_uri: String,
    pub output_uri: String,
    pub profile_handle: String,
    pub notify_on_completion: bool,
}

/// Catalog entry for a processing profile. `handle` is the durable
/// service-side identifier submissions must reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntry {
    pub name: String,
    pub handle: String,
}
