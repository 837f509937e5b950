pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{DispatchError, DispatchResult};
pub use types::{
    DispatchOutcome, DispatchRecord, DispatchStatus, IntakeEvent, ProcessingLocation,
    ProfileReference,
};
