//! Core dispatch pipeline: route, dedupe, resolve, submit.
//!
//! Each object-created notification runs through a static prefix router, a
//! first-writer-wins idempotency guard, a pure location derivation, profile
//! resolution against the automation catalog, and finally one asynchronous
//! job submission. The guard's record store and the automation service are
//! injected trait objects, so deployments choose their backends at startup.

pub mod dispatcher;
pub mod guard;
pub mod locations;
pub mod profiles;
pub mod router;
pub mod store;

pub use dispatcher::Dispatcher;
pub use guard::{Admission, DispatchStore};
pub use locations::RouteTable;
pub use profiles::ProfileResolver;
pub use router::{ObjectCreatedNotification, RouteDecision, Router};
pub use store::{MemoryDispatchStore, PostgresDispatchStore};
