//! Reconciliation Driver Subsystem
//!
//! Turns lifecycle signals from the host runtime into calls on the quorum,
//! encryption and credential coordinators, restarts of the local workload,
//! and an externally visible status.
//!
//! Single-threaded: one signal is handled to completion before the next.
//! Waiting is expressed as a deferred report, never as a blocked call.

mod errors;
mod event;
mod readiness;
mod reconciler;
mod status;
mod workload;

pub use errors::{DriverError, DriverResult, WorkloadError};
pub use event::LifecycleEvent;
pub use readiness::{upgrade_readiness, Readiness};
pub use reconciler::{ReconcileReport, ReconciliationDriver};
pub use status::{Status, StatusContext, StatusLevel};
pub use workload::{ServerConfig, Workload};
