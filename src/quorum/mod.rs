//! Quorum Subsystem
//!
//! Peer membership reconciliation for the ensemble:
//! - Strict, monotonic start order by unit id
//! - Single bootstrap seed
//! - One membership change applied at a time
//!
//! The manager is pure over a `PeerSnapshot`. Writing its delta back is a
//! separate, leader-only step.

mod config;
mod errors;
mod manager;

pub use config::{server_line, QuorumConfig, ServerRole};
pub use errors::{QuorumError, QuorumErrorKind, QuorumResult};
pub use manager::{QuorumDelta, QuorumManager, ReconcileOutcome};
