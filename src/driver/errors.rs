//! Driver errors
//!
//! Expected control-flow conditions never surface here; they become deferred
//! reports. Only unreadable peer data is returned as an error.

use thiserror::Error;

use crate::credentials::RotationError;
use crate::encryption::EncryptionError;
use crate::state::StateError;

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Clone, Error)]
pub enum DriverError {
    #[error("peer data: {0}")]
    State(#[from] StateError),

    #[error("encryption: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("credentials: {0}")]
    Credentials(#[from] RotationError),
}

/// Failure reported by the workload supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("workload: {0}")]
pub struct WorkloadError(pub String);
