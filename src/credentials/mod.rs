//! # Credentials
//!
//! System user passwords and their cluster-wide rotation.
//!
//! ## Invariants
//! - Only the leader writes passwords
//! - One rotation in flight at a time
//! - A password equal to any active password is never published

mod coordinator;
mod errors;
mod password;

pub use coordinator::{
    CredentialCoordinator, CredentialState, NewPassword, RotationDelta, RotationGrant,
    RotationSelfView, RotationStep,
};
pub use errors::{RotationError, RotationResult};
pub use password::{constant_time_str_eq, generate_password, is_system_user, SYSTEM_USERS};
