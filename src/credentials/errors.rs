//! # Credential Errors
//!
//! Rotation requests are rejected before anything is published. Every
//! rejection is reported back to the caller, never silently applied.

use thiserror::Error;

use crate::state::StateError;

/// Result type for credential operations
pub type RotationResult<T> = Result<T, RotationError>;

/// Credential and rotation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    /// Application data is leader-written
    #[error("Only the leader can manage credentials")]
    NotLeader,

    #[error("Unknown system user: {0}")]
    UnknownUser(String),

    /// New password equals a password that is currently active
    #[error("New password for {username} matches an active password")]
    RejectedIdentical { username: String },

    /// One rotation at a time
    #[error("A password rotation is already in progress")]
    AlreadyInProgress,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error(transparent)]
    State(#[from] StateError),
}

impl RotationError {
    /// Stable code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            RotationError::NotLeader => "NOT_LEADER",
            RotationError::UnknownUser(_) => "UNKNOWN_USER",
            RotationError::RejectedIdentical { .. } => "ROTATION_REJECTED_IDENTICAL",
            RotationError::AlreadyInProgress => "ROTATION_ALREADY_IN_PROGRESS",
            RotationError::EmptyPassword => "EMPTY_PASSWORD",
            RotationError::State(_) => "MALFORMED_STATE",
        }
    }

    /// The request may succeed unchanged on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RotationError::NotLeader | RotationError::AlreadyInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RotationError::NotLeader.code(), "NOT_LEADER");
        assert_eq!(
            RotationError::RejectedIdentical {
                username: "super".into()
            }
            .code(),
            "ROTATION_REJECTED_IDENTICAL"
        );
    }

    #[test]
    fn test_rejection_does_not_leak_password() {
        let err = RotationError::RejectedIdentical {
            username: "super".into(),
        };
        assert_eq!(err.to_string(), "New password for super matches an active password");
    }

    #[test]
    fn test_retryable() {
        assert!(RotationError::AlreadyInProgress.is_retryable());
        assert!(!RotationError::UnknownUser("admin".into()).is_retryable());
    }
}
