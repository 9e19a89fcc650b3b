//! Encryption Error Types
//!
//! A stalled unification barrier is not an error. Only an attempted jump
//! between the two final modes, or unreadable peer data, is reported.

use std::fmt;

use crate::state::StateError;

/// Encryption error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionError {
    /// Error kind
    pub kind: EncryptionErrorKind,
    /// Error message
    pub message: String,
}

/// Encryption error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionErrorKind {
    /// NON_SSL ↔ SSL without passing through TRANSITIONAL
    ForbiddenTransition,

    /// Encryption keys in the peer document could not be read
    MalformedState,
}

impl EncryptionError {
    /// Create a new encryption error.
    pub fn new(kind: EncryptionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a forbidden transition error.
    pub fn forbidden_transition(from: &str, to: &str) -> Self {
        Self::new(
            EncryptionErrorKind::ForbiddenTransition,
            format!("forbidden transition: {} → {}", from, to),
        )
    }

    /// Malformed data is re-read on the next signal and may have been
    /// rewritten by its owner by then.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            EncryptionErrorKind::ForbiddenTransition => false,
            EncryptionErrorKind::MalformedState => true,
        }
    }
}

impl From<StateError> for EncryptionError {
    fn from(err: StateError) -> Self {
        Self::new(EncryptionErrorKind::MalformedState, err.to_string())
    }
}

impl fmt::Display for EncryptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionError({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for EncryptionError {}

/// Result type for encryption operations
pub type EncryptionResult<T> = Result<T, EncryptionError>;
