//! Quorum Error Types
//!
//! Every quorum condition is expected control flow. The caller defers the
//! triggering signal and re-evaluates on the next one; nothing here is fatal.

use std::fmt;

use crate::state::UnitId;

/// Quorum error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumError {
    /// Error kind
    pub kind: QuorumErrorKind,
    /// Error message
    pub message: String,
}

/// Quorum error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumErrorKind {
    /// A lower unit has not joined the quorum yet
    NotThisUnitsTurn,

    /// The unit has not registered in the peer document
    UnitNotFound,

    /// System passwords have not been seeded by the leader
    NoCredentialsYet,
}

impl QuorumError {
    /// Create a new quorum error.
    pub fn new(kind: QuorumErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_this_units_turn(unit: UnitId, reason: impl fmt::Display) -> Self {
        Self::new(
            QuorumErrorKind::NotThisUnitsTurn,
            format!("unit {} may not start yet: {}", unit, reason),
        )
    }

    pub fn unit_not_found(unit: UnitId) -> Self {
        Self::new(
            QuorumErrorKind::UnitNotFound,
            format!("unit {} has not registered a host", unit),
        )
    }

    pub fn no_credentials_yet() -> Self {
        Self::new(
            QuorumErrorKind::NoCredentialsYet,
            "system passwords have not been created",
        )
    }

    /// All quorum conditions clear on a later signal.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            QuorumErrorKind::NotThisUnitsTurn
            | QuorumErrorKind::UnitNotFound
            | QuorumErrorKind::NoCredentialsYet => true,
        }
    }
}

impl fmt::Display for QuorumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuorumError({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for QuorumError {}

/// Result type for quorum operations
pub type QuorumResult<T> = Result<T, QuorumError>;
