//! Shared state errors

use thiserror::Error;

/// Result type for shared state reads
pub type StateResult<T> = Result<T, StateError>;

/// A value in the peer document could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("malformed value for '{key}': '{value}'")]
    Malformed { key: String, value: String },

    #[error("invalid unit name: '{0}'")]
    InvalidUnitName(String),
}

impl StateError {
    pub fn malformed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            value: value.into(),
        }
    }
}
