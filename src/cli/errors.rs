//! CLI-specific error types
//!
//! Every CLI error ends the process with exit code 1.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::credentials::RotationError;
use crate::driver::DriverError;
use crate::encryption::EncryptionError;
use crate::state::StateError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Snapshot file already exists
    AlreadyInitialized,
    /// Snapshot file missing
    NotInitialized,
    /// Peer document could not be interpreted
    InvalidState,
    /// Bad argument value
    InvalidArgument,
    /// Rotation request refused
    RotationRejected,
    /// Ensemble not settled enough for an upgrade
    ClusterNotReady,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ZK_CLI_CONFIG_ERROR",
            Self::IoError => "ZK_CLI_IO_ERROR",
            Self::AlreadyInitialized => "ZK_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "ZK_CLI_NOT_INITIALIZED",
            Self::InvalidState => "ZK_CLI_INVALID_STATE",
            Self::InvalidArgument => "ZK_CLI_INVALID_ARGUMENT",
            Self::RotationRejected => "ZK_CLI_ROTATION_REJECTED",
            Self::ClusterNotReady => "ZK_CLI_CLUSTER_NOT_READY",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "State snapshot already exists",
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "State snapshot not found. Run 'zookeeper-operator init' first.",
        )
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(CliErrorCode::ConfigError, e.to_string())
    }
}

impl From<StateError> for CliError {
    fn from(e: StateError) -> Self {
        Self::new(CliErrorCode::InvalidState, e.to_string())
    }
}

impl From<EncryptionError> for CliError {
    fn from(e: EncryptionError) -> Self {
        Self::new(CliErrorCode::InvalidState, e.message)
    }
}

impl From<DriverError> for CliError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Credentials(inner) => inner.into(),
            other => Self::new(CliErrorCode::InvalidState, other.to_string()),
        }
    }
}

impl From<RotationError> for CliError {
    fn from(e: RotationError) -> Self {
        match e {
            RotationError::State(inner) => inner.into(),
            other => Self::new(
                CliErrorCode::RotationRejected,
                format!("{} ({})", other, other.code()),
            ),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
