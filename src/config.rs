//! Operator configuration
//!
//! Loaded from a JSON file. Every field is optional and falls back to the
//! ZooKeeper defaults; limits must be strictly positive.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

pub const DEFAULT_CLIENT_PORT: u16 = 2181;
pub const DEFAULT_SECURE_CLIENT_PORT: u16 = 2182;
pub const DEFAULT_SERVER_PORT: u16 = 2888;
pub const DEFAULT_ELECTION_PORT: u16 = 3888;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },

    #[error("{first} and {second} must differ (both {port})")]
    PortClash {
        first: &'static str,
        second: &'static str,
        port: u16,
    },
}

/// `log-level` values accepted by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Lowest severity that is emitted at this level.
    pub fn min_severity(&self) -> Severity {
        match self {
            LogLevel::Debug => Severity::Trace,
            LogLevel::Info => Severity::Info,
            LogLevel::Warning => Severity::Warn,
            LogLevel::Error => Severity::Error,
        }
    }
}

/// Operator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OperatorConfig {
    /// Basic time unit in milliseconds
    #[serde(default = "default_tick_time")]
    pub tick_time: u32,

    /// Ticks a follower may take to connect and sync to the leader
    #[serde(default = "default_init_limit")]
    pub init_limit: u32,

    /// Ticks a follower may fall behind the leader
    #[serde(default = "default_sync_limit")]
    pub sync_limit: u32,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default = "default_client_port")]
    pub client_port: u16,

    #[serde(default = "default_secure_client_port")]
    pub secure_client_port: u16,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_election_port")]
    pub election_port: u16,
}

fn default_tick_time() -> u32 {
    2000
}
fn default_init_limit() -> u32 {
    5
}
fn default_sync_limit() -> u32 {
    2
}
fn default_client_port() -> u16 {
    DEFAULT_CLIENT_PORT
}
fn default_secure_client_port() -> u16 {
    DEFAULT_SECURE_CLIENT_PORT
}
fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}
fn default_election_port() -> u16 {
    DEFAULT_ELECTION_PORT
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            tick_time: default_tick_time(),
            init_limit: default_init_limit(),
            sync_limit: default_sync_limit(),
            log_level: LogLevel::default(),
            client_port: DEFAULT_CLIENT_PORT,
            secure_client_port: DEFAULT_SECURE_CLIENT_PORT,
            server_port: DEFAULT_SERVER_PORT,
            election_port: DEFAULT_ELECTION_PORT,
        }
    }
}

impl OperatorConfig {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: OperatorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("tick-time", self.tick_time),
            ("init-limit", self.init_limit),
            ("sync-limit", self.sync_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field });
            }
        }

        let ports = [
            ("client-port", self.client_port),
            ("secure-client-port", self.secure_client_port),
            ("server-port", self.server_port),
            ("election-port", self.election_port),
        ];
        for (i, &(first, a)) in ports.iter().enumerate() {
            if a == 0 {
                return Err(ConfigError::NotPositive { field: first });
            }
            for &(second, b) in &ports[i + 1..] {
                if a == b {
                    return Err(ConfigError::PortClash {
                        first,
                        second,
                        port: a,
                    });
                }
            }
        }

        Ok(())
    }
}
