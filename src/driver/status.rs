//! Externally visible unit status
//!
//! Recomputed from scratch on every reconciliation. The first matching
//! condition wins.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Active,
    Maintenance,
    Waiting,
    Blocked,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Active => "active",
            StatusLevel::Maintenance => "maintenance",
            StatusLevel::Waiting => "waiting",
            StatusLevel::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub level: StatusLevel,
    pub message: &'static str,
}

impl Status {
    pub const CONTAINER_NOT_REACHABLE: Status = Status::waiting("container not reachable");
    pub const INVALID_CONFIG: Status = Status::blocked("invalid configuration");
    pub const DEPARTING: Status = Status::maintenance("unit departing");
    pub const NO_CREDENTIALS: Status = Status::waiting("waiting for credentials");
    pub const NOT_ALL_REGISTERED: Status = Status::waiting("waiting for all units to register");
    pub const WAITING_FOR_TURN: Status = Status::waiting("waiting for turn to start");
    pub const SERVICE_NOT_RUNNING: Status = Status::blocked("service not running");
    pub const SERVICE_UNHEALTHY: Status = Status::blocked("service unhealthy");
    pub const QUORUM_STALE: Status = Status::maintenance("updating quorum membership");
    pub const SWITCHING_ENCRYPTION: Status = Status::maintenance("switching quorum encryption");
    pub const ROTATING_PASSWORDS: Status = Status::maintenance("rotating passwords");
    pub const ACTIVE: Status = Status {
        level: StatusLevel::Active,
        message: "",
    };

    const fn waiting(message: &'static str) -> Self {
        Self {
            level: StatusLevel::Waiting,
            message,
        }
    }

    const fn maintenance(message: &'static str) -> Self {
        Self {
            level: StatusLevel::Maintenance,
            message,
        }
    }

    const fn blocked(message: &'static str) -> Self {
        Self {
            level: StatusLevel::Blocked,
            message,
        }
    }

    pub fn evaluate(ctx: &StatusContext) -> Self {
        if !ctx.container_reachable {
            Self::CONTAINER_NOT_REACHABLE
        } else if ctx.departing {
            Self::DEPARTING
        } else if !ctx.credentials_ready {
            Self::NO_CREDENTIALS
        } else if !ctx.all_registered {
            Self::NOT_ALL_REGISTERED
        } else if !ctx.started {
            Self::WAITING_FOR_TURN
        } else if !ctx.alive {
            Self::SERVICE_NOT_RUNNING
        } else if !ctx.healthy {
            Self::SERVICE_UNHEALTHY
        } else if ctx.quorum_stale {
            Self::QUORUM_STALE
        } else if ctx.migrating {
            Self::SWITCHING_ENCRYPTION
        } else if ctx.rotating {
            Self::ROTATING_PASSWORDS
        } else {
            Self::ACTIVE
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.level.as_str())
        } else {
            write!(f, "{}: {}", self.level.as_str(), self.message)
        }
    }
}

/// Observations the status is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusContext {
    pub container_reachable: bool,
    pub departing: bool,
    pub credentials_ready: bool,
    pub all_registered: bool,
    pub started: bool,
    pub alive: bool,
    pub healthy: bool,
    pub quorum_stale: bool,
    pub migrating: bool,
    pub rotating: bool,
}
