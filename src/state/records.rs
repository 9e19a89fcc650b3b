//! Server records
//!
//! One `ServerRecord` per registered ensemble member. `state` is written by
//! the unit itself, `membership` only by the leader.

use std::fmt;
use std::str::FromStr;

use super::errors::{StateError, StateResult};
use super::keys;

/// Stable ordinal of a replica, taken from its name (`zookeeper-k8s/2` → 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u32);

impl UnitId {
    /// Parse a replica name of the form `<application>/<ordinal>`.
    pub fn from_unit_name(name: &str) -> StateResult<Self> {
        name.rsplit_once('/')
            .and_then(|(_, ordinal)| ordinal.parse::<u32>().ok())
            .map(UnitId)
            .ok_or_else(|| StateError::InvalidUnitName(name.to_string()))
    }

    /// ZooKeeper server id. Server ids are 1-based.
    pub fn myid(&self) -> u32 {
        self.0 + 1
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the unit's local workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Pending,
    Started,
}

impl ServerState {
    pub fn parse(raw: Option<&str>) -> StateResult<Self> {
        match raw {
            None => Ok(Self::Pending),
            Some(keys::STARTED) => Ok(Self::Started),
            Some(other) => Err(StateError::malformed(keys::STATE, other)),
        }
    }
}

/// Whether the unit is part of the live quorum configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Absent,
    Added,
    Removed,
}

impl Membership {
    pub fn parse(key: &str, raw: Option<&str>) -> StateResult<Self> {
        match raw {
            None => Ok(Self::Absent),
            Some(keys::ADDED) => Ok(Self::Added),
            Some(keys::REMOVED) => Ok(Self::Removed),
            Some(other) => Err(StateError::malformed(key, other)),
        }
    }

    /// Value written into the peer document. `Absent` deletes the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "",
            Self::Added => keys::ADDED,
            Self::Removed => keys::REMOVED,
        }
    }
}

/// A registered ensemble member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub unit_id: UnitId,
    pub host: String,
    pub client_port: u16,
    pub peer_port: u16,
    pub election_port: u16,
    pub state: ServerState,
    pub membership: Membership,
}

impl ServerRecord {
    pub fn is_started(&self) -> bool {
        self.state == ServerState::Started
    }

    pub fn is_added(&self) -> bool {
        self.membership == Membership::Added
    }

    /// Started but not yet part of the quorum configuration.
    pub fn is_stale(&self) -> bool {
        self.is_started() && self.membership == Membership::Absent
    }
}

impl FromStr for UnitId {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ordinal) = s.parse::<u32>() {
            return Ok(UnitId(ordinal));
        }
        Self::from_unit_name(s)
    }
}
