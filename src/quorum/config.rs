//! Live quorum configuration
//!
//! Derived from the peer snapshot on every reconciliation and never stored.

use std::fmt;

use super::errors::{QuorumError, QuorumResult};
use crate::state::{PeerSnapshot, ServerRecord, UnitId};

/// Voting role of a server line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole {
    Participant,
    Observer,
}

impl ServerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Participant => "participant",
            ServerRole::Observer => "observer",
        }
    }
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Render one dynamic-config server line.
///
/// `server.<myid>=<host>:<server-port>:<election-port>:<role>;0.0.0.0:<client-port>`
pub fn server_line(record: &ServerRecord, role: ServerRole) -> String {
    format!(
        "server.{}={}:{}:{}:{};0.0.0.0:{}",
        record.unit_id.myid(),
        record.host,
        record.peer_port,
        record.election_port,
        role,
        record.client_port
    )
}

/// Ordered set of members in the live quorum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuorumConfig {
    members: Vec<ServerRecord>,
}

impl QuorumConfig {
    /// Members with `membership=added`, ordered by unit id.
    pub fn derive(snapshot: &PeerSnapshot) -> Self {
        Self {
            members: snapshot.added().cloned().collect(),
        }
    }

    pub fn members(&self) -> &[ServerRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.members.iter().any(|m| m.unit_id == unit)
    }

    pub fn server_lines(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| server_line(m, ServerRole::Participant))
            .collect()
    }

    /// `host:client-port` of every member, comma separated.
    pub fn connection_string(&self) -> String {
        self.endpoints(None).join(",")
    }

    /// `host:port` of every member. `port` overrides the member's client port.
    pub fn endpoints(&self, port: Option<u16>) -> Vec<String> {
        self.members
            .iter()
            .map(|m| format!("{}:{}", m.host, port.unwrap_or(m.client_port)))
            .collect()
    }

    /// Server lines a unit starts its workload with.
    ///
    /// The bootstrap unit starts alone as participant. Any other unit starts
    /// with the current participants plus itself as observer until the leader
    /// adds it.
    pub fn startup_servers(&self, snapshot: &PeerSnapshot, unit: UnitId) -> QuorumResult<Vec<String>> {
        let record = snapshot
            .record(unit)
            .ok_or_else(|| QuorumError::unit_not_found(unit))?;

        if self.members.is_empty() {
            return Ok(vec![server_line(record, ServerRole::Participant)]);
        }

        let mut lines = self.server_lines();
        if !self.contains(unit) {
            lines.push(server_line(record, ServerRole::Observer));
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Membership, ServerState};
    use std::collections::{BTreeMap, BTreeSet};

    fn record(unit: u32, state: ServerState, membership: Membership) -> ServerRecord {
        ServerRecord {
            unit_id: UnitId(unit),
            host: format!("zk-{}.zk-endpoints", unit),
            client_port: 2181,
            peer_port: 2888,
            election_port: 3888,
            state,
            membership,
        }
    }

    fn snapshot(records: Vec<ServerRecord>) -> PeerSnapshot {
        PeerSnapshot::from_parts(records, BTreeSet::new(), BTreeMap::new())
    }

    #[test]
    fn test_server_line_format() {
        let r = record(0, ServerState::Started, Membership::Added);
        assert_eq!(
            server_line(&r, ServerRole::Participant),
            "server.1=zk-0.zk-endpoints:2888:3888:participant;0.0.0.0:2181"
        );
    }

    #[test]
    fn test_derive_keeps_only_added_in_order() {
        let snap = snapshot(vec![
            record(2, ServerState::Started, Membership::Added),
            record(1, ServerState::Started, Membership::Absent),
            record(0, ServerState::Started, Membership::Added),
        ]);

        let config = QuorumConfig::derive(&snap);
        assert_eq!(config.len(), 2);
        assert_eq!(
            config.connection_string(),
            "zk-0.zk-endpoints:2181,zk-2.zk-endpoints:2181"
        );
    }

    #[test]
    fn test_bootstrap_unit_starts_alone() {
        let snap = snapshot(vec![
            record(0, ServerState::Pending, Membership::Absent),
            record(1, ServerState::Pending, Membership::Absent),
        ]);
        let config = QuorumConfig::derive(&snap);

        let lines = config.startup_servers(&snap, UnitId(0)).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("server.1="));
        assert!(lines[0].contains(":participant;"));
    }

    #[test]
    fn test_joining_unit_starts_as_observer() {
        let snap = snapshot(vec![
            record(0, ServerState::Started, Membership::Added),
            record(1, ServerState::Pending, Membership::Absent),
        ]);
        let config = QuorumConfig::derive(&snap);

        let lines = config.startup_servers(&snap, UnitId(1)).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("server.1=") && lines[0].contains(":participant;"));
        assert!(lines[1].starts_with("server.2=") && lines[1].contains(":observer;"));
    }

    #[test]
    fn test_member_restarts_with_participants_only() {
        let snap = snapshot(vec![
            record(0, ServerState::Started, Membership::Added),
            record(1, ServerState::Started, Membership::Added),
        ]);
        let config = QuorumConfig::derive(&snap);

        let lines = config.startup_servers(&snap, UnitId(1)).unwrap();
        assert_eq!(lines, config.server_lines());
    }

    #[test]
    fn test_startup_servers_unknown_unit() {
        let snap = snapshot(vec![record(0, ServerState::Pending, Membership::Absent)]);
        let config = QuorumConfig::derive(&snap);

        let err = config.startup_servers(&snap, UnitId(5)).unwrap_err();
        assert_eq!(err.kind, super::super::QuorumErrorKind::UnitNotFound);
    }
}
