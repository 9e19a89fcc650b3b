//! Fresh typed view over the peer document

use std::collections::{BTreeMap, BTreeSet};

use super::databag::{Scope, SharedState};
use super::errors::{StateError, StateResult};
use super::keys;
use super::records::{Membership, ServerRecord, ServerState, UnitId};
use crate::config::{DEFAULT_CLIENT_PORT, DEFAULT_ELECTION_PORT, DEFAULT_SERVER_PORT};

/// Snapshot of ensemble membership as observed by one reconciliation.
///
/// - `records`: present units that registered a host, ordered by unit id
/// - `unregistered`: present units that have not registered a host yet
/// - `departed`: membership entries of units no longer in the peer relation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSnapshot {
    records: Vec<ServerRecord>,
    unregistered: BTreeSet<UnitId>,
    departed: BTreeMap<UnitId, Membership>,
}

impl PeerSnapshot {
    /// Read the snapshot. A unit named by `departing` counts as gone even if
    /// its data is still visible.
    pub fn read(state: &dyn SharedState, departing: Option<UnitId>) -> StateResult<Self> {
        let present: BTreeSet<UnitId> = state
            .units()
            .into_iter()
            .filter(|unit| Some(*unit) != departing)
            .collect();

        let mut records = Vec::with_capacity(present.len());
        let mut unregistered = BTreeSet::new();

        for unit in &present {
            let scope = Scope::Unit(*unit);
            let Some(host) = state.get(scope, keys::HOST) else {
                unregistered.insert(*unit);
                continue;
            };

            let membership_key = keys::membership(*unit);
            records.push(ServerRecord {
                unit_id: *unit,
                host,
                client_port: read_port(state, scope, keys::CLIENT_PORT, DEFAULT_CLIENT_PORT)?,
                peer_port: read_port(state, scope, keys::SERVER_PORT, DEFAULT_SERVER_PORT)?,
                election_port: read_port(
                    state,
                    scope,
                    keys::ELECTION_PORT,
                    DEFAULT_ELECTION_PORT,
                )?,
                state: ServerState::parse(state.get(scope, keys::STATE).as_deref())?,
                membership: Membership::parse(
                    &membership_key,
                    state.get(Scope::App, &membership_key).as_deref(),
                )?,
            });
        }

        let mut departed = BTreeMap::new();
        for key in state.keys(Scope::App) {
            let Ok(ordinal) = key.parse::<u32>() else {
                continue;
            };
            let unit = UnitId(ordinal);
            if present.contains(&unit) {
                continue;
            }
            let membership = Membership::parse(&key, state.get(Scope::App, &key).as_deref())?;
            departed.insert(unit, membership);
        }

        Ok(Self {
            records,
            unregistered,
            departed,
        })
    }

    /// Build a snapshot from already-typed parts.
    pub fn from_parts(
        mut records: Vec<ServerRecord>,
        unregistered: BTreeSet<UnitId>,
        departed: BTreeMap<UnitId, Membership>,
    ) -> Self {
        records.sort_by_key(|r| r.unit_id);
        Self {
            records,
            unregistered,
            departed,
        }
    }

    pub fn records(&self) -> &[ServerRecord] {
        &self.records
    }

    pub fn record(&self, unit: UnitId) -> Option<&ServerRecord> {
        self.records.iter().find(|r| r.unit_id == unit)
    }

    pub fn unregistered(&self) -> &BTreeSet<UnitId> {
        &self.unregistered
    }

    pub fn departed(&self) -> &BTreeMap<UnitId, Membership> {
        &self.departed
    }

    /// Every present unit has registered its host.
    pub fn all_registered(&self) -> bool {
        self.unregistered.is_empty()
    }

    /// Present members currently in the quorum configuration.
    pub fn added(&self) -> impl Iterator<Item = &ServerRecord> {
        self.records.iter().filter(|r| r.is_added())
    }

    /// Present members whose workload is started.
    pub fn started(&self) -> impl Iterator<Item = &ServerRecord> {
        self.records.iter().filter(|r| r.is_started())
    }

    /// Started members not yet in the quorum configuration.
    pub fn stale(&self) -> impl Iterator<Item = &ServerRecord> {
        self.records.iter().filter(|r| r.is_stale())
    }

    /// Lowest registered unit still eligible for membership.
    pub fn lowest_eligible(&self) -> Option<&ServerRecord> {
        self.records
            .iter()
            .find(|r| r.membership != Membership::Removed)
    }
}

fn read_port(
    state: &dyn SharedState,
    scope: Scope,
    key: &'static str,
    default: u16,
) -> StateResult<u16> {
    match state.get(scope, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| StateError::malformed(key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryDatabag;

    fn register(bag: &mut MemoryDatabag, unit: u32) {
        bag.join(UnitId(unit));
        bag.set(Scope::Unit(UnitId(unit)), keys::HOST, &format!("zk-{}", unit));
    }

    #[test]
    fn test_records_are_ordered_and_typed() {
        let mut bag = MemoryDatabag::new();
        register(&mut bag, 2);
        register(&mut bag, 0);
        bag.set(Scope::Unit(UnitId(0)), keys::STATE, keys::STARTED);
        bag.set(Scope::App, "0", keys::ADDED);

        let snapshot = PeerSnapshot::read(&bag, None).unwrap();
        let ids: Vec<u32> = snapshot.records().iter().map(|r| r.unit_id.0).collect();
        assert_eq!(ids, vec![0, 2]);

        let first = snapshot.record(UnitId(0)).unwrap();
        assert!(first.is_started());
        assert!(first.is_added());
        assert_eq!(first.peer_port, DEFAULT_SERVER_PORT);

        let second = snapshot.record(UnitId(2)).unwrap();
        assert_eq!(second.state, ServerState::Pending);
        assert_eq!(second.membership, Membership::Absent);
    }

    #[test]
    fn test_unregistered_units_are_tracked() {
        let mut bag = MemoryDatabag::new();
        register(&mut bag, 0);
        bag.join(UnitId(1));

        let snapshot = PeerSnapshot::read(&bag, None).unwrap();
        assert!(!snapshot.all_registered());
        assert!(snapshot.unregistered().contains(&UnitId(1)));
        assert!(snapshot.record(UnitId(1)).is_none());
    }

    #[test]
    fn test_departed_membership_is_reported() {
        let mut bag = MemoryDatabag::new();
        register(&mut bag, 0);
        register(&mut bag, 1);
        bag.set(Scope::App, "0", keys::ADDED);
        bag.set(Scope::App, "1", keys::ADDED);
        bag.depart(UnitId(1));

        let snapshot = PeerSnapshot::read(&bag, None).unwrap();
        assert_eq!(snapshot.departed().get(&UnitId(1)), Some(&Membership::Added));
        assert!(snapshot.record(UnitId(1)).is_none());
    }

    #[test]
    fn test_departing_unit_counts_as_gone() {
        let mut bag = MemoryDatabag::new();
        register(&mut bag, 0);
        register(&mut bag, 1);
        bag.set(Scope::App, "1", keys::ADDED);

        let snapshot = PeerSnapshot::read(&bag, Some(UnitId(1))).unwrap();
        assert!(snapshot.record(UnitId(1)).is_none());
        assert_eq!(snapshot.departed().get(&UnitId(1)), Some(&Membership::Added));
    }

    #[test]
    fn test_malformed_port_is_an_error() {
        let mut bag = MemoryDatabag::new();
        register(&mut bag, 0);
        bag.set(Scope::Unit(UnitId(0)), keys::CLIENT_PORT, "not-a-port");

        assert!(PeerSnapshot::read(&bag, None).is_err());
    }
}
