//! Quorum Manager
//!
//! Decides, from a fresh peer snapshot, which servers belong in the live
//! quorum and which unit may start next.
//!
//! Rules:
//! - Only the leader produces a non-empty delta
//! - A unit may start only once every lower, non-removed unit is ADDED
//! - With nothing ADDED yet, the lowest eligible unit is seeded ADDED as soon
//!   as it reports STARTED
//! - Departed members are REMOVED in the pass that observes the departure
//! - Otherwise at most one stale unit is ADDED per pass, lowest id first
//! - A departing leader never removes itself
//! - A REMOVED marker is cleared when its unit returns not started, or when
//!   its ordinal lies above every present unit. Clearing happens in passes
//!   without removals and is never combined with an addition

use super::errors::{QuorumError, QuorumResult};
use crate::observability::{log_event_with_fields, Event};
use crate::state::{keys, Membership, PeerSnapshot, Scope, ServerRecord, SharedState, UnitId};

/// Membership changes the leader writes back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuorumDelta {
    pub added: Vec<UnitId>,
    pub removed: Vec<UnitId>,
    /// REMOVED markers deleted, leaving the unit ABSENT.
    pub cleared: Vec<UnitId>,
}

impl QuorumDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.cleared.is_empty()
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub delta: QuorumDelta,
    /// Lowest pending unit whose turn it is to start.
    pub next_unit_to_start: Option<UnitId>,
}

/// Quorum reconciliation as seen from one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumManager {
    unit: UnitId,
}

impl QuorumManager {
    pub fn new(unit: UnitId) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Compute the membership delta and the next unit allowed to start.
    ///
    /// Pure: nothing is written. Non-leaders always get an empty delta.
    pub fn reconcile(&self, snapshot: &PeerSnapshot, leader: bool) -> ReconcileOutcome {
        let next_unit_to_start = snapshot
            .records()
            .iter()
            .filter(|r| !r.is_started() && r.membership != Membership::Removed)
            .find(|r| lower_units_joined(snapshot, r.unit_id).is_ok())
            .map(|r| r.unit_id);

        let delta = if leader {
            self.leader_delta(snapshot)
        } else {
            QuorumDelta::default()
        };

        ReconcileOutcome {
            delta,
            next_unit_to_start,
        }
    }

    fn leader_delta(&self, snapshot: &PeerSnapshot) -> QuorumDelta {
        let removed: Vec<UnitId> = snapshot
            .departed()
            .iter()
            .filter(|(unit, membership)| **membership == Membership::Added && **unit != self.unit)
            .map(|(unit, _)| *unit)
            .collect();

        if !removed.is_empty() {
            return QuorumDelta {
                removed,
                ..QuorumDelta::default()
            };
        }

        let cleared = cleared_markers(snapshot);
        if !cleared.is_empty() {
            return QuorumDelta {
                cleared,
                ..QuorumDelta::default()
            };
        }

        let candidate = if snapshot.added().next().is_none() {
            // Bootstrap seed
            snapshot.lowest_eligible().filter(|r| r.is_started())
        } else {
            snapshot
                .stale()
                .find(|r| lower_units_joined(snapshot, r.unit_id).is_ok())
        };

        QuorumDelta {
            added: candidate.map(|r| r.unit_id).into_iter().collect(),
            ..QuorumDelta::default()
        }
    }

    /// Check whether this unit may start its workload now.
    ///
    /// A unit that is already started always may. A returning unit still
    /// marked REMOVED waits until the leader clears the marker.
    pub fn check_turn(&self, snapshot: &PeerSnapshot, credentials_ready: bool) -> QuorumResult<()> {
        let record = snapshot
            .record(self.unit)
            .ok_or_else(|| QuorumError::unit_not_found(self.unit))?;

        if record.is_started() {
            return Ok(());
        }
        if !credentials_ready {
            return Err(QuorumError::no_credentials_yet());
        }
        if record.membership == Membership::Removed {
            return Err(QuorumError::not_this_units_turn(
                self.unit,
                "removal marker not yet cleared",
            ));
        }

        lower_units_joined(snapshot, self.unit)
            .map_err(|reason| QuorumError::not_this_units_turn(self.unit, reason))
    }

    /// Write a delta into the peer document. Leader only.
    pub fn apply(&self, delta: &QuorumDelta, state: &mut dyn SharedState) {
        for unit in &delta.removed {
            state.set(Scope::App, &keys::membership(*unit), Membership::Removed.as_str());
            log_event_with_fields(Event::MemberRemoved, &[("unit", &unit.to_string())]);
        }
        for unit in &delta.cleared {
            state.set(Scope::App, &keys::membership(*unit), Membership::Absent.as_str());
            log_event_with_fields(Event::MemberCleared, &[("unit", &unit.to_string())]);
        }
        for unit in &delta.added {
            state.set(Scope::App, &keys::membership(*unit), Membership::Added.as_str());
            log_event_with_fields(Event::MemberAdded, &[("unit", &unit.to_string())]);
        }
    }
}

/// REMOVED markers that no longer describe a departed member.
///
/// - present units that came back and have not started yet
/// - departed units above the highest present ordinal
fn cleared_markers(snapshot: &PeerSnapshot) -> Vec<UnitId> {
    let highest = snapshot
        .records()
        .iter()
        .map(|r| r.unit_id)
        .chain(snapshot.unregistered().iter().copied())
        .max();

    let returning = snapshot
        .records()
        .iter()
        .filter(|r| !r.is_started() && r.membership == Membership::Removed)
        .map(|r| r.unit_id);

    let vacated = snapshot
        .departed()
        .iter()
        .filter(|(unit, membership)| {
            **membership == Membership::Removed && highest.map_or(false, |h| **unit > h)
        })
        .map(|(unit, _)| *unit);

    returning.chain(vacated).collect()
}

/// Every lower unit that is still eligible has joined the quorum.
fn lower_units_joined(snapshot: &PeerSnapshot, unit: UnitId) -> Result<(), String> {
    if let Some(lower) = snapshot.unregistered().iter().find(|u| **u < unit) {
        return Err(format!("unit {} has not registered", lower));
    }

    let pending: Option<&ServerRecord> = snapshot
        .records()
        .iter()
        .take_while(|r| r.unit_id < unit)
        .find(|r| r.membership == Membership::Absent);

    match pending {
        Some(lower) => Err(format!("unit {} has not joined the quorum", lower.unit_id)),
        None => Ok(()),
    }
}
