//! Rolling Restart Lock
//!
//! Cluster-wide mutual exclusion so that at most one unit restarts its
//! workload at any instant.
//!
//! - A unit requests by writing `restart=acquire` to its own scope
//! - The leader grants `restart-holder` to the lowest requesting unit, but
//!   only once the current holder has stopped requesting
//! - The holder restarts, records its barrier stamps and releases by deleting
//!   its request
//!
//! Nothing blocks: a unit that is not granted returns and is re-entered on a
//! later signal.

use crate::observability::{log_event_with_fields, Event};
use crate::state::{keys, Scope, SharedState, StateError, StateResult, UnitId};

/// Lock view for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingRestart {
    unit: UnitId,
}

impl RollingRestart {
    pub fn new(unit: UnitId) -> Self {
        Self { unit }
    }

    /// Current holder, if any.
    pub fn holder(state: &dyn SharedState) -> StateResult<Option<UnitId>> {
        match state.get(Scope::App, keys::RESTART_HOLDER) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<UnitId>()
                .map(Some)
                .map_err(|_| StateError::malformed(keys::RESTART_HOLDER, raw)),
        }
    }

    /// Units with an outstanding request, lowest first.
    pub fn requesters(state: &dyn SharedState) -> Vec<UnitId> {
        state
            .units()
            .into_iter()
            .filter(|u| {
                state.get(Scope::Unit(*u), keys::RESTART_REQUEST).as_deref() == Some(keys::ACQUIRE)
            })
            .collect()
    }

    pub fn is_requested(&self, state: &dyn SharedState) -> bool {
        state.get(Scope::Unit(self.unit), keys::RESTART_REQUEST).as_deref() == Some(keys::ACQUIRE)
    }

    /// Ask for the lock. Idempotent.
    pub fn request(&self, state: &mut dyn SharedState) {
        if self.is_requested(state) {
            return;
        }
        state.set(Scope::Unit(self.unit), keys::RESTART_REQUEST, keys::ACQUIRE);
        log_event_with_fields(Event::RestartRequested, &[("unit", &self.unit.to_string())]);
    }

    /// This unit holds the lock and still wants it.
    pub fn is_granted(&self, state: &dyn SharedState) -> StateResult<bool> {
        Ok(self.is_requested(state) && Self::holder(state)? == Some(self.unit))
    }

    /// Give the lock back.
    pub fn release(&self, state: &mut dyn SharedState) {
        if !self.is_requested(state) {
            return;
        }
        state.set(Scope::Unit(self.unit), keys::RESTART_REQUEST, "");
        log_event_with_fields(Event::RestartReleased, &[("unit", &self.unit.to_string())]);
    }

    /// Leader side: hand the lock to the next requester.
    ///
    /// Returns the unit granted in this call, if any.
    pub fn arbitrate(state: &mut dyn SharedState, leader: bool) -> StateResult<Option<UnitId>> {
        if !leader {
            return Ok(None);
        }

        let requesters = Self::requesters(state);
        let holder = Self::holder(state)?;
        if let Some(current) = holder {
            if requesters.contains(&current) {
                return Ok(None);
            }
        }

        match requesters.first() {
            Some(next) => {
                state.set(Scope::App, keys::RESTART_HOLDER, &next.to_string());
                log_event_with_fields(Event::RestartGranted, &[("unit", &next.to_string())]);
                Ok(Some(*next))
            }
            None => {
                if holder.is_some() {
                    state.set(Scope::App, keys::RESTART_HOLDER, "");
                }
                Ok(None)
            }
        }
    }
}
