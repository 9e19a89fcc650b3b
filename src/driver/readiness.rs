//! Upgrade readiness
//!
//! An in-place upgrade restarts every unit in turn, so it may only begin
//! while the ensemble is settled.

use super::errors::DriverResult;
use crate::credentials::CredentialState;
use crate::encryption::EncryptionState;
use crate::restart::RollingRestart;
use crate::state::{PeerSnapshot, SharedState};

/// Outcome of the pre-upgrade check. `cause` names the first blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub passed: bool,
    pub cause: Option<&'static str>,
}

impl Readiness {
    const READY: Readiness = Readiness {
        passed: true,
        cause: None,
    };

    fn blocked(cause: &'static str) -> Self {
        Self {
            passed: false,
            cause: Some(cause),
        }
    }
}

/// Check that every unit serves in the quorum and nothing is in flight.
pub fn upgrade_readiness(state: &dyn SharedState) -> DriverResult<Readiness> {
    let snapshot = PeerSnapshot::read(state, None)?;

    if snapshot.records().is_empty() {
        return Ok(Readiness::blocked("no units registered"));
    }
    if !snapshot.all_registered() {
        return Ok(Readiness::blocked("not all units registered"));
    }
    if snapshot.records().iter().any(|r| !r.is_started()) {
        return Ok(Readiness::blocked("not all units started"));
    }
    if snapshot.records().iter().any(|r| !r.is_added()) {
        return Ok(Readiness::blocked("quorum membership is updating"));
    }

    if EncryptionState::read(state)?.migration_in_progress {
        return Ok(Readiness::blocked("quorum encryption switch in progress"));
    }
    if CredentialState::read(state)?.rotation_in_progress {
        return Ok(Readiness::blocked("password rotation in progress"));
    }
    if RollingRestart::holder(state)?.is_some() {
        return Ok(Readiness::blocked("rolling restart in progress"));
    }

    Ok(Readiness::READY)
}
