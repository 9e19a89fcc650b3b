//! Shared State Accessor
//!
//! Typed read/write access to the replicated peer document the host runtime
//! exposes to every unit of the ensemble.
//!
//! Ownership rules:
//! - Application-scoped keys are written only by the current leader
//! - Unit-scoped keys are written only by the owning unit
//! - Every reconciliation re-reads the document; nothing is cached across signals
//!
//! Writing an empty value deletes a key, matching the host runtime.

mod databag;
mod errors;
pub mod keys;
mod records;
mod snapshot;

pub use databag::{Leadership, MemoryDatabag, Scope, SharedState};
pub use errors::{StateError, StateResult};
pub use records::{Membership, ServerRecord, ServerState, UnitId};
pub use snapshot::PeerSnapshot;

/// Read an optional epoch stamp (`unified`, `password-rotated`, `*-epoch`).
pub(crate) fn read_epoch(
    state: &dyn SharedState,
    scope: Scope,
    key: &'static str,
) -> StateResult<Option<u64>> {
    match state.get(scope, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| StateError::malformed(key, raw)),
    }
}

/// Read a `"true"` flag. Any other present value is malformed.
pub(crate) fn read_flag(
    state: &dyn SharedState,
    scope: Scope,
    key: &'static str,
) -> StateResult<bool> {
    match state.get(scope, key).as_deref() {
        None => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(StateError::malformed(key, other)),
    }
}

/// Write a `"true"` flag or delete it.
pub(crate) fn write_flag(state: &mut dyn SharedState, scope: Scope, key: &str, value: bool) {
    state.set(scope, key, if value { "true" } else { "" });
}
