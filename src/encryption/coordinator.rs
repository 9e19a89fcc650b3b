//! Encryption Migration Coordinator
//!
//! Drives the rolling NON_SSL ⇄ SSL switch in three phases:
//! 1. Entry: leader flags the migration and moves the quorum to TRANSITIONAL
//! 2. Every started unit restarts under TRANSITIONAL and stamps `unified`
//! 3. Unanimous barrier: leader moves to the final mode; units restart again
//!
//! `unified` stamps carry the migration epoch and only count while the mode is
//! TRANSITIONAL, so leaving TRANSITIONAL invalidates every stamp in one
//! application write.

use super::errors::EncryptionResult;
use super::mode::QuorumMode;
use crate::observability::{log_event_with_fields, Event};
use crate::state::{keys, read_epoch, read_flag, write_flag, Scope, SharedState, UnitId};

/// Application-scoped encryption state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncryptionState {
    pub tls: bool,
    pub mode: QuorumMode,
    pub migration_in_progress: bool,
    pub epoch: u64,
}

impl EncryptionState {
    pub fn read(state: &dyn SharedState) -> EncryptionResult<Self> {
        let mode = match state.get(Scope::App, keys::QUORUM_MODE) {
            Some(raw) => QuorumMode::parse(keys::QUORUM_MODE, &raw)?,
            None => QuorumMode::default(),
        };
        Ok(Self {
            tls: state.get(Scope::App, keys::TLS).as_deref() == Some(keys::ENABLED),
            mode,
            migration_in_progress: read_flag(
                state,
                Scope::App,
                keys::MIGRATION_IN_PROGRESS,
            )?,
            epoch: read_epoch(state, Scope::App, keys::MIGRATION_EPOCH)?.unwrap_or(0),
        })
    }

    /// Final mode the cluster is heading for.
    pub fn target(&self) -> QuorumMode {
        QuorumMode::target(self.tls)
    }
}

/// What one started unit reports about its encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitEncryptionView {
    pub unit: UnitId,
    /// Mode the unit's workload is running with.
    pub running: Option<QuorumMode>,
    /// Migration epoch the unit unified for.
    pub unified: Option<u64>,
}

impl UnitEncryptionView {
    pub fn read(state: &dyn SharedState, unit: UnitId) -> EncryptionResult<Self> {
        let scope = Scope::Unit(unit);
        let running = match state.get(scope, keys::RUNNING_QUORUM) {
            Some(raw) => Some(QuorumMode::parse(keys::RUNNING_QUORUM, &raw)?),
            None => None,
        };
        Ok(Self {
            unit,
            running,
            unified: read_epoch(state, scope, keys::UNIFIED)?,
        })
    }

    /// Unified for the current migration.
    pub fn is_unified(&self, encryption: &EncryptionState) -> bool {
        encryption.mode == QuorumMode::Transitional && self.unified == Some(encryption.epoch)
    }
}

/// Application writes produced by the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncryptionDelta {
    pub tls: Option<bool>,
    pub mode: Option<QuorumMode>,
    pub migration_in_progress: Option<bool>,
    pub epoch: Option<u64>,
}

impl EncryptionDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What a unit records after running under a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitEncryptionAction {
    pub mode: QuorumMode,
    pub unified: Option<u64>,
}

impl UnitEncryptionAction {
    /// Stamps for a workload running under the current mode.
    pub fn current(encryption: &EncryptionState) -> Self {
        Self {
            mode: encryption.mode,
            unified: (encryption.mode == QuorumMode::Transitional).then_some(encryption.epoch),
        }
    }

    /// Write the unit's own stamps. Owner only.
    pub fn record(&self, state: &mut dyn SharedState, unit: UnitId) {
        let scope = Scope::Unit(unit);
        state.set(scope, keys::RUNNING_QUORUM, self.mode.as_str());
        let unified = self.unified.map(|e| e.to_string()).unwrap_or_default();
        state.set(scope, keys::UNIFIED, &unified);
    }
}

/// Leader and unit sides of the migration.
pub struct EncryptionCoordinator;

impl EncryptionCoordinator {
    /// Entry event: the TLS relation appeared (`tls_present`) or went away.
    pub fn begin(
        encryption: &EncryptionState,
        tls_present: bool,
        leader: bool,
    ) -> EncryptionResult<EncryptionDelta> {
        if !leader || encryption.tls == tls_present {
            return Ok(EncryptionDelta::default());
        }

        let mut delta = EncryptionDelta {
            tls: Some(tls_present),
            migration_in_progress: Some(true),
            ..EncryptionDelta::default()
        };
        if encryption.mode.is_final() {
            delta.mode = Some(encryption.mode.transition_to(QuorumMode::Transitional)?);
            delta.epoch = Some(encryption.epoch + 1);
        }
        Ok(delta)
    }

    /// Advance the migration from a fresh view of every started unit.
    ///
    /// Stalls without error while the barrier is open.
    pub fn step(
        encryption: &EncryptionState,
        started: &[UnitEncryptionView],
        leader: bool,
    ) -> EncryptionResult<EncryptionDelta> {
        if !leader {
            return Ok(EncryptionDelta::default());
        }

        let target = encryption.target();
        match encryption.mode {
            QuorumMode::Transitional => {
                let barrier_closed = started.len() <= 1
                    || started.iter().all(|u| u.is_unified(encryption));
                if !barrier_closed {
                    return Ok(EncryptionDelta::default());
                }
                Ok(EncryptionDelta {
                    mode: Some(encryption.mode.transition_to(target)?),
                    migration_in_progress: Some(true),
                    ..EncryptionDelta::default()
                })
            }
            mode if mode != target => Ok(EncryptionDelta {
                mode: Some(mode.transition_to(QuorumMode::Transitional)?),
                migration_in_progress: Some(true),
                epoch: Some(encryption.epoch + 1),
                ..EncryptionDelta::default()
            }),
            mode => {
                let settled = started.iter().all(|u| u.running == Some(mode));
                if encryption.migration_in_progress && settled {
                    Ok(EncryptionDelta {
                        migration_in_progress: Some(false),
                        ..EncryptionDelta::default()
                    })
                } else {
                    Ok(EncryptionDelta::default())
                }
            }
        }
    }

    /// Write a leader delta. Leader only.
    pub fn apply(delta: &EncryptionDelta, state: &mut dyn SharedState) {
        if let Some(tls) = delta.tls {
            state.set(Scope::App, keys::TLS, if tls { keys::ENABLED } else { "" });
            log_event_with_fields(
                Event::EncryptionSwitchStarted,
                &[("tls", if tls { "enabled" } else { "disabled" })],
            );
        }
        if let Some(epoch) = delta.epoch {
            state.set(Scope::App, keys::MIGRATION_EPOCH, &epoch.to_string());
        }
        if let Some(mode) = delta.mode {
            state.set(Scope::App, keys::QUORUM_MODE, mode.as_str());
            log_event_with_fields(Event::QuorumModeChanged, &[("mode", mode.as_str())]);
        }
        if let Some(in_progress) = delta.migration_in_progress {
            write_flag(state, Scope::App, keys::MIGRATION_IN_PROGRESS, in_progress);
            if !in_progress {
                log_event_with_fields(Event::EncryptionSwitchComplete, &[]);
            }
        }
    }

    /// Whether this started unit must restart, and what it records after.
    pub fn unit_action(
        encryption: &EncryptionState,
        view: &UnitEncryptionView,
    ) -> Option<UnitEncryptionAction> {
        let wrong_mode = view.running != Some(encryption.mode);
        let not_unified =
            encryption.mode == QuorumMode::Transitional && !view.is_unified(encryption);

        (wrong_mode || not_unified).then(|| UnitEncryptionAction::current(encryption))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryDatabag;

    fn view(unit: u32, running: QuorumMode, unified: Option<u64>) -> UnitEncryptionView {
        UnitEncryptionView {
            unit: UnitId(unit),
            running: Some(running),
            unified,
        }
    }

    fn transitional(tls: bool, epoch: u64) -> EncryptionState {
        EncryptionState {
            tls,
            mode: QuorumMode::Transitional,
            migration_in_progress: true,
            epoch,
        }
    }

    // =========================================================================
    // ENTRY
    // =========================================================================

    #[test]
    fn test_begin_moves_to_transitional_and_bumps_epoch() {
        let delta = EncryptionCoordinator::begin(&EncryptionState::default(), true, true).unwrap();

        assert_eq!(delta.tls, Some(true));
        assert_eq!(delta.mode, Some(QuorumMode::Transitional));
        assert_eq!(delta.migration_in_progress, Some(true));
        assert_eq!(delta.epoch, Some(1));
    }

    #[test]
    fn test_begin_is_noop_for_non_leader_or_same_tls() {
        let current = EncryptionState::default();
        assert!(EncryptionCoordinator::begin(&current, true, false).unwrap().is_empty());
        assert!(EncryptionCoordinator::begin(&current, false, true).unwrap().is_empty());
    }

    #[test]
    fn test_begin_reversal_keeps_transitional_epoch() {
        let delta = EncryptionCoordinator::begin(&transitional(true, 3), false, true).unwrap();

        assert_eq!(delta.tls, Some(false));
        assert_eq!(delta.mode, None);
        assert_eq!(delta.epoch, None);
    }

    // =========================================================================
    // BARRIER
    // =========================================================================

    #[test]
    fn test_barrier_waits_for_every_unit() {
        let current = transitional(true, 2);
        let units = [
            view(0, QuorumMode::Transitional, Some(2)),
            view(1, QuorumMode::Transitional, Some(2)),
            view(2, QuorumMode::NonSsl, None),
        ];

        assert!(EncryptionCoordinator::step(&current, &units, true).unwrap().is_empty());
    }

    #[test]
    fn test_stale_epoch_does_not_count() {
        let current = transitional(true, 2);
        let units = [
            view(0, QuorumMode::Transitional, Some(2)),
            view(1, QuorumMode::Transitional, Some(1)),
        ];

        assert!(!units[1].is_unified(&current));
        assert!(EncryptionCoordinator::step(&current, &units, true).unwrap().is_empty());
    }

    #[test]
    fn test_barrier_closes_unanimously() {
        let current = transitional(true, 2);
        let units = [
            view(0, QuorumMode::Transitional, Some(2)),
            view(1, QuorumMode::Transitional, Some(2)),
        ];

        let delta = EncryptionCoordinator::step(&current, &units, true).unwrap();
        assert_eq!(delta.mode, Some(QuorumMode::Ssl));
        assert_eq!(delta.epoch, None);
    }

    #[test]
    fn test_single_unit_skips_barrier() {
        let current = transitional(false, 1);
        let units = [view(0, QuorumMode::Ssl, None)];

        let delta = EncryptionCoordinator::step(&current, &units, true).unwrap();
        assert_eq!(delta.mode, Some(QuorumMode::NonSsl));
    }

    #[test]
    fn test_migration_clears_once_settled() {
        let current = EncryptionState {
            tls: true,
            mode: QuorumMode::Ssl,
            migration_in_progress: true,
            epoch: 1,
        };
        let pending = [view(0, QuorumMode::Ssl, None), view(1, QuorumMode::Transitional, Some(1))];
        assert!(EncryptionCoordinator::step(&current, &pending, true).unwrap().is_empty());

        let settled = [view(0, QuorumMode::Ssl, None), view(1, QuorumMode::Ssl, None)];
        let delta = EncryptionCoordinator::step(&current, &settled, true).unwrap();
        assert_eq!(delta.migration_in_progress, Some(false));
    }

    #[test]
    fn test_final_mode_mismatch_reenters_transitional() {
        let current = EncryptionState {
            tls: true,
            mode: QuorumMode::NonSsl,
            migration_in_progress: false,
            epoch: 4,
        };

        let delta = EncryptionCoordinator::step(&current, &[], true).unwrap();
        assert_eq!(delta.mode, Some(QuorumMode::Transitional));
        assert_eq!(delta.epoch, Some(5));
    }

    // =========================================================================
    // UNIT SIDE
    // =========================================================================

    #[test]
    fn test_unit_restarts_into_transitional() {
        let current = transitional(true, 2);
        let action =
            EncryptionCoordinator::unit_action(&current, &view(0, QuorumMode::NonSsl, None)).unwrap();

        assert_eq!(action.mode, QuorumMode::Transitional);
        assert_eq!(action.unified, Some(2));
    }

    #[test]
    fn test_unified_unit_does_not_restart() {
        let current = transitional(true, 2);
        let unit = view(0, QuorumMode::Transitional, Some(2));

        assert_eq!(EncryptionCoordinator::unit_action(&current, &unit), None);
    }

    #[test]
    fn test_record_clears_stamp_outside_transitional() {
        let mut bag = MemoryDatabag::new();
        let unit = UnitId(0);
        bag.set(Scope::Unit(unit), keys::UNIFIED, "2");

        let ssl = EncryptionState {
            tls: true,
            mode: QuorumMode::Ssl,
            migration_in_progress: true,
            epoch: 2,
        };
        UnitEncryptionAction::current(&ssl).record(&mut bag, unit);

        assert_eq!(bag.get(Scope::Unit(unit), keys::RUNNING_QUORUM).as_deref(), Some("ssl"));
        assert_eq!(bag.get(Scope::Unit(unit), keys::UNIFIED), None);
    }

    #[test]
    fn test_apply_and_read_roundtrip() {
        let mut bag = MemoryDatabag::new();
        let delta = EncryptionCoordinator::begin(&EncryptionState::default(), true, true).unwrap();
        EncryptionCoordinator::apply(&delta, &mut bag);

        let current = EncryptionState::read(&bag).unwrap();
        assert_eq!(current, transitional(true, 1));
    }
}
