//! Observable operator events
//!
//! Every state change the operator makes to the ensemble is logged under one
//! of these names. Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events of the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Reconciliation
    /// A lifecycle signal is being handled
    ReconcileBegin,
    /// A lifecycle signal was handled to completion
    ReconcileComplete,
    /// A lifecycle signal must be re-delivered later
    EventDeferred,
    /// Externally visible status recomputed
    StatusUpdated,

    // Configuration
    ConfigLoaded,
    /// Configuration failed validation; the unit is blocked
    ConfigInvalid,

    // Unit lifecycle
    /// Unit published its host and ports
    UnitRegistered,
    /// Local workload is live; unit marked started
    UnitStarted,
    /// Local workload did not come up after start
    WorkloadStartFailed,

    // Quorum membership
    MemberAdded,
    MemberRemoved,
    /// REMOVED marker deleted
    MemberCleared,

    // Quorum encryption
    EncryptionSwitchStarted,
    QuorumModeChanged,
    EncryptionSwitchComplete,

    // Credentials
    CredentialsCreated,
    RotationRequested,
    RotationRejected,
    RotationComplete,
    ClientCredentialsCreated,
    ClientCredentialsRemoved,

    // Rolling restart
    RestartRequested,
    RestartGranted,
    WorkloadRestarted,
    RestartReleased,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ReconcileBegin => "RECONCILE_BEGIN",
            Event::ReconcileComplete => "RECONCILE_COMPLETE",
            Event::EventDeferred => "EVENT_DEFERRED",
            Event::StatusUpdated => "STATUS_UPDATED",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ConfigInvalid => "CONFIG_INVALID",

            Event::UnitRegistered => "UNIT_REGISTERED",
            Event::UnitStarted => "UNIT_STARTED",
            Event::WorkloadStartFailed => "WORKLOAD_START_FAILED",

            Event::MemberAdded => "QUORUM_MEMBER_ADDED",
            Event::MemberRemoved => "QUORUM_MEMBER_REMOVED",
            Event::MemberCleared => "QUORUM_MEMBER_CLEARED",

            Event::EncryptionSwitchStarted => "ENCRYPTION_SWITCH_STARTED",
            Event::QuorumModeChanged => "QUORUM_MODE_CHANGED",
            Event::EncryptionSwitchComplete => "ENCRYPTION_SWITCH_COMPLETE",

            Event::CredentialsCreated => "CREDENTIALS_CREATED",
            Event::RotationRequested => "PASSWORD_ROTATION_REQUESTED",
            Event::RotationRejected => "PASSWORD_ROTATION_REJECTED",
            Event::RotationComplete => "PASSWORD_ROTATION_COMPLETE",
            Event::ClientCredentialsCreated => "CLIENT_CREDENTIALS_CREATED",
            Event::ClientCredentialsRemoved => "CLIENT_CREDENTIALS_REMOVED",

            Event::RestartRequested => "RESTART_LOCK_REQUESTED",
            Event::RestartGranted => "RESTART_LOCK_GRANTED",
            Event::WorkloadRestarted => "WORKLOAD_RESTARTED",
            Event::RestartReleased => "RESTART_LOCK_RELEASED",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReconcileBegin | Event::ReconcileComplete | Event::StatusUpdated => {
                Severity::Trace
            }
            Event::WorkloadStartFailed | Event::RotationRejected | Event::ConfigInvalid => {
                Severity::Warn
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
