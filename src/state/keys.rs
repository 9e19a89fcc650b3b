//! Keys of the replicated peer document.

// Unit scope

/// Hostname the unit is reachable on.
pub const HOST: &str = "host";
pub const CLIENT_PORT: &str = "client-port";
pub const SERVER_PORT: &str = "server-port";
pub const ELECTION_PORT: &str = "election-port";
/// `started` once the local workload is live and serving.
pub const STATE: &str = "state";
/// Quorum mode the unit's workload is currently running with.
pub const RUNNING_QUORUM: &str = "quorum";
/// Migration epoch the unit unified for.
pub const UNIFIED: &str = "unified";
/// Rotation epoch the unit restarted for.
pub const PASSWORD_ROTATED: &str = "password-rotated";
/// `acquire` while the unit waits for (or holds) the restart lock.
pub const RESTART_REQUEST: &str = "restart";
pub const CONFIG_FINGERPRINT: &str = "config-fingerprint";

// Application scope

pub const QUORUM_MODE: &str = "quorum-mode";
pub const TLS: &str = "tls";
pub const MIGRATION_IN_PROGRESS: &str = "migration-in-progress";
pub const MIGRATION_EPOCH: &str = "migration-epoch";
pub const ROTATION_IN_PROGRESS: &str = "rotation-in-progress";
pub const ROTATION_EPOCH: &str = "rotation-epoch";
pub const RESTART_HOLDER: &str = "restart-holder";

// Values

pub const STARTED: &str = "started";
pub const ADDED: &str = "added";
pub const REMOVED: &str = "removed";
pub const ENABLED: &str = "enabled";
pub const ACQUIRE: &str = "acquire";

/// Membership of a unit is keyed by its bare ordinal.
pub fn membership(unit: super::UnitId) -> String {
    unit.0.to_string()
}

/// Password key of a system user.
pub fn password(username: &str) -> String {
    format!("{}-password", username)
}

/// Password key of a client relation.
pub fn client_password(relation_id: u32) -> String {
    format!("relation-{}", relation_id)
}
