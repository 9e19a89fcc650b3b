//! CLI command implementations
//!
//! Each command loads the peer document snapshot, acts on it through the
//! same coordinators a running unit uses, and returns a JSON value. Commands
//! that change the document persist it before returning.

use std::path::Path;

use serde_json::{json, Value};

use super::args::{Cli, Command};
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{load_state, save_state, write_response};
use crate::config::OperatorConfig;
use crate::credentials::{is_system_user, CredentialCoordinator, CredentialState, NewPassword};
use crate::driver::upgrade_readiness;
use crate::encryption::EncryptionState;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::quorum::{QuorumConfig, QuorumManager};
use crate::restart::RollingRestart;
use crate::state::{keys, Leadership, MemoryDatabag, PeerSnapshot, Scope, SharedState, UnitId};

/// Hostname a unit registers under in a freshly initialised snapshot.
fn unit_host(unit: UnitId) -> String {
    format!("zookeeper-k8s-{}.zookeeper-k8s-endpoints", unit.0)
}

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = load_config(cli.config.as_deref())?;
    run_command(cli.command, &cli.state, &config)
}

fn load_config(path: Option<&Path>) -> CliResult<OperatorConfig> {
    let config = match path {
        Some(path) => OperatorConfig::load(path)?,
        None => OperatorConfig::default(),
    };
    Logger::set_min_severity(config.log_level.min_severity());

    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    log_event_with_fields(Event::ConfigLoaded, &[("source", &source)]);

    Ok(config)
}

/// Execute a CLI command and write its response
pub fn run_command(command: Command, state_path: &Path, config: &OperatorConfig) -> CliResult<()> {
    let data = match command {
        Command::Init { units } => init(state_path, units, config)?,
        Command::Status => status(state_path)?,
        Command::Quorum => quorum(state_path)?,
        Command::GetPassword { username } => get_password(state_path, &username)?,
        Command::SetPassword {
            username,
            password,
            unit,
        } => set_password(state_path, &username, password, unit.as_deref())?,
        Command::PreUpgradeCheck => pre_upgrade_check(state_path)?,
    };
    write_response(data)
}

/// Create a snapshot with `units` registered units, unit 0 as leader and
/// system credentials seeded.
pub fn init(state_path: &Path, units: u32, config: &OperatorConfig) -> CliResult<Value> {
    if state_path.exists() {
        return Err(CliError::already_initialized());
    }
    if units == 0 {
        return Err(CliError::invalid_argument("--units must be > 0"));
    }

    let mut bag = MemoryDatabag::new();
    for ordinal in 0..units {
        let unit = UnitId(ordinal);
        let scope = Scope::Unit(unit);
        bag.join(unit);
        bag.set(scope, keys::HOST, &unit_host(unit));
        bag.set(scope, keys::CLIENT_PORT, &config.client_port.to_string());
        bag.set(scope, keys::SERVER_PORT, &config.server_port.to_string());
        bag.set(scope, keys::ELECTION_PORT, &config.election_port.to_string());
    }
    bag.elect(UnitId(0));

    let created = CredentialCoordinator::ensure_credentials(&mut bag, true)?;
    save_state(state_path, &bag)?;

    Ok(json!({
        "path": state_path.display().to_string(),
        "units": units,
        "leader": 0,
        "credentials_created": created,
    }))
}

/// Encryption, rotation, restart lock and membership overview.
pub fn status(state_path: &Path) -> CliResult<Value> {
    let bag = load_state(state_path)?;
    let encryption = EncryptionState::read(&bag)?;
    let credentials = CredentialState::read(&bag)?;
    let snapshot = PeerSnapshot::read(&bag, None)?;
    let holder = RollingRestart::holder(&bag)?;

    let units: Vec<Value> = snapshot
        .records()
        .iter()
        .map(|record| {
            json!({
                "unit": record.unit_id.0,
                "myid": record.unit_id.myid(),
                "host": record.host,
                "started": record.is_started(),
                "membership": membership_label(record.membership.as_str()),
            })
        })
        .collect();

    let departed: Vec<Value> = snapshot
        .departed()
        .iter()
        .map(|(unit, membership)| {
            json!({
                "unit": unit.0,
                "membership": membership_label(membership.as_str()),
            })
        })
        .collect();

    Ok(json!({
        "leader": bag.leader().map(|u| u.0),
        "encryption": {
            "tls": encryption.tls,
            "quorum_mode": encryption.mode.to_string(),
            "migration_in_progress": encryption.migration_in_progress,
            "migration_epoch": encryption.epoch,
        },
        "rotation": {
            "in_progress": credentials.rotation_in_progress,
            "epoch": credentials.epoch,
        },
        "restart_holder": holder.map(|u| u.0),
        "units": units,
        "unregistered": snapshot.unregistered().iter().map(|u| u.0).collect::<Vec<_>>(),
        "departed": departed,
    }))
}

fn membership_label(raw: &'static str) -> &'static str {
    if raw.is_empty() {
        "absent"
    } else {
        raw
    }
}

/// Live quorum configuration and the next unit allowed to start.
pub fn quorum(state_path: &Path) -> CliResult<Value> {
    let bag = load_state(state_path)?;
    let snapshot = PeerSnapshot::read(&bag, None)?;
    let config = QuorumConfig::derive(&snapshot);
    let leader = bag.leader().unwrap_or(UnitId(0));
    let outcome = QuorumManager::new(leader).reconcile(&snapshot, false);

    Ok(json!({
        "servers": config.server_lines(),
        "connection_string": config.connection_string(),
        "next_unit_to_start": outcome.next_unit_to_start.map(|u| u.0),
    }))
}

/// Read a system user's password.
pub fn get_password(state_path: &Path, username: &str) -> CliResult<Value> {
    if !is_system_user(username) {
        return Err(CliError::invalid_argument(format!(
            "unknown system user: {}",
            username
        )));
    }
    let bag = load_state(state_path)?;
    let credentials = CredentialState::read(&bag)?;

    Ok(json!({
        "username": username,
        "password": credentials.password(username),
    }))
}

/// Request a password rotation on behalf of `unit` (the leader by default).
pub fn set_password(
    state_path: &Path,
    username: &str,
    password: Option<String>,
    unit: Option<&str>,
) -> CliResult<Value> {
    let mut bag = load_state(state_path)?;
    let unit = match unit {
        Some(raw) => raw.parse::<UnitId>()?,
        None => bag
            .leader()
            .ok_or_else(|| CliError::invalid_argument("no leader elected; pass --unit"))?,
    };
    let leader = bag.is_leader(unit);
    let new_password = match password {
        Some(password) => NewPassword::Given(password),
        None => NewPassword::Generate,
    };

    let grant = CredentialCoordinator::request_rotation(&mut bag, username, new_password, leader)?;
    save_state(state_path, &bag)?;

    Ok(json!({
        "username": grant.username,
        "password": grant.password,
        "rotation_epoch": grant.epoch,
    }))
}

/// Refuse an in-place upgrade unless the ensemble is settled.
pub fn pre_upgrade_check(state_path: &Path) -> CliResult<Value> {
    let bag = load_state(state_path)?;
    let readiness = upgrade_readiness(&bag)?;

    match readiness.cause {
        None => Ok(json!({ "ready": true })),
        Some(cause) => Err(CliError::new(
            CliErrorCode::ClusterNotReady,
            format!("pre-upgrade check failed: {}", cause),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialised(units: u32) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        init(&path, units, &OperatorConfig::default()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_init_registers_units_and_seeds_credentials() {
        let (_dir, path) = initialised(3);

        let bag = load_state(&path).unwrap();
        assert_eq!(bag.leader(), Some(UnitId(0)));
        assert_eq!(bag.units().len(), 3);
        assert_eq!(
            bag.get(Scope::Unit(UnitId(2)), keys::HOST).as_deref(),
            Some("zookeeper-k8s-2.zookeeper-k8s-endpoints")
        );
        assert!(CredentialState::read(&bag).unwrap().is_complete());
    }

    #[test]
    fn test_init_twice_fails() {
        let (_dir, path) = initialised(1);
        let err = init(&path, 1, &OperatorConfig::default()).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::AlreadyInitialized);
    }

    #[test]
    fn test_init_rejects_zero_units() {
        let dir = tempfile::tempdir().unwrap();
        let err = init(&dir.path().join("s.json"), 0, &OperatorConfig::default()).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::InvalidArgument);
    }

    #[test]
    fn test_status_of_fresh_snapshot() {
        let (_dir, path) = initialised(2);
        let data = status(&path).unwrap();

        assert_eq!(data["leader"], 0);
        assert_eq!(data["encryption"]["quorum_mode"], "non-ssl");
        assert_eq!(data["rotation"]["in_progress"], false);
        assert_eq!(data["units"][1]["membership"], "absent");
        assert_eq!(data["units"][1]["myid"], 2);
    }

    #[test]
    fn test_quorum_names_lowest_unit_next() {
        let (_dir, path) = initialised(3);
        let data = quorum(&path).unwrap();

        assert_eq!(data["servers"], json!([]));
        assert_eq!(data["next_unit_to_start"], 0);
    }

    #[test]
    fn test_set_password_opens_rotation() {
        let (_dir, path) = initialised(3);

        let data = set_password(&path, "super", Some("n3w-secret".to_string()), None).unwrap();
        assert_eq!(data["rotation_epoch"], 1);

        let read = get_password(&path, "super").unwrap();
        assert_eq!(read["password"], "n3w-secret");
        let status = status(&path).unwrap();
        assert_eq!(status["rotation"]["in_progress"], true);
    }

    #[test]
    fn test_set_password_from_non_leader_is_rejected() {
        let (_dir, path) = initialised(3);
        let before = load_state(&path).unwrap();

        let err = set_password(&path, "super", None, Some("zookeeper-k8s/1")).unwrap_err();

        assert_eq!(err.code(), CliErrorCode::RotationRejected);
        assert!(err.message().contains("NOT_LEADER"));
        assert_eq!(load_state(&path).unwrap(), before);
    }

    #[test]
    fn test_second_rotation_waits_for_first() {
        let (_dir, path) = initialised(3);
        set_password(&path, "sync", None, None).unwrap();

        let err = set_password(&path, "super", None, None).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::RotationRejected);
    }

    #[test]
    fn test_get_password_unknown_user() {
        let (_dir, path) = initialised(1);
        let err = get_password(&path, "root").unwrap_err();
        assert_eq!(err.code(), CliErrorCode::InvalidArgument);
    }

    #[test]
    fn test_pre_upgrade_check_on_fresh_snapshot_fails() {
        let (_dir, path) = initialised(3);

        let err = pre_upgrade_check(&path).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::ClusterNotReady);
        assert!(err.message().contains("not all units started"));
    }

    #[test]
    fn test_pre_upgrade_check_on_settled_snapshot_passes() {
        let (_dir, path) = initialised(2);
        let mut bag = load_state(&path).unwrap();
        for ordinal in 0..2 {
            let unit = UnitId(ordinal);
            bag.set(Scope::Unit(unit), keys::STATE, keys::STARTED);
            bag.set(Scope::App, &keys::membership(unit), keys::ADDED);
        }
        save_state(&path, &bag).unwrap();

        let data = pre_upgrade_check(&path).unwrap();
        assert_eq!(data["ready"], true);

        set_password(&path, "super", None, None).unwrap();
        let err = pre_upgrade_check(&path).unwrap_err();
        assert!(err.message().contains("password rotation in progress"));
    }
}
