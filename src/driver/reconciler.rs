//! Reconciliation Driver
//!
//! Fixed-order orchestration per lifecycle signal:
//! 1. Unreachable container: report waiting and defer, nothing else.
//!    Invalid configuration: report blocked, nothing else
//! 2. Entry events (TLS relation, client relations), credential seeding
//! 3. Register this unit, then start the workload when it is its turn
//! 4. Quorum reconciliation (leader-only effect)
//! 5. Encryption step (leader-only effect)
//! 6. Rotation step (leader-only effect)
//! 7. Restart lock arbitration, then a locked restart if one is warranted
//! 8. Status, recomputed from scratch
//!
//! Every step re-reads the peer document it depends on.

use super::errors::DriverResult;
use super::event::LifecycleEvent;
use super::status::{Status, StatusContext};
use super::workload::{ServerConfig, Workload};
use crate::clients::{self, ClientPublication, ClientRelation};
use crate::config::OperatorConfig;
use crate::credentials::{
    CredentialCoordinator, CredentialState, RotationResult, RotationSelfView,
};
use crate::encryption::{
    EncryptionCoordinator, EncryptionResult, EncryptionState, UnitEncryptionAction,
    UnitEncryptionView,
};
use crate::observability::{log_event_with_fields, Event};
use crate::quorum::{QuorumConfig, QuorumDelta, QuorumManager};
use crate::restart::RollingRestart;
use crate::state::{keys, PeerSnapshot, Scope, SharedState, UnitId};

/// What one reconciliation did and what the unit now reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub status: Status,
    /// The host should re-deliver a signal later.
    pub deferred: bool,
    /// The workload was started in this pass.
    pub started: bool,
    /// The workload was restarted in this pass.
    pub restarted: bool,
    pub quorum_delta: QuorumDelta,
    pub next_unit_to_start: Option<UnitId>,
    pub publications: Vec<ClientPublication>,
}

impl ReconcileReport {
    fn new(status: Status) -> Self {
        Self {
            status,
            deferred: false,
            started: false,
            restarted: false,
            quorum_delta: QuorumDelta::default(),
            next_unit_to_start: None,
            publications: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestartOutcome {
    NotNeeded,
    WaitingForLock,
    Failed,
    Restarted,
}

/// Drives one unit of the ensemble.
pub struct ReconciliationDriver<W: Workload> {
    unit: UnitId,
    host: String,
    config: OperatorConfig,
    workload: W,
    clients: Vec<ClientRelation>,
}

impl<W: Workload> ReconciliationDriver<W> {
    pub fn new(unit: UnitId, host: impl Into<String>, config: OperatorConfig, workload: W) -> Self {
        Self {
            unit,
            host: host.into(),
            config,
            workload,
            clients: Vec::new(),
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn workload(&self) -> &W {
        &self.workload
    }

    pub fn workload_mut(&mut self) -> &mut W {
        &mut self.workload
    }

    /// Handle one lifecycle signal to completion.
    pub fn handle(
        &mut self,
        state: &mut dyn SharedState,
        leader: bool,
        event: LifecycleEvent,
    ) -> DriverResult<ReconcileReport> {
        let unit_field = self.unit.to_string();
        log_event_with_fields(
            Event::ReconcileBegin,
            &[("event", event.name()), ("unit", &unit_field)],
        );

        if !self.workload.can_connect() {
            let mut report = ReconcileReport::new(Status::CONTAINER_NOT_REACHABLE);
            report.deferred = true;
            self.log_deferred(event.name(), "container not reachable");
            return Ok(report);
        }

        if let Err(err) = self.config.validate() {
            let reason = err.to_string();
            log_event_with_fields(
                Event::ConfigInvalid,
                &[("reason", &reason), ("unit", &unit_field)],
            );
            return Ok(ReconcileReport::new(Status::INVALID_CONFIG));
        }

        match &event {
            LifecycleEvent::TlsRelationCreated | LifecycleEvent::TlsRelationBroken => {
                let tls_present = matches!(event, LifecycleEvent::TlsRelationCreated);
                let encryption = EncryptionState::read(state)?;
                let delta = EncryptionCoordinator::begin(&encryption, tls_present, leader)?;
                EncryptionCoordinator::apply(&delta, state);
            }
            LifecycleEvent::ClientsChanged { relations } => {
                self.clients = relations.clone();
            }
            _ => {}
        }

        CredentialCoordinator::ensure_credentials(state, leader)?;

        let departing = event.departing();
        let self_departing = departing == Some(self.unit);
        if !self_departing {
            self.register(state);
        }

        let mut report = ReconcileReport::new(Status::ACTIVE);
        let manager = QuorumManager::new(self.unit);
        let mut snapshot = PeerSnapshot::read(state, departing)?;

        // Local start, gated on turn
        let own_started = snapshot
            .record(self.unit)
            .map_or(false, |r| r.is_started());
        if !self_departing && !own_started {
            let credentials = CredentialState::read(state)?;
            match manager.check_turn(&snapshot, credentials.is_complete()) {
                Err(err) => {
                    report.deferred = true;
                    self.log_deferred(event.name(), &err.message);
                }
                Ok(()) => {
                    if self.start_workload(state, &snapshot, &credentials)? {
                        report.started = true;
                        snapshot = PeerSnapshot::read(state, departing)?;
                    } else {
                        report.deferred = true;
                    }
                }
            }
        }

        // Quorum membership
        let outcome = manager.reconcile(&snapshot, leader);
        if !outcome.delta.is_empty() {
            manager.apply(&outcome.delta, state);
            snapshot = PeerSnapshot::read(state, departing)?;
        }
        report.quorum_delta = outcome.delta;
        report.next_unit_to_start = outcome.next_unit_to_start;

        // Encryption
        let encryption = EncryptionState::read(state)?;
        let views = encryption_views(state, &snapshot)?;
        let delta = EncryptionCoordinator::step(&encryption, &views, leader)?;
        EncryptionCoordinator::apply(&delta, state);
        let encryption = EncryptionState::read(state)?;

        // Rotation
        let credentials = CredentialState::read(state)?;
        let views = rotation_views(state, &snapshot)?;
        if let Some(delta) = CredentialCoordinator::leader_step(&credentials, &views, leader) {
            delta.apply(state);
        }
        let credentials = CredentialState::read(state)?;

        // Client relations
        if leader {
            clients::sync_client_credentials(state, &self.clients, leader);
            let quorum = QuorumConfig::derive(&snapshot);
            report.publications = self
                .clients
                .iter()
                .filter_map(|relation| {
                    clients::publication(
                        state,
                        relation,
                        &quorum,
                        encryption.tls,
                        self.config.secure_client_port,
                    )
                })
                .collect();
        }

        // Rolling restart
        RollingRestart::arbitrate(state, leader)?;
        let own_started = snapshot
            .record(self.unit)
            .map_or(false, |r| r.is_started());
        if own_started && !report.started {
            match self.restart_if_needed(state, leader, &snapshot, &encryption, &credentials)? {
                RestartOutcome::Restarted => report.restarted = true,
                RestartOutcome::WaitingForLock => {
                    report.deferred = true;
                    self.log_deferred(event.name(), "waiting for restart lock");
                }
                RestartOutcome::Failed => report.deferred = true,
                RestartOutcome::NotNeeded => {}
            }
        }

        report.status = Status::evaluate(&StatusContext {
            container_reachable: true,
            departing: self_departing,
            credentials_ready: credentials.is_complete(),
            all_registered: snapshot.all_registered(),
            started: own_started,
            alive: self.workload.alive(),
            healthy: self.workload.healthy(),
            quorum_stale: snapshot.stale().next().is_some(),
            migrating: encryption.migration_in_progress,
            rotating: credentials.rotation_in_progress,
        });

        let status = report.status.to_string();
        log_event_with_fields(
            Event::StatusUpdated,
            &[("status", &status), ("unit", &unit_field)],
        );
        log_event_with_fields(
            Event::ReconcileComplete,
            &[("event", event.name()), ("unit", &unit_field)],
        );
        Ok(report)
    }

    /// Publish host and ports in this unit's own scope.
    fn register(&self, state: &mut dyn SharedState) {
        let scope = Scope::Unit(self.unit);
        if state.get(scope, keys::HOST).as_deref() == Some(self.host.as_str()) {
            return;
        }
        state.set(scope, keys::HOST, &self.host);
        state.set(scope, keys::CLIENT_PORT, &self.config.client_port.to_string());
        state.set(scope, keys::SERVER_PORT, &self.config.server_port.to_string());
        state.set(scope, keys::ELECTION_PORT, &self.config.election_port.to_string());
        log_event_with_fields(
            Event::UnitRegistered,
            &[("host", &self.host), ("unit", &self.unit.to_string())],
        );
    }

    fn server_config(
        &self,
        snapshot: &PeerSnapshot,
        encryption: &EncryptionState,
    ) -> Option<ServerConfig> {
        let servers = QuorumConfig::derive(snapshot)
            .startup_servers(snapshot, self.unit)
            .ok()?;
        Some(ServerConfig::build(
            &self.config,
            self.unit,
            encryption.tls,
            encryption.mode,
            servers,
        ))
    }

    /// Start the workload and mark the unit started. `false` when it did not
    /// come up.
    fn start_workload(
        &mut self,
        state: &mut dyn SharedState,
        snapshot: &PeerSnapshot,
        credentials: &CredentialState,
    ) -> DriverResult<bool> {
        let encryption = EncryptionState::read(state)?;
        let Some(server_config) = self.server_config(snapshot, &encryption) else {
            return Ok(false);
        };

        let unit_field = self.unit.to_string();
        if let Err(err) = self.workload.start(&server_config) {
            let reason = err.to_string();
            log_event_with_fields(
                Event::WorkloadStartFailed,
                &[("reason", &reason), ("unit", &unit_field)],
            );
            return Ok(false);
        }
        if !self.workload.alive() {
            log_event_with_fields(
                Event::WorkloadStartFailed,
                &[("reason", "not alive after start"), ("unit", &unit_field)],
            );
            return Ok(false);
        }

        let scope = Scope::Unit(self.unit);
        state.set(scope, keys::STATE, keys::STARTED);
        state.set(scope, keys::CONFIG_FINGERPRINT, &server_config.fingerprint());
        UnitEncryptionAction::current(&encryption).record(state, self.unit);
        CredentialCoordinator::acknowledge_restart(credentials, state, self.unit);

        log_event_with_fields(
            Event::UnitStarted,
            &[("mode", encryption.mode.as_str()), ("unit", &unit_field)],
        );
        Ok(true)
    }

    fn restart_if_needed(
        &mut self,
        state: &mut dyn SharedState,
        leader: bool,
        snapshot: &PeerSnapshot,
        encryption: &EncryptionState,
        credentials: &CredentialState,
    ) -> DriverResult<RestartOutcome> {
        let encryption_view = UnitEncryptionView::read(state, self.unit)?;
        let encryption_action = EncryptionCoordinator::unit_action(encryption, &encryption_view);

        let rotation_view = RotationSelfView::read(state, self.unit)?;
        let rotation = CredentialCoordinator::step(credentials, &rotation_view);
        rotation.apply(state, self.unit);

        let Some(server_config) = self.server_config(snapshot, encryption) else {
            return Ok(RestartOutcome::NotNeeded);
        };
        let fingerprint = server_config.fingerprint();
        let config_changed = state
            .get(Scope::Unit(self.unit), keys::CONFIG_FINGERPRINT)
            .as_deref()
            != Some(fingerprint.as_str());

        let lock = RollingRestart::new(self.unit);
        if encryption_action.is_none() && !rotation.should_restart && !config_changed {
            lock.release(state);
            return Ok(RestartOutcome::NotNeeded);
        }

        lock.request(state);
        RollingRestart::arbitrate(state, leader)?;
        if !lock.is_granted(state)? {
            return Ok(RestartOutcome::WaitingForLock);
        }

        let unit_field = self.unit.to_string();
        if let Err(err) = self.workload.restart(&server_config) {
            let reason = err.to_string();
            log_event_with_fields(
                Event::WorkloadStartFailed,
                &[("reason", &reason), ("unit", &unit_field)],
            );
            lock.release(state);
            return Ok(RestartOutcome::Failed);
        }

        UnitEncryptionAction::current(encryption).record(state, self.unit);
        CredentialCoordinator::acknowledge_restart(credentials, state, self.unit);
        state.set(Scope::Unit(self.unit), keys::CONFIG_FINGERPRINT, &fingerprint);
        log_event_with_fields(
            Event::WorkloadRestarted,
            &[("mode", encryption.mode.as_str()), ("unit", &unit_field)],
        );

        lock.release(state);
        RollingRestart::arbitrate(state, leader)?;
        Ok(RestartOutcome::Restarted)
    }

    fn log_deferred(&self, event: &str, reason: &str) {
        log_event_with_fields(
            Event::EventDeferred,
            &[
                ("event", event),
                ("reason", reason),
                ("unit", &self.unit.to_string()),
            ],
        );
    }
}

fn encryption_views(
    state: &dyn SharedState,
    snapshot: &PeerSnapshot,
) -> EncryptionResult<Vec<UnitEncryptionView>> {
    snapshot
        .started()
        .map(|r| UnitEncryptionView::read(state, r.unit_id))
        .collect()
}

fn rotation_views(
    state: &dyn SharedState,
    snapshot: &PeerSnapshot,
) -> RotationResult<Vec<RotationSelfView>> {
    snapshot
        .started()
        .map(|r| RotationSelfView::read(state, r.unit_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{StatusLevel, WorkloadError};
    use crate::state::MemoryDatabag;

    #[derive(Default)]
    struct FakeWorkload {
        unreachable: bool,
        running: bool,
        starts: u32,
        restarts: u32,
    }

    impl Workload for FakeWorkload {
        fn can_connect(&self) -> bool {
            !self.unreachable
        }

        fn start(&mut self, _config: &ServerConfig) -> Result<(), WorkloadError> {
            self.running = true;
            self.starts += 1;
            Ok(())
        }

        fn restart(&mut self, _config: &ServerConfig) -> Result<(), WorkloadError> {
            self.restarts += 1;
            Ok(())
        }

        fn alive(&self) -> bool {
            self.running
        }

        fn healthy(&self) -> bool {
            self.running
        }
    }

    fn driver(unit: u32, config: OperatorConfig) -> ReconciliationDriver<FakeWorkload> {
        ReconciliationDriver::new(
            UnitId(unit),
            format!("zk-{}", unit),
            config,
            FakeWorkload::default(),
        )
    }

    fn single_unit() -> MemoryDatabag {
        let mut bag = MemoryDatabag::new();
        bag.join(UnitId(0));
        bag.elect(UnitId(0));
        bag
    }

    #[test]
    fn test_unreachable_container_defers_without_writes() {
        let mut bag = single_unit();
        let mut d = driver(0, OperatorConfig::default());
        d.workload_mut().unreachable = true;

        let report = d.handle(&mut bag, true, LifecycleEvent::ContainerReady).unwrap();

        assert!(report.deferred);
        assert_eq!(report.status, Status::CONTAINER_NOT_REACHABLE);
        assert!(bag.keys(Scope::App).is_empty());
    }

    #[test]
    fn test_invalid_config_blocks_without_writes() {
        let mut bag = single_unit();
        let config = OperatorConfig {
            tick_time: 0,
            ..OperatorConfig::default()
        };
        let mut d = driver(0, config);

        let report = d.handle(&mut bag, true, LifecycleEvent::ConfigChanged).unwrap();

        assert_eq!(report.status, Status::INVALID_CONFIG);
        assert_eq!(report.status.level, StatusLevel::Blocked);
        assert!(!report.started);
        assert_eq!(d.workload().starts, 0);
        assert!(bag.keys(Scope::App).is_empty());
        assert!(bag.keys(Scope::Unit(UnitId(0))).is_empty());
    }

    #[test]
    fn test_single_leader_bootstraps_in_one_pass() {
        let mut bag = single_unit();
        let mut d = driver(0, OperatorConfig::default());

        let report = d.handle(&mut bag, true, LifecycleEvent::LeaderElected).unwrap();

        assert!(report.started);
        assert!(!report.deferred);
        assert_eq!(report.quorum_delta.added, vec![UnitId(0)]);
        assert_eq!(report.status.level, StatusLevel::Active);
        assert_eq!(bag.get(Scope::App, "0").as_deref(), Some("added"));
        assert_eq!(bag.get(Scope::Unit(UnitId(0)), keys::STATE).as_deref(), Some("started"));
    }

    #[test]
    fn test_non_leader_waits_for_credentials() {
        let mut bag = MemoryDatabag::new();
        bag.join(UnitId(0));
        bag.join(UnitId(1));
        let mut d = driver(1, OperatorConfig::default());

        let report = d.handle(&mut bag, false, LifecycleEvent::PeerChanged).unwrap();

        assert!(report.deferred);
        assert!(!report.started);
        assert_eq!(report.status, Status::NO_CREDENTIALS);
        assert_eq!(d.workload().starts, 0);
    }

    #[test]
    fn test_config_change_restarts_under_lock() {
        let mut bag = single_unit();
        let mut first = driver(0, OperatorConfig::default());
        first.handle(&mut bag, true, LifecycleEvent::LeaderElected).unwrap();

        let changed = OperatorConfig {
            tick_time: 3000,
            ..OperatorConfig::default()
        };
        let mut second = driver(0, changed);
        second.workload_mut().running = true;

        let report = second.handle(&mut bag, true, LifecycleEvent::ConfigChanged).unwrap();

        assert!(report.restarted);
        assert_eq!(second.workload().restarts, 1);
        assert_eq!(bag.get(Scope::Unit(UnitId(0)), keys::RESTART_REQUEST), None);

        let report = second.handle(&mut bag, true, LifecycleEvent::UpdateStatus).unwrap();
        assert!(!report.restarted);
    }

    #[test]
    fn test_departing_self_reports_departing() {
        let mut bag = single_unit();
        let mut d = driver(0, OperatorConfig::default());
        d.handle(&mut bag, true, LifecycleEvent::LeaderElected).unwrap();

        let report = d
            .handle(&mut bag, true, LifecycleEvent::PeerDeparted { unit: UnitId(0) })
            .unwrap();

        assert_eq!(report.status, Status::DEPARTING);
        assert!(report.quorum_delta.removed.is_empty());
        assert_eq!(bag.get(Scope::App, "0").as_deref(), Some("added"));
    }
}
