//! # Credential Rotation Coordinator
//!
//! Cluster-wide password rotation as a lock-guarded rolling restart.
//!
//! - The leader publishes the new password and opens a rotation epoch
//! - Each started unit restarts once under the restart lock, then stamps
//!   `password-rotated` with the epoch
//! - The leader closes the rotation when every started unit is stamped
//!
//! Closing the rotation is a single application write; stamps from a closed
//! epoch no longer count and are deleted by their owners.

use std::collections::BTreeMap;

use super::errors::{RotationError, RotationResult};
use super::password::{constant_time_str_eq, generate_password, is_system_user, SYSTEM_USERS};
use crate::observability::{log_event_with_fields, Event};
use crate::state::{keys, read_epoch, read_flag, write_flag, Scope, SharedState, UnitId};

const CLIENT_PASSWORD_PREFIX: &str = "relation-";

/// Application-scoped credential state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialState {
    system: BTreeMap<&'static str, String>,
    clients: Vec<String>,
    pub rotation_in_progress: bool,
    pub epoch: u64,
}

impl CredentialState {
    pub fn read(state: &dyn SharedState) -> RotationResult<Self> {
        let mut system = BTreeMap::new();
        for user in SYSTEM_USERS {
            if let Some(password) = state.get(Scope::App, &keys::password(user)) {
                system.insert(user, password);
            }
        }

        let clients = state
            .keys(Scope::App)
            .into_iter()
            .filter(|k| k.starts_with(CLIENT_PASSWORD_PREFIX))
            .filter_map(|k| state.get(Scope::App, &k))
            .collect();

        Ok(Self {
            system,
            clients,
            rotation_in_progress: read_flag(state, Scope::App, keys::ROTATION_IN_PROGRESS)?,
            epoch: read_epoch(state, Scope::App, keys::ROTATION_EPOCH)?.unwrap_or(0),
        })
    }

    /// Password of a system user.
    pub fn password(&self, username: &str) -> Option<&str> {
        self.system.get(username).map(String::as_str)
    }

    /// Every system user has a password.
    pub fn is_complete(&self) -> bool {
        SYSTEM_USERS.iter().all(|u| self.system.contains_key(u))
    }

    /// Compared in constant time against every active password.
    pub fn is_active(&self, candidate: &str) -> bool {
        // No short-circuit
        self.system
            .values()
            .chain(self.clients.iter())
            .fold(false, |found, active| found | constant_time_str_eq(active, candidate))
    }
}

/// Password supplied to a rotation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewPassword {
    Given(String),
    Generate,
}

/// Accepted rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationGrant {
    pub username: String,
    pub password: String,
    pub epoch: u64,
}

/// A unit's own rotation stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSelfView {
    pub unit: UnitId,
    pub rotated: Option<u64>,
}

impl RotationSelfView {
    pub fn read(state: &dyn SharedState, unit: UnitId) -> RotationResult<Self> {
        Ok(Self {
            unit,
            rotated: read_epoch(state, Scope::Unit(unit), keys::PASSWORD_ROTATED)?,
        })
    }

    /// Restarted for the open rotation.
    pub fn is_rotated(&self, credentials: &CredentialState) -> bool {
        credentials.rotation_in_progress && self.rotated == Some(credentials.epoch)
    }
}

/// Unit-side decision for one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationStep {
    pub should_restart: bool,
    /// Writes to the unit's own scope.
    pub unit_writes: Vec<(&'static str, String)>,
}

impl RotationStep {
    pub fn apply(&self, state: &mut dyn SharedState, unit: UnitId) {
        for (key, value) in &self.unit_writes {
            state.set(Scope::Unit(unit), key, value);
        }
    }
}

/// Leader decision closing a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationDelta {
    pub completed_epoch: u64,
}

impl RotationDelta {
    pub fn apply(&self, state: &mut dyn SharedState) {
        write_flag(state, Scope::App, keys::ROTATION_IN_PROGRESS, false);
        log_event_with_fields(
            Event::RotationComplete,
            &[("epoch", &self.completed_epoch.to_string())],
        );
    }
}

pub struct CredentialCoordinator;

impl CredentialCoordinator {
    /// Seed missing system passwords. Leader only; returns the users seeded.
    pub fn ensure_credentials(
        state: &mut dyn SharedState,
        leader: bool,
    ) -> RotationResult<Vec<&'static str>> {
        if !leader {
            return Ok(Vec::new());
        }

        let current = CredentialState::read(state)?;
        let mut created = Vec::new();
        for user in SYSTEM_USERS {
            if current.password(user).is_none() {
                state.set(Scope::App, &keys::password(user), &generate_password());
                log_event_with_fields(Event::CredentialsCreated, &[("username", user)]);
                created.push(user);
            }
        }
        Ok(created)
    }

    /// Publish a new password for a system user and open a rotation.
    ///
    /// Nothing is written unless the request is accepted.
    pub fn request_rotation(
        state: &mut dyn SharedState,
        username: &str,
        new_password: NewPassword,
        leader: bool,
    ) -> RotationResult<RotationGrant> {
        let result = Self::validate_request(state, username, new_password, leader);
        let password = match result {
            Ok(password) => password,
            Err(err) => {
                log_event_with_fields(
                    Event::RotationRejected,
                    &[("reason", err.code()), ("username", username)],
                );
                return Err(err);
            }
        };

        let current = CredentialState::read(state)?;
        let epoch = current.epoch + 1;
        state.set(Scope::App, &keys::password(username), &password);
        state.set(Scope::App, keys::ROTATION_EPOCH, &epoch.to_string());
        write_flag(state, Scope::App, keys::ROTATION_IN_PROGRESS, true);

        log_event_with_fields(
            Event::RotationRequested,
            &[("epoch", &epoch.to_string()), ("username", username)],
        );

        Ok(RotationGrant {
            username: username.to_string(),
            password,
            epoch,
        })
    }

    fn validate_request(
        state: &dyn SharedState,
        username: &str,
        new_password: NewPassword,
        leader: bool,
    ) -> RotationResult<String> {
        if !leader {
            return Err(RotationError::NotLeader);
        }
        if !is_system_user(username) {
            return Err(RotationError::UnknownUser(username.to_string()));
        }

        let current = CredentialState::read(state)?;
        if current.rotation_in_progress {
            return Err(RotationError::AlreadyInProgress);
        }

        let password = match new_password {
            NewPassword::Given(password) => password,
            NewPassword::Generate => generate_password(),
        };
        if password.is_empty() {
            return Err(RotationError::EmptyPassword);
        }
        if current.is_active(&password) {
            return Err(RotationError::RejectedIdentical {
                username: username.to_string(),
            });
        }
        Ok(password)
    }

    /// Unit side: restart for an open rotation, drop stamps of a closed one.
    pub fn step(credentials: &CredentialState, view: &RotationSelfView) -> RotationStep {
        if credentials.rotation_in_progress {
            return RotationStep {
                should_restart: !view.is_rotated(credentials),
                unit_writes: Vec::new(),
            };
        }

        let unit_writes = match view.rotated {
            Some(_) => vec![(keys::PASSWORD_ROTATED, String::new())],
            None => Vec::new(),
        };
        RotationStep {
            should_restart: false,
            unit_writes,
        }
    }

    /// Stamp the unit after it restarted under the open rotation.
    pub fn acknowledge_restart(
        credentials: &CredentialState,
        state: &mut dyn SharedState,
        unit: UnitId,
    ) {
        if credentials.rotation_in_progress {
            state.set(
                Scope::Unit(unit),
                keys::PASSWORD_ROTATED,
                &credentials.epoch.to_string(),
            );
        }
    }

    /// Leader side: close the rotation once every started unit is stamped.
    pub fn leader_step(
        credentials: &CredentialState,
        started: &[RotationSelfView],
        leader: bool,
    ) -> Option<RotationDelta> {
        let closed = leader
            && credentials.rotation_in_progress
            && started.iter().all(|u| u.is_rotated(credentials));

        closed.then_some(RotationDelta {
            completed_epoch: credentials.epoch,
        })
    }
}
