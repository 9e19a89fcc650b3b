//! Client Relations
//!
//! Credentials and connection data handed to applications related to the
//! ensemble. Each relation gets its own `relation-<id>` user, scoped to the
//! chroot the application asked for.
//!
//! Client passwords live in application scope and are therefore leader-written.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::credentials::generate_password;
use crate::observability::{log_event_with_fields, Event};
use crate::quorum::QuorumConfig;
use crate::state::{keys, Scope, SharedState};

pub const DEFAULT_CHROOT_ACL: &str = "cdrwa";

const RELATION_KEY_PREFIX: &str = "relation-";

/// A related client application as requested by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientRelation {
    pub id: u32,
    #[serde(default)]
    pub chroot: Option<String>,
    #[serde(default)]
    pub chroot_acl: Option<String>,
}

/// Server-side user for one client relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    pub chroot: String,
    pub acl: String,
}

/// Connection data published to one client relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientPublication {
    pub relation_id: u32,
    pub username: String,
    pub password: String,
    pub chroot: String,
    pub endpoints: String,
    pub uris: String,
    pub tls: &'static str,
}

/// Outcome of a credential sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSync {
    pub created: Vec<u32>,
    pub removed: Vec<u32>,
}

/// Create passwords for new relations and drop those of departed ones.
/// Leader only.
pub fn sync_client_credentials(
    state: &mut dyn SharedState,
    relations: &[ClientRelation],
    leader: bool,
) -> ClientSync {
    let mut sync = ClientSync::default();
    if !leader {
        return sync;
    }

    let wanted: BTreeSet<u32> = relations.iter().map(|r| r.id).collect();
    for id in &wanted {
        let key = keys::client_password(*id);
        if state.get(Scope::App, &key).is_none() {
            state.set(Scope::App, &key, &generate_password());
            log_event_with_fields(Event::ClientCredentialsCreated, &[("relation", &key)]);
            sync.created.push(*id);
        }
    }

    for key in state.keys(Scope::App) {
        let Some(id) = key
            .strip_prefix(RELATION_KEY_PREFIX)
            .and_then(|raw| raw.parse::<u32>().ok())
        else {
            continue;
        };
        if !wanted.contains(&id) {
            state.set(Scope::App, &key, "");
            log_event_with_fields(Event::ClientCredentialsRemoved, &[("relation", &key)]);
            sync.removed.push(id);
        }
    }

    sync
}

fn normalise_chroot(chroot: &str) -> String {
    if chroot.starts_with('/') {
        chroot.to_string()
    } else {
        format!("/{}", chroot)
    }
}

/// Server-side user for a relation. `None` until the relation names a chroot
/// and its password exists.
pub fn client_config(state: &dyn SharedState, relation: &ClientRelation) -> Option<ClientConfig> {
    let chroot = relation.chroot.as_deref().filter(|c| !c.is_empty())?;
    let username = keys::client_password(relation.id);
    let password = state.get(Scope::App, &username)?;

    Some(ClientConfig {
        password,
        chroot: normalise_chroot(chroot),
        acl: relation
            .chroot_acl
            .clone()
            .unwrap_or_else(|| DEFAULT_CHROOT_ACL.to_string()),
        username,
    })
}

/// Connection data for a relation, built from the live quorum.
///
/// With TLS on, every endpoint uses `secure_client_port`.
pub fn publication(
    state: &dyn SharedState,
    relation: &ClientRelation,
    quorum: &QuorumConfig,
    tls: bool,
    secure_client_port: u16,
) -> Option<ClientPublication> {
    let config = client_config(state, relation)?;
    if quorum.is_empty() {
        return None;
    }

    let port = tls.then_some(secure_client_port);
    let endpoints = quorum.endpoints(port).join(",");
    let uris = format!("{}{}", endpoints, config.chroot);

    Some(ClientPublication {
        relation_id: relation.id,
        username: config.username,
        password: config.password,
        chroot: config.chroot,
        endpoints,
        uris,
        tls: if tls { "enabled" } else { "disabled" },
    })
}
