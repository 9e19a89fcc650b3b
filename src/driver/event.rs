//! Lifecycle signals delivered by the host runtime.

use crate::clients::ClientRelation;
use crate::state::UnitId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The workload container accepts commands
    ContainerReady,
    ConfigChanged,
    /// Peer relation data changed or a peer joined
    PeerChanged,
    /// A peer is leaving the relation
    PeerDeparted { unit: UnitId },
    LeaderElected,
    /// Periodic status check
    UpdateStatus,
    TlsRelationCreated,
    TlsRelationBroken,
    /// Current set of related client applications
    ClientsChanged { relations: Vec<ClientRelation> },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::ContainerReady => "container-ready",
            LifecycleEvent::ConfigChanged => "config-changed",
            LifecycleEvent::PeerChanged => "peer-changed",
            LifecycleEvent::PeerDeparted { .. } => "peer-departed",
            LifecycleEvent::LeaderElected => "leader-elected",
            LifecycleEvent::UpdateStatus => "update-status",
            LifecycleEvent::TlsRelationCreated => "tls-relation-created",
            LifecycleEvent::TlsRelationBroken => "tls-relation-broken",
            LifecycleEvent::ClientsChanged { .. } => "clients-changed",
        }
    }

    /// Unit leaving the peer relation, if this is a departure.
    pub fn departing(&self) -> Option<UnitId> {
        match self {
            LifecycleEvent::PeerDeparted { unit } => Some(*unit),
            _ => None,
        }
    }
}
