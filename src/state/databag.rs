//! Peer document abstraction and its in-memory implementation

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::records::UnitId;

/// Which part of the peer document a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// Application-wide data, leader-written.
    App,
    /// Data owned by one unit.
    Unit(UnitId),
}

/// Replicated key-value document provided by the host runtime.
///
/// Implementations are expected to be read fresh on every call.
pub trait SharedState {
    /// Get a value. Absent keys and empty values both read as `None`.
    fn get(&self, scope: Scope, key: &str) -> Option<String>;

    /// Set a value. An empty value deletes the key.
    fn set(&mut self, scope: Scope, key: &str, value: &str);

    /// Units currently present in the peer relation, this unit included.
    fn units(&self) -> BTreeSet<UnitId>;

    /// Keys with a value in the given scope.
    fn keys(&self, scope: Scope) -> BTreeSet<String>;
}

/// Leader election primitive of the host runtime.
pub trait Leadership {
    fn is_leader(&self, unit: UnitId) -> bool;
}

/// In-memory peer document.
///
/// Serialisable so that a whole ensemble's view can be kept as a JSON snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDatabag {
    #[serde(default)]
    app: BTreeMap<String, String>,
    #[serde(default)]
    units: BTreeMap<u32, BTreeMap<String, String>>,
    #[serde(default)]
    related: BTreeSet<u32>,
    #[serde(default)]
    leader: Option<u32>,
}

impl MemoryDatabag {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// A unit joins the peer relation.
    pub fn join(&mut self, unit: UnitId) {
        self.related.insert(unit.0);
        self.units.entry(unit.0).or_default();
    }

    /// A unit leaves the peer relation; its unit data goes with it.
    pub fn depart(&mut self, unit: UnitId) {
        self.related.remove(&unit.0);
        self.units.remove(&unit.0);
        if self.leader == Some(unit.0) {
            self.leader = None;
        }
    }

    /// Elect a leader.
    pub fn elect(&mut self, unit: UnitId) {
        self.leader = Some(unit.0);
    }

    /// Current leader, if any.
    pub fn leader(&self) -> Option<UnitId> {
        self.leader.map(UnitId)
    }

    /// Raw view of one scope, for inspection output.
    pub fn scope_data(&self, scope: Scope) -> BTreeMap<String, String> {
        match scope {
            Scope::App => self.app.clone(),
            Scope::Unit(unit) => self.units.get(&unit.0).cloned().unwrap_or_default(),
        }
    }
}

impl SharedState for MemoryDatabag {
    fn get(&self, scope: Scope, key: &str) -> Option<String> {
        let bag = match scope {
            Scope::App => Some(&self.app),
            Scope::Unit(unit) => self.units.get(&unit.0),
        };
        bag.and_then(|b| b.get(key))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn set(&mut self, scope: Scope, key: &str, value: &str) {
        let bag = match scope {
            Scope::App => &mut self.app,
            Scope::Unit(unit) => self.units.entry(unit.0).or_default(),
        };
        if value.is_empty() {
            bag.remove(key);
        } else {
            bag.insert(key.to_string(), value.to_string());
        }
    }

    fn units(&self) -> BTreeSet<UnitId> {
        self.related.iter().copied().map(UnitId).collect()
    }

    fn keys(&self, scope: Scope) -> BTreeSet<String> {
        self.scope_data(scope).into_keys().collect()
    }
}

impl Leadership for MemoryDatabag {
    fn is_leader(&self, unit: UnitId) -> bool {
        self.leader == Some(unit.0)
    }
}
