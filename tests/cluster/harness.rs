//! Cluster harness: drivers, fake workloads and signal delivery

#![allow(dead_code)]

use std::collections::BTreeMap;

use zookeeper_operator::config::OperatorConfig;
use zookeeper_operator::driver::{
    LifecycleEvent, ReconcileReport, ReconciliationDriver, ServerConfig, Workload, WorkloadError,
};
use zookeeper_operator::state::{Leadership, MemoryDatabag, PeerSnapshot, SharedState, UnitId};

/// Workload that records every start and restart.
#[derive(Debug, Default)]
pub struct FakeWorkload {
    pub unreachable: bool,
    pub unhealthy: bool,
    pub fail_start: bool,
    pub running: bool,
    pub starts: Vec<ServerConfig>,
    pub restarts: Vec<ServerConfig>,
}

impl FakeWorkload {
    /// Configuration the process is currently running with.
    pub fn current(&self) -> Option<&ServerConfig> {
        self.restarts.last().or_else(|| self.starts.last())
    }
}

impl Workload for FakeWorkload {
    fn can_connect(&self) -> bool {
        !self.unreachable
    }

    fn start(&mut self, config: &ServerConfig) -> Result<(), WorkloadError> {
        if self.fail_start {
            return Err(WorkloadError("zkServer.sh exited with 1".to_string()));
        }
        self.running = true;
        self.starts.push(config.clone());
        Ok(())
    }

    fn restart(&mut self, config: &ServerConfig) -> Result<(), WorkloadError> {
        self.running = true;
        self.restarts.push(config.clone());
        Ok(())
    }

    fn alive(&self) -> bool {
        self.running
    }

    fn healthy(&self) -> bool {
        self.running && !self.unhealthy
    }
}

/// A whole ensemble sharing one peer document.
pub struct Cluster {
    pub bag: MemoryDatabag,
    config: OperatorConfig,
    drivers: BTreeMap<u32, ReconciliationDriver<FakeWorkload>>,
}

impl Cluster {
    /// `units` joined units, unit 0 elected leader. Nothing has run yet.
    pub fn new(units: u32) -> Self {
        Self::with_config(units, OperatorConfig::default())
    }

    pub fn with_config(units: u32, config: OperatorConfig) -> Self {
        let mut cluster = Self {
            bag: MemoryDatabag::new(),
            config,
            drivers: BTreeMap::new(),
        };
        for ordinal in 0..units {
            cluster.add_unit(ordinal);
        }
        cluster.bag.elect(UnitId(0));
        cluster
    }

    /// `units` units bootstrapped to a settled quorum.
    pub fn settled(units: u32) -> Self {
        let mut cluster = Self::new(units);
        cluster.settle(20);
        cluster
    }

    pub fn add_unit(&mut self, ordinal: u32) {
        let unit = UnitId(ordinal);
        self.bag.join(unit);
        self.drivers.insert(
            ordinal,
            ReconciliationDriver::new(
                unit,
                format!("zookeeper-k8s-{}.zookeeper-k8s-endpoints", ordinal),
                self.config.clone(),
                FakeWorkload::default(),
            ),
        );
    }

    /// Remove a unit and deliver the departure to everyone left.
    ///
    /// A departed leader is replaced by the lowest remaining unit.
    pub fn remove_unit(&mut self, ordinal: u32) -> Vec<ReconcileReport> {
        let unit = UnitId(ordinal);
        self.bag.depart(unit);
        self.drivers.remove(&ordinal);

        if self.bag.leader().is_none() {
            if let Some(next) = self.drivers.keys().next().copied() {
                self.bag.elect(UnitId(next));
                self.handle(next, LifecycleEvent::LeaderElected);
            }
        }
        self.round(LifecycleEvent::PeerDeparted { unit })
    }

    pub fn leader(&self) -> Option<u32> {
        self.bag.leader().map(|u| u.0)
    }

    /// Deliver one signal to one unit.
    pub fn handle(&mut self, ordinal: u32, event: LifecycleEvent) -> ReconcileReport {
        let leader = self.bag.is_leader(UnitId(ordinal));
        let driver = self
            .drivers
            .get_mut(&ordinal)
            .unwrap_or_else(|| panic!("no unit {}", ordinal));
        driver
            .handle(&mut self.bag, leader, event)
            .unwrap_or_else(|e| panic!("unit {} failed: {}", ordinal, e))
    }

    /// Deliver one signal to every unit, leader first.
    pub fn round(&mut self, event: LifecycleEvent) -> Vec<ReconcileReport> {
        let mut order: Vec<u32> = self.drivers.keys().copied().collect();
        if let Some(leader) = self.leader() {
            order.retain(|u| *u != leader);
            order.insert(0, leader);
        }
        order
            .into_iter()
            .map(|ordinal| self.handle(ordinal, event.clone()))
            .collect()
    }

    /// Run update-status rounds until the peer document stops changing.
    ///
    /// Returns the number of rounds that changed something.
    pub fn settle(&mut self, max_rounds: usize) -> usize {
        for round in 0..max_rounds {
            let before = self.bag.clone();
            self.round(LifecycleEvent::UpdateStatus);
            if self.bag == before {
                return round;
            }
        }
        panic!("cluster did not settle within {} rounds", max_rounds);
    }

    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot::read(&self.bag, None).expect("peer document readable")
    }

    pub fn workload(&self, ordinal: u32) -> &FakeWorkload {
        self.drivers[&ordinal].workload()
    }

    pub fn workload_mut(&mut self, ordinal: u32) -> &mut FakeWorkload {
        self.drivers
            .get_mut(&ordinal)
            .unwrap_or_else(|| panic!("no unit {}", ordinal))
            .workload_mut()
    }

    /// App-scoped value.
    pub fn app(&self, key: &str) -> Option<String> {
        self.bag.get(zookeeper_operator::state::Scope::App, key)
    }

    /// Unit-scoped value.
    pub fn unit(&self, ordinal: u32, key: &str) -> Option<String> {
        self.bag
            .get(zookeeper_operator::state::Scope::Unit(UnitId(ordinal)), key)
    }
}
