//! Workload collaborator and the configuration it is started with.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::errors::WorkloadError;
use crate::config::OperatorConfig;
use crate::encryption::QuorumMode;
use crate::state::UnitId;

/// Supervisor of the local ZooKeeper process.
pub trait Workload {
    /// The container accepts commands.
    fn can_connect(&self) -> bool;

    fn start(&mut self, config: &ServerConfig) -> Result<(), WorkloadError>;

    fn restart(&mut self, config: &ServerConfig) -> Result<(), WorkloadError>;

    /// The process is running.
    fn alive(&self) -> bool;

    /// The process answers health checks.
    fn healthy(&self) -> bool;
}

/// Everything the external renderer needs to write the server's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub myid: u32,
    pub tick_time: u32,
    pub init_limit: u32,
    pub sync_limit: u32,
    pub client_port: u16,
    /// Set while TLS is enabled.
    pub secure_client_port: Option<u16>,
    pub quorum_mode: &'static str,
    pub ssl_quorum: bool,
    pub port_unification: bool,
    /// Dynamic membership; applied without restart.
    pub servers: Vec<String>,
}

impl ServerConfig {
    pub fn build(
        config: &OperatorConfig,
        unit: UnitId,
        tls: bool,
        mode: QuorumMode,
        servers: Vec<String>,
    ) -> Self {
        Self {
            myid: unit.myid(),
            tick_time: config.tick_time,
            init_limit: config.init_limit,
            sync_limit: config.sync_limit,
            client_port: config.client_port,
            secure_client_port: tls.then_some(config.secure_client_port),
            quorum_mode: mode.as_str(),
            ssl_quorum: mode.ssl_quorum(),
            port_unification: mode.port_unification(),
            servers,
        }
    }

    /// Static properties, one `key=value` per line.
    pub fn static_properties(&self) -> Vec<String> {
        let mut lines = vec![
            format!("tickTime={}", self.tick_time),
            format!("initLimit={}", self.init_limit),
            format!("syncLimit={}", self.sync_limit),
            format!("clientPort={}", self.client_port),
            format!("sslQuorum={}", self.ssl_quorum),
            format!("portUnification={}", self.port_unification),
        ];
        if let Some(port) = self.secure_client_port {
            lines.push(format!("secureClientPort={}", port));
        }
        lines
    }

    /// SHA-256 over myid and the static properties.
    ///
    /// Membership is excluded: it changes through dynamic reconfiguration.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("myid={}\n", self.myid).as_bytes());
        for line in self.static_properties() {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(tls: bool, mode: QuorumMode, servers: Vec<String>) -> ServerConfig {
        ServerConfig::build(&OperatorConfig::default(), UnitId(1), tls, mode, servers)
    }

    #[test]
    fn test_build_from_config() {
        let config = build(true, QuorumMode::Transitional, vec![]);
        assert_eq!(config.myid, 2);
        assert_eq!(config.secure_client_port, Some(2182));
        assert!(config.port_unification);
        assert!(!config.ssl_quorum);
    }

    #[test]
    fn test_fingerprint_ignores_membership() {
        let a = build(false, QuorumMode::NonSsl, vec!["server.1=a".into()]);
        let b = build(false, QuorumMode::NonSsl, vec!["server.1=a".into(), "server.2=b".into()]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_encryption() {
        let plain = build(false, QuorumMode::NonSsl, vec![]);
        let transitional = build(true, QuorumMode::Transitional, vec![]);
        assert_ne!(plain.fingerprint(), transitional.fingerprint());
    }
}
