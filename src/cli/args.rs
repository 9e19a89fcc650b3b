//! CLI argument definitions using clap
//!
//! Commands:
//! - zookeeper-operator init --units <n>
//! - zookeeper-operator status
//! - zookeeper-operator quorum
//! - zookeeper-operator get-password --username <user>
//! - zookeeper-operator set-password --username <user> [--password <pw>]
//! - zookeeper-operator pre-upgrade-check
//!
//! Every command works on a JSON snapshot of the peer document.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and drive a ZooKeeper ensemble's shared operator state
#[derive(Parser, Debug)]
#[command(name = "zookeeper-operator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the peer document snapshot
    #[arg(long, global = true, default_value = "./zookeeper-state.json")]
    pub state: PathBuf,

    /// Path to the operator configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new snapshot with units joined and a leader elected
    Init {
        /// Number of units in the peer relation
        #[arg(long, default_value_t = 3)]
        units: u32,
    },

    /// Show encryption, rotation and membership state
    Status,

    /// Show the live quorum configuration
    Quorum,

    /// Print the password of a system user
    GetPassword {
        #[arg(long, default_value = "super")]
        username: String,
    },

    /// Rotate the password of a system user
    SetPassword {
        #[arg(long, default_value = "super")]
        username: String,

        /// New password; generated when omitted
        #[arg(long)]
        password: Option<String>,

        /// Unit running the action; defaults to the leader
        #[arg(long)]
        unit: Option<String>,
    },

    /// Fail unless the ensemble is settled enough for an in-place upgrade
    PreUpgradeCheck,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
