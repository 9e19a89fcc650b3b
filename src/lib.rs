//! zookeeper-operator - Operator core for a ZooKeeper ensemble
//!
//! Decides quorum membership, start order, encryption migration, credential
//! rotation and rolling restarts from a replicated peer document.

pub mod cli;
pub mod clients;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod encryption;
pub mod observability;
pub mod quorum;
pub mod restart;
pub mod state;
