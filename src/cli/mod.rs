//! CLI module for the ZooKeeper operator
//!
//! Operates on a JSON snapshot of the peer document:
//! - init: Create a snapshot with registered units and seeded credentials
//! - status: Encryption, rotation and membership overview
//! - quorum: Live server list and the next unit to start
//! - get-password / set-password: System user credentials
//! - pre-upgrade-check: Fails unless the ensemble is settled

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    get_password, init, pre_upgrade_check, quorum, run, run_command, set_password, status,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{load_state, save_state, write_error, write_response};
