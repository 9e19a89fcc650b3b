//! zookeeper-operator CLI entry point
//!
//! Delegates everything to the CLI module. Errors are written to stderr as
//! a JSON object and the process exits non-zero.

use zookeeper_operator::cli;

fn main() {
    if let Err(e) = cli::run() {
        let _ = cli::write_error(e.code_str(), e.message());
        std::process::exit(1);
    }
}
