//! JSON I/O handling for CLI
//!
//! - Output: single JSON object via stdout
//! - Errors: single JSON object via stderr
//! - Snapshot: pretty JSON file, replaced atomically

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::state::MemoryDatabag;

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stderr
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stderr = io::stderr();
    serde_json::to_writer(&mut stderr, &response)?;
    writeln!(stderr)?;
    stderr.flush()?;

    Ok(())
}

/// Load the peer document snapshot.
pub fn load_state(path: &Path) -> CliResult<MemoryDatabag> {
    if !path.exists() {
        return Err(CliError::not_initialized());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Persist the peer document snapshot via write-then-rename.
pub fn save_state(path: &Path, state: &MemoryDatabag) -> CliResult<()> {
    let content = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
