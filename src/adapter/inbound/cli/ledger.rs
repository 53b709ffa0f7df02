//! Ledger access helpers for CLI handlers.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::adapter::outbound::sqlite::ledger::SqliteLedger;
use crate::error::Result;
use crate::port::outbound::ledger::ExperimentLedger;

/// Build a sqlite database URL from a filesystem path.
#[must_use]
pub fn sqlite_database_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Open the ledger at `path`, creating the file and applying migrations.
pub fn open_ledger(path: &Path) -> Result<Arc<dyn ExperimentLedger>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let url = sqlite_database_url(path);
    Ok(Arc::new(SqliteLedger::open(&url)?))
}

/// Check that the ledger file exists before a read-only command.
///
/// Read commands must not create an empty database as a side effect, so
/// they bail out with a warning instead of opening a missing file.
pub fn require_database(path: &Path, command: &str) -> bool {
    if path.exists() {
        return true;
    }
    if output::is_json() {
        output::json_output(json!({
            "command": command,
            "database": path.display().to_string(),
            "status": "missing_database",
        }));
    } else {
        output::warning(&format!("Database not found ({path:?})"));
        output::hint("run `gauntlet run` to start a tournament and create the ledger");
    }
    false
}
