//! Handler for the `export` command.

use serde_json::json;

use crate::adapter::inbound::cli::command::ExportArgs;
use crate::adapter::inbound::cli::{ledger, output};
use crate::app::report::{build_cycle_report, write_report_files};
use crate::domain::id::CycleId;
use crate::error::Result;

/// Execute the export command.
pub fn execute(args: &ExportArgs) -> Result<()> {
    if !ledger::require_database(&args.db, "export") {
        return Ok(());
    }

    let store = ledger::open_ledger(&args.db)?;
    let report = build_cycle_report(store.as_ref(), CycleId::new(args.cycle))?;
    let (json_path, csv_path) = write_report_files(&report, &args.out)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "export",
            "cycle_id": args.cycle,
            "bots": report.entries.len(),
            "json_path": json_path.display().to_string(),
            "csv_path": csv_path.display().to_string(),
        }));
        return Ok(());
    }

    output::success(&format!("Exported cycle {}", args.cycle));
    output::field("Bots", report.entries.len());
    output::field("JSON", json_path.display());
    output::field("CSV", csv_path.display());

    Ok(())
}
