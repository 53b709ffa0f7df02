//! Handler for the `status` command.

use std::path::Path;

use rust_decimal::Decimal;
use serde_json::json;

use crate::adapter::inbound::cli::{ledger, output};
use crate::domain::stats::GlobalSummary;
use crate::error::Result;

/// Execute the status command.
pub fn execute(db_path: &Path) -> Result<()> {
    if output::is_quiet() && !output::is_json() {
        return Ok(());
    }

    if output::is_json() {
        let payload = if db_path.exists() {
            match ledger::open_ledger(db_path).and_then(|l| l.global_summary()) {
                Ok(summary) => json!({
                    "command": "status",
                    "database": db_path.display().to_string(),
                    "status": "ok",
                    "summary": summary_to_json(&summary),
                }),
                Err(error) => json!({
                    "command": "status",
                    "database": db_path.display().to_string(),
                    "status": "error",
                    "error": error.to_string(),
                }),
            }
        } else {
            json!({
                "command": "status",
                "database": db_path.display().to_string(),
                "status": "missing_database",
            })
        };
        println!("{payload}");
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Database", db_path.display());

    if !db_path.exists() {
        println!();
        output::warning(&format!("Database not found ({db_path:?})"));
        println!("  Run `gauntlet run` to start a tournament and create the ledger.");
        return Ok(());
    }

    let summary = ledger::open_ledger(db_path)?.global_summary()?;
    display_summary(&summary);
    Ok(())
}

fn summary_to_json(summary: &GlobalSummary) -> serde_json::Value {
    json!({
        "cycles_total": summary.cycles_total,
        "cycles_open": summary.cycles_open,
        "bots_total": summary.bots_total,
        "orders_total": summary.orders_total,
        "fills_total": summary.fills_total,
        "events_total": summary.events_total,
        "net_pnl": summary.net_pnl.to_string(),
        "last_activity": summary.last_activity,
    })
}

fn display_summary(summary: &GlobalSummary) {
    output::section("Ledger");
    output::field(
        "Cycles",
        format!(
            "{} ({} open)",
            summary.cycles_total, summary.cycles_open
        ),
    );
    output::field("Bots", summary.bots_total);
    output::field(
        "Orders",
        format!(
            "{} ({} filled)",
            summary.orders_total, summary.fills_total
        ),
    );
    output::field("Events", summary.events_total);

    let pnl_display = if summary.net_pnl >= Decimal::ZERO {
        output::positive(format!("+{}", summary.net_pnl))
    } else {
        output::negative(summary.net_pnl)
    };
    output::field("Net pnl", pnl_display);

    match &summary.last_activity {
        Some(ts) => output::field("Last event", ts),
        None => output::field("Last event", output::muted("none")),
    }

    if summary.cycles_total == 0 {
        println!();
        output::hint("run `gauntlet run` to start the first cycle");
    }
}
