//! Handlers for the `cycles` command group.

use std::path::Path;

use rust_decimal::Decimal;
use serde_json::json;

use crate::adapter::inbound::cli::{ledger, output};
use crate::app::report::build_cycle_report;
use crate::domain::id::CycleId;
use crate::domain::score::{rank, MetricWeights};
use crate::domain::stats::CycleRecord;
use crate::error::Result;

/// Execute `cycles` (list view, newest first).
pub fn execute_list(db_path: &Path, limit: i64) -> Result<()> {
    if output::is_quiet() && !output::is_json() {
        return Ok(());
    }
    if !ledger::require_database(db_path, "cycles") {
        return Ok(());
    }

    let store = ledger::open_ledger(db_path)?;
    let cycles = store.cycles(limit)?;

    if output::is_json() {
        let rows: Vec<_> = cycles.iter().map(cycle_to_json).collect();
        output::json_output(json!({
            "command": "cycles",
            "count": rows.len(),
            "cycles": rows,
        }));
        return Ok(());
    }

    if cycles.is_empty() {
        output::note("No cycles recorded yet.");
        output::hint("run `gauntlet run` to start the first cycle");
        return Ok(());
    }

    output::section("Cycles");
    let widths = [4, 19, 19, 8, 30];
    output::table_header(&[
        ("ID", widths[0]),
        ("STARTED", widths[1]),
        ("FINISHED", widths[2]),
        ("WINNER", widths[3]),
        ("REASON", widths[4]),
    ]);
    output::table_separator(&widths);

    for cycle in &cycles {
        output::table_row(
            &[
                cycle.cycle_id.to_string(),
                output::short_ts(&cycle.started_at),
                cycle
                    .finished_at
                    .as_deref()
                    .map(output::short_ts)
                    .unwrap_or_else(|| "open".to_string()),
                cycle
                    .winner_bot_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                cycle.winner_reason.clone().unwrap_or_default(),
            ],
            &widths,
        );
    }

    Ok(())
}

/// Execute `cycles show <id>` (full report with ranked bots).
pub fn execute_show(db_path: &Path, id: i32) -> Result<()> {
    if output::is_quiet() && !output::is_json() {
        return Ok(());
    }
    if !ledger::require_database(db_path, "cycles.show") {
        return Ok(());
    }

    let store = ledger::open_ledger(db_path)?;
    let report = build_cycle_report(store.as_ref(), CycleId::new(id))?;
    let scores = rank(&report, &MetricWeights::default());

    if output::is_json() {
        let bots: Vec<_> = report
            .entries
            .iter()
            .map(|entry| {
                let score = scores
                    .iter()
                    .find(|s| s.bot_id == entry.bot.bot_id)
                    .map(|s| s.score);
                json!({
                    "bot_id": entry.bot.bot_id.get(),
                    "name": entry.bot.name,
                    "seed_parent": entry.bot.seed_parent,
                    "score": score,
                    "orders": entry.orders_recorded,
                    "fills": entry.fills,
                    "fill_rate_pct": entry.fill_rate(),
                    "pnl": entry.stats.as_ref().map(|s| s.pnl.to_string()),
                    "wins": entry.stats.as_ref().map(|s| s.wins),
                    "losses": entry.stats.as_ref().map(|s| s.losses),
                    "avg_hold_s": entry.avg_hold_s,
                    "avg_slippage_ticks": entry.avg_slippage_ticks,
                    "cancel_replaces": entry.cancel_replaces,
                })
            })
            .collect();
        output::json_output(json!({
            "command": "cycles.show",
            "cycle": cycle_to_json(&report.cycle),
            "generated_at": report.generated_at,
            "bots": bots,
        }));
        return Ok(());
    }

    display_cycle(&report.cycle);

    output::section("Bots");
    let widths = [4, 4, 12, 6, 6, 5, 10, 6];
    output::table_header(&[
        ("RANK", widths[0]),
        ("ID", widths[1]),
        ("NAME", widths[2]),
        ("SCORE", widths[3]),
        ("ORDERS", widths[4]),
        ("FILLS", widths[5]),
        ("PNL", widths[6]),
        ("WIN%", widths[7]),
    ]);
    output::table_separator(&widths);

    for (position, scored) in scores.iter().enumerate() {
        let Some(entry) = report.entry(scored.bot_id) else {
            continue;
        };
        let pnl = entry
            .stats
            .as_ref()
            .map(|s| s.pnl)
            .unwrap_or(Decimal::ZERO);
        // Colored cells would break the column alignment, so tables stay plain.
        let pnl_cell = if pnl >= Decimal::ZERO {
            format!("+{pnl}")
        } else {
            pnl.to_string()
        };
        let win_rate = entry
            .stats
            .as_ref()
            .and_then(|s| s.win_rate())
            .map(|r| format!("{r:.0}"))
            .unwrap_or_else(|| "-".to_string());

        output::table_row(
            &[
                (position + 1).to_string(),
                scored.bot_id.to_string(),
                scored.name.clone(),
                format!("{:.3}", scored.score),
                entry.orders_recorded.to_string(),
                entry.fills.to_string(),
                pnl_cell,
                win_rate,
            ],
            &widths,
        );
    }

    Ok(())
}

fn display_cycle(cycle: &CycleRecord) {
    output::section(&format!("Cycle {}", cycle.cycle_id));
    output::field("Started", &cycle.started_at);
    match &cycle.finished_at {
        Some(ts) => output::field("Finished", ts),
        None => output::field("Finished", output::highlight("still open")),
    }
    match cycle.winner_bot_id {
        Some(winner) => {
            output::field("Winner", format!("bot {winner}"));
            if let Some(reason) = &cycle.winner_reason {
                output::field("Reason", reason);
            }
        }
        None if cycle.is_open() => {}
        None => {
            output::field("Winner", output::muted("none"));
            if let Some(reason) = &cycle.winner_reason {
                output::field("Reason", reason);
            }
        }
    }
}

fn cycle_to_json(cycle: &CycleRecord) -> serde_json::Value {
    json!({
        "cycle_id": cycle.cycle_id.get(),
        "started_at": cycle.started_at,
        "finished_at": cycle.finished_at,
        "winner_bot_id": cycle.winner_bot_id.map(crate::domain::id::BotId::get),
        "winner_reason": cycle.winner_reason,
        "open": cycle.is_open(),
    })
}

