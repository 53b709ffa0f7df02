//! Cycle report assembly and export.
//!
//! Reports are rebuilt from ledger reads on demand, so the CLI and the
//! supervisor see the same numbers without a second bookkeeping path.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::id::CycleId;
use crate::domain::order::OrderStatus;
use crate::domain::stats::{BotCycleEntry, CycleReport};
use crate::error::{LedgerError, Result};
use crate::port::outbound::ledger::ExperimentLedger;

/// Assemble one cycle's report from the ledger.
///
/// Execution-quality metrics (fill rate, hold time, slippage) are folded
/// from the raw order rows rather than read from `bot_stats`, so they
/// stay correct even when a runner died before its final stats upsert.
pub fn build_cycle_report(ledger: &dyn ExperimentLedger, cycle_id: CycleId) -> Result<CycleReport> {
    let cycle = ledger.cycle(cycle_id)?.ok_or(LedgerError::CycleNotFound {
        cycle_id: cycle_id.get(),
    })?;

    let bots = ledger.bots_in_cycle(cycle_id)?;
    let mut entries = Vec::with_capacity(bots.len());

    for bot in bots {
        let stats = ledger.stats_for(bot.bot_id, cycle_id)?;
        let orders = ledger.orders_for_bot(bot.bot_id, cycle_id)?;

        let orders_recorded = orders.len() as i64;
        let fills = orders
            .iter()
            .filter(|order| order.status == OrderStatus::Filled)
            .count() as i64;
        let cancel_replaces = orders
            .iter()
            .map(|order| i64::from(order.cancel_replace_count))
            .sum();

        let holds: Vec<f64> = orders
            .iter()
            .filter_map(|order| order.hold_time_s.map(f64::from))
            .collect();
        let slippages: Vec<f64> = orders
            .iter()
            .filter_map(|order| order.slippage_ticks().map(f64::from))
            .collect();

        entries.push(BotCycleEntry {
            bot,
            stats,
            orders_recorded,
            fills,
            avg_hold_s: mean(&holds),
            avg_slippage_ticks: mean(&slippages),
            cancel_replaces,
        });
    }

    Ok(CycleReport {
        cycle,
        entries,
        generated_at: Utc::now().to_rfc3339(),
    })
}

/// Pretty-printed JSON rendering of a report.
pub fn report_json(report: &CycleReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// CSV rendering of a report, one row per bot.
#[must_use]
pub fn report_csv(report: &CycleReport) -> String {
    let mut csv = String::from(
        "bot_id,name,seed_parent,orders,fills,fill_rate_pct,pnl,pnl_pct,wins,losses,win_rate_pct,avg_hold_s,avg_slippage_ticks,cancel_replaces,runtime_s\n"
    );

    for entry in &report.entries {
        let (pnl, pnl_pct, wins, losses, win_rate, runtime_s) = match &entry.stats {
            Some(stats) => (
                stats.pnl,
                stats.pnl_pct,
                stats.wins,
                stats.losses,
                stats.win_rate().unwrap_or(0.0),
                stats.runtime_s,
            ),
            None => (Decimal::ZERO, 0.0, 0, 0, 0.0, 0),
        };

        csv.push_str(&format!(
            "{},{},{},{},{},{:.1},{},{:.2},{},{},{:.1},{:.1},{:.2},{},{}\n",
            entry.bot.bot_id,
            entry.bot.name,
            entry.bot.seed_parent.as_deref().unwrap_or(""),
            entry.orders_recorded,
            entry.fills,
            entry.fill_rate().unwrap_or(0.0),
            pnl,
            pnl_pct,
            wins,
            losses,
            win_rate,
            entry.avg_hold_s.unwrap_or(0.0),
            entry.avg_slippage_ticks.unwrap_or(0.0),
            entry.cancel_replaces,
            runtime_s,
        ));
    }

    csv
}

/// Write `cycle-<id>.json` and `cycle-<id>.csv` into `dir`.
pub fn write_report_files(report: &CycleReport, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let json_path = dir.join(format!("cycle-{}.json", report.cycle.cycle_id));
    let csv_path = dir.join(format!("cycle-{}.csv", report.cycle.cycle_id));

    fs::write(&json_path, report_json(report)?)?;
    fs::write(&csv_path, report_csv(report))?;

    Ok((json_path, csv_path))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
