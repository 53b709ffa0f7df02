//! Handler for the `events` command.

use serde_json::json;

use crate::adapter::inbound::cli::command::EventsArgs;
use crate::adapter::inbound::cli::{ledger, output};
use crate::domain::event::EventRecord;
use crate::domain::id::CycleId;
use crate::error::Result;

/// Execute the events command.
pub fn execute(args: &EventsArgs) -> Result<()> {
    if output::is_quiet() && !output::is_json() {
        return Ok(());
    }
    if !ledger::require_database(&args.db, "events") {
        return Ok(());
    }

    let store = ledger::open_ledger(&args.db)?;
    let events = match args.cycle {
        Some(cycle) => store.events_in_cycle(CycleId::new(cycle), args.limit)?,
        None => store.events_tail(args.limit)?,
    };

    if output::is_json() {
        let rows: Vec<_> = events.iter().map(event_to_json).collect();
        output::json_output(json!({
            "command": "events",
            "cycle_id": args.cycle,
            "count": rows.len(),
            "events": rows,
        }));
        return Ok(());
    }

    if events.is_empty() {
        output::note("No events recorded.");
        return Ok(());
    }

    match args.cycle {
        Some(cycle) => output::section(&format!("Events (cycle {cycle})")),
        None => output::section("Events"),
    }

    for record in &events {
        let scope = match (record.cycle_id, record.bot_id) {
            (Some(cycle), Some(bot)) => format!("{} c{cycle}/b{bot}", record.scope),
            (Some(cycle), None) => format!("{} c{cycle}", record.scope),
            (None, Some(bot)) => format!("{} b{bot}", record.scope),
            (None, None) => record.scope.clone(),
        };
        output::event(
            &output::short_ts(&record.ts),
            record.level.as_str(),
            &scope,
            &record.message,
        );
    }

    Ok(())
}

fn event_to_json(record: &EventRecord) -> serde_json::Value {
    let payload = record
        .payload_json
        .as_deref()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok());
    json!({
        "id": record.id,
        "ts": record.ts,
        "level": record.level.as_str(),
        "scope": record.scope,
        "bot_id": record.bot_id.map(crate::domain::id::BotId::get),
        "cycle_id": record.cycle_id.map(crate::domain::id::CycleId::get),
        "message": record.message,
        "payload": payload,
    })
}
