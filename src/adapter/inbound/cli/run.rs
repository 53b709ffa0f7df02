//! Handler for the `run` command.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use serde_json::json;
use tokio::signal;
use tracing::warn;

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::{ledger, output, paths};
use crate::adapter::outbound::selector::create_selector;
use crate::app::config::Config;
use crate::app::supervisor::{Supervisor, TournamentOutcome};
use crate::error::Result;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args)?;

    if let Some(cycles) = args.cycles {
        config.tournament.cycles = cycles;
    }
    if let Some(bots) = args.bots {
        config.tournament.bots_per_cycle = bots;
    }
    let db_path = resolve_db_path(args, &config);

    // Global flags win over the config file for log shape.
    if output::is_json() {
        config.logging.format = "json".to_string();
    }
    match output::verbosity() {
        0 => {}
        1 => config.logging.level = "debug".to_string(),
        _ => config.logging.level = "trace".to_string(),
    }
    config.init_logging();

    paths::ensure_home_dir()?;
    print_startup(&config, &db_path, args);

    let store = ledger::open_ledger(&db_path)?;
    let selector = create_selector(config.scoring);
    let supervisor = Supervisor::new(config, store, selector)
        .with_reports_dir(Some(args.reports_dir.clone()));

    // First ctrl-c requests a graceful stop at the next cycle boundary.
    let stop = supervisor.stop_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("ctrl-c received; finishing the current cycle before stopping");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let outcome = supervisor.run().await?;
    print_outcome(&outcome, args);
    Ok(())
}

fn load_config(args: &RunArgs) -> Result<Config> {
    if args.config.exists() {
        Config::load(&args.config)
    } else {
        output::hint(&format!(
            "no config file at {}; using defaults (create one with `gauntlet config init`)",
            args.config.display()
        ));
        Ok(Config::default())
    }
}

/// CLI flag beats config file beats the home-directory default.
fn resolve_db_path(args: &RunArgs, config: &Config) -> PathBuf {
    args.db
        .clone()
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(paths::default_database)
}

fn print_startup(config: &Config, db_path: &std::path::Path, args: &RunArgs) {
    if output::is_quiet() && !output::is_json() {
        return;
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Database", db_path.display());
    output::field("Symbol", &config.tournament.symbol);
    output::field("Bots", config.tournament.bots_per_cycle);
    output::field("Cycles", config.tournament.cycles);
    output::field(
        "Session",
        format!("{}s per cycle", config.tournament.cycle_seconds),
    );
    output::field("Reports", args.reports_dir.display());
    match config.simulation.seed {
        Some(seed) => output::field("Seed", seed),
        None => output::field("Seed", output::muted("random")),
    }
    if output::verbosity() > 0 {
        output::field("Step", format!("{}ms", config.simulation.step_ms));
        output::field("Fee", config.simulation.fee_pct);
    }
}

fn print_outcome(outcome: &TournamentOutcome, args: &RunArgs) {
    if output::is_json() {
        output::json_output(json!({
            "command": "run",
            "cycles_completed": outcome.cycles.len(),
            "cycles": outcome.cycles,
            "reports_dir": args.reports_dir.display().to_string(),
        }));
        return;
    }
    if output::is_quiet() {
        return;
    }

    output::section("Tournament complete");
    output::field("Cycles", outcome.cycles.len());
    for cycle in &outcome.cycles {
        match &cycle.winner_name {
            Some(name) => output::success(&format!(
                "cycle {}: {} (bot {})",
                cycle.cycle_id,
                name,
                cycle.winner_bot_id.map(|id| id.get()).unwrap_or_default()
            )),
            None => output::warning(&format!("cycle {}: no qualified winner", cycle.cycle_id)),
        }
    }
    output::field("Reports", args.reports_dir.display());
}
