//! Handler for the `config` command group.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::app::config::Config;
use crate::error::{ConfigError, Result};

/// Default config template with documentation.
const CONFIG_TEMPLATE: &str = include_str!("../../../../config.toml.example");

/// Execute `config init`.
pub fn execute_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::InvalidValue {
            field: "config",
            reason: "file already exists (use --force to overwrite)".to_string(),
        }
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, CONFIG_TEMPLATE)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.init",
            "status": "written",
            "path": path.display().to_string(),
        }));
        return Ok(());
    }

    output::section("Config Initialized");
    output::success("Created configuration file");
    output::field("Path", path.display());
    output::section("Next Steps");
    output::note(&format!("1. Edit {} with your settings", path.display()));
    output::note(&format!(
        "2. Run: gauntlet config validate -c {}",
        path.display()
    ));
    output::note(&format!("3. Run: gauntlet run -c {}", path.display()));
    Ok(())
}

/// Execute `config show`.
///
/// A missing file is not an error here: the effective configuration is
/// then just the built-in defaults, and the display says so.
pub fn execute_show(path: &Path) -> Result<()> {
    let from_file = path.exists();
    let config = if from_file {
        Config::load(path)?
    } else {
        Config::default()
    };

    if output::is_json() {
        output::json_output(json!({
            "command": "config.show",
            "path": path.display().to_string(),
            "from_file": from_file,
            "database": config.database.path.as_ref().map(|p| p.display().to_string()),
            "logging": { "level": config.logging.level, "format": config.logging.format },
            "tournament": {
                "bots_per_cycle": config.tournament.bots_per_cycle,
                "cycle_seconds": config.tournament.cycle_seconds,
                "cycles": config.tournament.cycles,
                "symbol": config.tournament.symbol,
            },
            "scoring": {
                "pnl": config.scoring.pnl,
                "slippage": config.scoring.slippage,
                "win_rate": config.scoring.win_rate,
                "hold_time": config.scoring.hold_time,
                "cancel_replace": config.scoring.cancel_replace,
            },
            "simulation": {
                "tick_size": config.simulation.tick_size.to_string(),
                "start_price": config.simulation.start_price.to_string(),
                "book_levels": config.simulation.book_levels,
                "level_qty": config.simulation.level_qty.to_string(),
                "step_ms": config.simulation.step_ms,
                "fee_pct": config.simulation.fee_pct.to_string(),
                "seed": config.simulation.seed,
            },
        }));
        return Ok(());
    }

    output::section("Effective Configuration");
    output::field("Path", path.display());
    if !from_file {
        output::note("(file not found; showing built-in defaults)");
    }

    output::section("Database");
    match &config.database.path {
        Some(db) => output::field("Path", db.display()),
        None => output::field("Path", output::muted("default (~/.gauntlet/gauntlet.db)")),
    }

    output::section("Logging");
    output::field("Level", &config.logging.level);
    output::field("Format", &config.logging.format);

    output::section("Tournament");
    output::field("Bots/cycle", config.tournament.bots_per_cycle);
    output::field("Cycle", format!("{}s", config.tournament.cycle_seconds));
    output::field("Cycles", config.tournament.cycles);
    output::field("Symbol", &config.tournament.symbol);

    output::section("Scoring");
    output::field("Pnl", config.scoring.pnl);
    output::field("Slippage", config.scoring.slippage);
    output::field("Win rate", config.scoring.win_rate);
    output::field("Hold time", config.scoring.hold_time);
    output::field("Churn", config.scoring.cancel_replace);

    output::section("Simulation");
    output::field("Tick size", config.simulation.tick_size);
    output::field("Start price", config.simulation.start_price);
    output::field(
        "Book",
        format!(
            "{} levels x {}",
            config.simulation.book_levels, config.simulation.level_qty
        ),
    );
    output::field("Step", format!("{}ms", config.simulation.step_ms));
    output::field("Fee", config.simulation.fee_pct);
    match config.simulation.seed {
        Some(seed) => output::field("Seed", seed),
        None => output::field("Seed", output::muted("random")),
    }

    Ok(())
}

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    output::section("Config Validation");
    output::field("Path", path.display());
    Config::load(path)?;
    output::success("Config file is valid");
    output::field(
        "Next",
        format!("gauntlet config show -c {}", path.display()),
    );

    Ok(())
}
