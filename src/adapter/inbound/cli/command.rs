//! Command-line interface definitions.
//!
//! Defines the CLI structure for the gauntlet application using `clap`.
//! The CLI supports subcommands for running tournaments, inspecting the
//! experiment ledger, exporting cycle reports, and managing configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::paths;

/// Trading-bot tournament runner and experiment ledger CLI
#[derive(Parser, Debug)]
#[command(name = "gauntlet")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands for the gauntlet CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tournament (foreground, interactive)
    Run(RunArgs),

    /// Show ledger status and totals
    Status(StatusArgs),

    /// List cycles, or show one cycle's report with ranked bots
    Cycles(CyclesArgs),

    /// List order rows recorded in a cycle
    Orders(OrdersArgs),

    /// Tail the append-only event log
    Events(EventsArgs),

    /// Write a cycle's JSON and CSV report files
    Export(ExportArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Subcommands for `gauntlet config`.
///
/// Provides configuration management utilities including generation,
/// display, and validation of configuration files.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Generate a new configuration file from template.
    Init(ConfigInitArgs),
    /// Display the effective configuration with defaults applied.
    Show(ConfigPathArg),
    /// Validate a configuration file for correctness.
    Validate(ConfigPathArg),
}

/// Shared argument struct for commands that require only a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,
}

/// Arguments for the `config init` subcommand.
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Output path for the generated configuration file.
    #[arg(default_value_os_t = paths::default_config())]
    pub path: PathBuf,
    /// Overwrite the file if it already exists.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `run` subcommand.
///
/// Optional fields override the corresponding configuration file values;
/// everything else comes from the config file or its defaults.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    /// Override the ledger database path.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Override the number of cycles to run.
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Override the number of bot variants per cycle.
    #[arg(long)]
    pub bots: Option<usize>,

    /// Directory receiving per-cycle report files.
    #[arg(long, default_value_os_t = paths::default_reports_dir())]
    pub reports_dir: PathBuf,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Path to the SQLite ledger database.
    #[arg(long, default_value_os_t = paths::default_database())]
    pub db: PathBuf,
}

/// Arguments for the `cycles` subcommand.
///
/// Without a nested subcommand, lists recent cycles newest-first.
#[derive(Parser, Debug)]
pub struct CyclesArgs {
    /// Maximum cycles to list.
    #[arg(long, default_value = "20")]
    pub limit: i64,

    /// Path to the SQLite ledger database.
    #[arg(long, default_value_os_t = paths::default_database())]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Option<CyclesCommand>,
}

/// Nested subcommands for `gauntlet cycles`.
#[derive(Subcommand, Debug)]
pub enum CyclesCommand {
    /// Show one cycle's report with ranked bots.
    Show(CyclesShowArgs),
}

/// Arguments for the `cycles show` subcommand.
#[derive(Parser, Debug)]
pub struct CyclesShowArgs {
    /// Cycle id to display.
    pub id: i32,

    /// Path to the SQLite ledger database.
    #[arg(long, default_value_os_t = paths::default_database())]
    pub db: PathBuf,
}

/// Arguments for the `orders` subcommand.
#[derive(Parser, Debug)]
pub struct OrdersArgs {
    /// Cycle id to read orders from.
    #[arg(long)]
    pub cycle: i32,

    /// Only orders placed by this bot id.
    #[arg(long)]
    pub bot: Option<i32>,

    /// Only orders still live (open or partially filled).
    #[arg(long)]
    pub open: bool,

    /// Maximum rows to display.
    #[arg(long, default_value = "50")]
    pub limit: i64,

    /// Path to the SQLite ledger database.
    #[arg(long, default_value_os_t = paths::default_database())]
    pub db: PathBuf,
}

/// Arguments for the `events` subcommand.
#[derive(Parser, Debug)]
pub struct EventsArgs {
    /// Only events tagged with this cycle id.
    #[arg(long)]
    pub cycle: Option<i32>,

    /// Maximum events to display, newest last.
    #[arg(long, default_value = "20")]
    pub limit: i64,

    /// Path to the SQLite ledger database.
    #[arg(long, default_value_os_t = paths::default_database())]
    pub db: PathBuf,
}

/// Arguments for the `export` subcommand.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Cycle id to export.
    #[arg(long)]
    pub cycle: i32,

    /// Output directory for the report files.
    #[arg(short, long, default_value_os_t = paths::default_reports_dir())]
    pub out: PathBuf,

    /// Path to the SQLite ledger database.
    #[arg(long, default_value_os_t = paths::default_database())]
    pub db: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_has_version() {
        let cmd = Cli::command();
        assert!(cmd.get_version().is_some());
    }

    #[test]
    fn cli_name_is_gauntlet() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "gauntlet");
    }

    // Global flags

    #[test]
    fn global_flags_default_off() {
        let cli = Cli::try_parse_from(["gauntlet", "status"]).unwrap();
        assert!(!cli.json);
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(matches!(cli.color, ColorChoice::Auto));
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["gauntlet", "--json", "status"]).unwrap();
        assert!(cli.json);
        let cli = Cli::try_parse_from(["gauntlet", "status", "--json"]).unwrap();
        assert!(cli.json);
    }

    #[test]
    fn quiet_flag_short_and_long() {
        let cli = Cli::try_parse_from(["gauntlet", "--quiet", "status"]).unwrap();
        assert!(cli.quiet);
        let cli = Cli::try_parse_from(["gauntlet", "-q", "status"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn verbose_flag_counts() {
        let cli = Cli::try_parse_from(["gauntlet", "-v", "status"]).unwrap();
        assert_eq!(cli.verbose, 1);
        let cli = Cli::try_parse_from(["gauntlet", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["gauntlet", "--verbose", "--verbose", "status"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn color_choices_parse() {
        let cli = Cli::try_parse_from(["gauntlet", "--color", "always", "status"]).unwrap();
        assert!(matches!(cli.color, ColorChoice::Always));
        let cli = Cli::try_parse_from(["gauntlet", "--color", "never", "status"]).unwrap();
        assert!(matches!(cli.color, ColorChoice::Never));
    }

    #[test]
    fn invalid_color_choice_is_rejected() {
        let result = Cli::try_parse_from(["gauntlet", "--color", "sometimes", "status"]);
        assert!(result.is_err());
    }

    // run

    #[test]
    fn run_defaults_leave_overrides_unset() {
        let cli = Cli::try_parse_from(["gauntlet", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, paths::default_config());
                assert!(args.db.is_none());
                assert!(args.cycles.is_none());
                assert!(args.bots.is_none());
                assert_eq!(args.reports_dir, paths::default_reports_dir());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn run_accepts_tournament_overrides() {
        let cli =
            Cli::try_parse_from(["gauntlet", "run", "--cycles", "3", "--bots", "8"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.cycles, Some(3));
                assert_eq!(args.bots, Some(8));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn run_accepts_db_and_reports_dir_overrides() {
        let cli = Cli::try_parse_from([
            "gauntlet",
            "run",
            "--db",
            "/tmp/g.db",
            "--reports-dir",
            "/tmp/reports",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.db, Some(PathBuf::from("/tmp/g.db")));
                assert_eq!(args.reports_dir, PathBuf::from("/tmp/reports"));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn run_accepts_config_short_flag() {
        let cli = Cli::try_parse_from(["gauntlet", "run", "-c", "/tmp/custom.toml"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("/tmp/custom.toml"));
            }
            _ => panic!("expected run command"),
        }
    }

    // status

    #[test]
    fn status_uses_default_database() {
        let cli = Cli::try_parse_from(["gauntlet", "status"]).unwrap();
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.db, paths::default_database());
            }
            _ => panic!("expected status command"),
        }
    }

    // cycles

    #[test]
    fn bare_cycles_lists_with_default_limit() {
        let cli = Cli::try_parse_from(["gauntlet", "cycles"]).unwrap();
        match cli.command {
            Commands::Cycles(args) => {
                assert_eq!(args.limit, 20);
                assert!(args.command.is_none());
            }
            _ => panic!("expected cycles command"),
        }
    }

    #[test]
    fn cycles_show_takes_a_cycle_id() {
        let cli = Cli::try_parse_from(["gauntlet", "cycles", "show", "3"]).unwrap();
        match cli.command {
            Commands::Cycles(args) => match args.command {
                Some(CyclesCommand::Show(show)) => assert_eq!(show.id, 3),
                _ => panic!("expected cycles show"),
            },
            _ => panic!("expected cycles command"),
        }
    }

    #[test]
    fn cycles_show_requires_an_id() {
        let result = Cli::try_parse_from(["gauntlet", "cycles", "show"]);
        assert!(result.is_err());
    }

    // orders

    #[test]
    fn orders_requires_a_cycle() {
        let result = Cli::try_parse_from(["gauntlet", "orders"]);
        assert!(result.is_err());
    }

    #[test]
    fn orders_parses_all_filters() {
        let cli = Cli::try_parse_from([
            "gauntlet", "orders", "--cycle", "2", "--bot", "5", "--open", "--limit", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Orders(args) => {
                assert_eq!(args.cycle, 2);
                assert_eq!(args.bot, Some(5));
                assert!(args.open);
                assert_eq!(args.limit, 10);
            }
            _ => panic!("expected orders command"),
        }
    }

    #[test]
    fn orders_filters_default_off() {
        let cli = Cli::try_parse_from(["gauntlet", "orders", "--cycle", "1"]).unwrap();
        match cli.command {
            Commands::Orders(args) => {
                assert_eq!(args.bot, None);
                assert!(!args.open);
                assert_eq!(args.limit, 50);
            }
            _ => panic!("expected orders command"),
        }
    }

    // events

    #[test]
    fn events_defaults_to_global_tail() {
        let cli = Cli::try_parse_from(["gauntlet", "events"]).unwrap();
        match cli.command {
            Commands::Events(args) => {
                assert!(args.cycle.is_none());
                assert_eq!(args.limit, 20);
            }
            _ => panic!("expected events command"),
        }
    }

    #[test]
    fn events_accepts_cycle_scope() {
        let cli =
            Cli::try_parse_from(["gauntlet", "events", "--cycle", "4", "--limit", "5"]).unwrap();
        match cli.command {
            Commands::Events(args) => {
                assert_eq!(args.cycle, Some(4));
                assert_eq!(args.limit, 5);
            }
            _ => panic!("expected events command"),
        }
    }

    // export

    #[test]
    fn export_requires_a_cycle() {
        let result = Cli::try_parse_from(["gauntlet", "export"]);
        assert!(result.is_err());
    }

    #[test]
    fn export_accepts_out_dir() {
        let cli = Cli::try_parse_from(["gauntlet", "export", "--cycle", "1", "-o", "/tmp/out"])
            .unwrap();
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.cycle, 1);
                assert_eq!(args.out, PathBuf::from("/tmp/out"));
            }
            _ => panic!("expected export command"),
        }
    }

    // config

    #[test]
    fn config_init_uses_default_path() {
        let cli = Cli::try_parse_from(["gauntlet", "config", "init"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommand::Init(args)) => {
                assert_eq!(args.path, paths::default_config());
                assert!(!args.force);
            }
            _ => panic!("expected config init"),
        }
    }

    #[test]
    fn config_init_accepts_force() {
        let cli = Cli::try_parse_from(["gauntlet", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommand::Init(args)) => assert!(args.force),
            _ => panic!("expected config init"),
        }
    }

    #[test]
    fn config_show_accepts_custom_path() {
        let cli =
            Cli::try_parse_from(["gauntlet", "config", "show", "-c", "/tmp/a.toml"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommand::Show(args)) => {
                assert_eq!(args.config, PathBuf::from("/tmp/a.toml"));
            }
            _ => panic!("expected config show"),
        }
    }

    #[test]
    fn config_validate_parses() {
        let cli = Cli::try_parse_from(["gauntlet", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommand::Validate(_))
        ));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        let result = Cli::try_parse_from(["gauntlet", "prune"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        let result = Cli::try_parse_from(["gauntlet"]);
        assert!(result.is_err());
    }
}
