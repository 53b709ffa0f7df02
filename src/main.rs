use clap::Parser;

use gauntlet::adapter::inbound::cli::command::{
    Cli, ColorChoice, Commands, ConfigCommand, CyclesCommand,
};
use gauntlet::adapter::inbound::cli::{
    config, cycles, events, export, orders, output, run, status,
};
use gauntlet::error::Result;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    if let Err(error) = dispatch(cli.command).await {
        output::error(&error.to_string());
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run::execute(&args).await,
        Commands::Status(args) => status::execute(&args.db),
        Commands::Cycles(args) => match args.command {
            Some(CyclesCommand::Show(show)) => cycles::execute_show(&show.db, show.id),
            None => cycles::execute_list(&args.db, args.limit),
        },
        Commands::Orders(args) => orders::execute(&args),
        Commands::Events(args) => events::execute(&args),
        Commands::Export(args) => export::execute(&args),
        Commands::Config(command) => match command {
            ConfigCommand::Init(args) => config::execute_init(&args.path, args.force),
            ConfigCommand::Show(args) => config::execute_show(&args.config),
            ConfigCommand::Validate(args) => config::execute_validate(&args.config),
        },
    }
}
