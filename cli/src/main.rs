mod cli;
mod commands;
mod config;
mod logging;
mod output;

use clap::Parser;
use color_eyre::eyre::Result;

use cli::{Cli, Commands};
use config::{LogLevel, OutputFormat, UserConfig};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = UserConfig::load();
    let log_level_override = cli.log_level.as_deref().map(LogLevel::from_str);
    logging::init(config.log_level, log_level_override);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        config.format
    };

    match cli.command {
        Some(Commands::Config { path, reset }) => commands::config::run(path, reset),
        Some(Commands::Get { index }) => {
            let source = commands::battery_source(&config);
            commands::get::run(&source, index, format, cli.compact)
        }
        Some(Commands::List) | None => {
            let source = commands::battery_source(&config);
            commands::list::run(&source, format, cli.compact)
        }
    }
}
