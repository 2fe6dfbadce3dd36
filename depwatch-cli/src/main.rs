//! depwatch -- dependency vulnerability lookup CLI
//!
//! Entry point: parses arguments, brings up logging from the config file,
//! dispatches to the subcommand handlers, and maps errors to exit codes.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use depwatch_core::config::DepwatchConfig;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging must come up even when the config file is absent or broken,
    // so this load is best-effort. Commands reload with strict errors.
    let general = DepwatchConfig::load(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_default();
    if let Err(error) = logging::init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("warning: {error}");
    }

    let writer = OutputWriter::new(cli.output);

    let result = match cli.command {
        Commands::Check(args) => commands::check::execute(args, &cli.config, &writer).await,
        Commands::Resolve(args) => commands::resolve::execute(args, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}
