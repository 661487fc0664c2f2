pub mod audit;
pub mod commands;
pub mod logging;
pub mod sources;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tarifa_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "tarifa",
    about = "Tarifa shipping quote CLI",
    long_about = "Resolve shipping quotes against a tariff catalog, list served routes, and inspect runtime configuration.",
    after_help = "Examples:\n  tarifa quote --origin Santiago --destination Valparaiso --weight 3\n  tarifa routes\n  tarifa doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Resolve the single applicable tariff, price and commitment date for a shipment")]
    Quote(commands::quote::QuoteArgs),
    #[command(about = "List the distinct routes served by rules active at an instant")]
    Routes(commands::routes::RoutesArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, catalog and commitment policy readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    logging::init_logging(&logging);

    let result = match cli.command {
        Command::Quote(args) => commands::quote::run(args),
        Command::Routes(args) => commands::routes::run(args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
