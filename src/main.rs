mod aggregator;
mod cli;
mod commands;
mod config;
mod data_loader;
mod error;
mod models;
mod normalizer;
mod tui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{show_check, show_months, show_report};
use config::resolve_input;
use data_loader::DataLoader;
use tui::{run_dashboard, App};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => {
            let path = resolve_input(cli.file)?;
            let app = App::new(DataLoader::new(path), cli.top)?;
            run_dashboard(app)?;
        }
        Commands::Months { json } => {
            show_months(cli.file, json)?;
        }
        Commands::Report { month, rows, json } => {
            show_report(cli.file, month, cli.top, rows, json)?;
        }
        Commands::Check { json } => {
            show_check(cli.file, json)?;
        }
    }

    Ok(())
}
