use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::aggregator::DEFAULT_TOP_N;

#[derive(Parser)]
#[command(name = "cost-tracker")]
#[command(about = "Explore monthly usage from an Open WebUI cost tracker export")]
#[command(version)]
pub struct Cli {
    /// JSON export to load (defaults to $COST_TRACKER_FILE, then the newest costs*.json)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Number of models kept in each ranking
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_TOP_N,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub top: usize,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive dashboard
    Dashboard,

    /// List the months present in the export
    Months {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show token and cost breakdowns for one month
    Report {
        /// Month to report on, as YYYY-MM (defaults to the latest month)
        #[arg(short, long)]
        month: Option<String>,

        /// Also list the month's individual records
        #[arg(long)]
        rows: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate the export and list skipped records
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
