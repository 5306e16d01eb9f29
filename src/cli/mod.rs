pub mod onboard;

use crate::analyzer::YearlyMode;
use crate::fetcher::FetchMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "redmine-report",
    about = "Weekly and yearly Redmine activity reports"
)]
pub struct Cli {
    /// Config file to use instead of ~/.redmine-report/config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Doctor,
    /// Report for the current week, or the previous one with --last
    Week {
        #[arg(long, default_value_t = false)]
        last: bool,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, value_enum, default_value_t = FetchMode::AuthoredOrAssigned)]
        mode: FetchMode,
    },
    /// Weekly reports for a whole year plus the rollup and yearly summary
    Year {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_enum, default_value_t = YearlyMode::Weeks)]
        mode: YearlyMode,
        #[arg(long, value_enum, default_value_t = FetchMode::AuthoredOrAssigned)]
        fetch: FetchMode,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
