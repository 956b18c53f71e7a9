use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tabdesk", version, about = "Personal dashboard for the terminal")]
pub struct Cli {
    /// Store data in this directory instead of the platform data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the interactive dashboard
    Tui,
    /// Write data, layout and preferences to a JSON backup
    Export {
        /// Destination file
        file: PathBuf,
    },
    /// Replace data, layout and preferences from a JSON backup
    Import {
        /// Backup file produced by `export`
        file: PathBuf,
    },
    /// Show usage statistics
    Stats {
        /// Print the whole statistics document as JSON
        #[arg(long)]
        json: bool,
    },
    /// List available widgets and mark the ones on the dashboard
    Widgets,
    /// Evaluate an arithmetic expression (+ - * / ^ and parentheses)
    Calc {
        /// Expression, e.g. "2^3 * (1 + 2)"
        expression: String,
    },
    /// Copy data from the old storage keys when the new ones are missing
    Migrate,
    /// Erase all data, layout and preferences
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Set daily goals
    Goals {
        /// Tasks per day (1-50)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=50))]
        tasks: Option<u64>,
        /// Pomodoro sessions per day (1-20)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=20))]
        pomodoro: Option<u64>,
    },
}
