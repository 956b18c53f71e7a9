mod app;
mod cli;
mod commands;
mod config;
mod expr;
mod form;
mod grid;
mod model;
mod stats;
mod storage;
mod store;
mod ui;
mod validate;
mod widgets;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let mut config = config::Config::load().context("loading configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }
    let data_dir = config.resolve_data_dir()?;
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    init_logging(&data_dir, &config.log_filter);
    let store = store::DirStore::open(&data_dir)
        .with_context(|| format!("opening store in {}", data_dir.display()))?;

    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Tui => commands::tui(config, store),
        cli::Command::Export { file } => commands::export(store, &file),
        cli::Command::Import { file } => commands::import(store, &file),
        cli::Command::Stats { json } => commands::stats(store, json),
        cli::Command::Widgets => commands::widgets(store),
        cli::Command::Calc { expression } => commands::calc(&expression),
        cli::Command::Migrate => commands::migrate(store),
        cli::Command::Reset { yes } => commands::reset(store, yes),
        cli::Command::Goals { tasks, pomodoro } => commands::goals(store, tasks, pomodoro),
    }
}

/// Logs go to `tabdesk.log` in the data directory; the terminal belongs to
/// the dashboard.
fn init_logging(data_dir: &Path, default_filter: &str) {
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("tabdesk.log"))
    else {
        return;
    };
    let filter = EnvFilter::try_from_env(config::LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}
