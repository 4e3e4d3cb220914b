//! dirpush CLI
//!
//! Pushes (or pulls) a directory to a remote host with rsync and keeps it in
//! sync through an external file watcher.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Control log verbosity (default: `warn`, `debug` with `--verbose`)
//! - `DIRPUSH_WATCH_COMMAND`: Watcher command line (default: `bundle exec guard`)
//! - `DIRPUSH_RSYNC`: rsync executable (default: `rsync`)

mod cli;
mod error;
mod reporter;

use clap::Parser;
use colored::Colorize;
use dirpush_core::{CommandWatcher, RsyncTool, SyncOrchestrator, SyncSpec};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::Result;
use reporter::TerminalReporter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let watcher = CommandWatcher::parse(&cli.watch_command)?;
    let spec = SyncSpec::resolve(&cli.to_request(), &cwd)?;
    tracing::debug!(?spec, "Resolved invocation");

    let transfer = RsyncTool::new(spec.rsync_program());
    let reporter = TerminalReporter;
    let run = SyncOrchestrator::new(spec, &transfer, &watcher, &reporter).run()?;

    tracing::debug!(state = ?run.final_state(), watch = ?run.watch, "Finished");
    Ok(())
}

/// Log to stderr; stdout carries the user-facing progress.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
    tracing::debug!("Verbose mode enabled");
}
