//! Terminal output for orchestration events

use colored::Colorize;
use dirpush_core::{Direction, FilterSource, SyncEvent, SyncReporter};

/// Prints events as they happen.
pub struct TerminalReporter;

impl SyncReporter for TerminalReporter {
    fn report(&self, event: &SyncEvent) {
        match event {
            SyncEvent::WorkspaceCreated { path } => {
                println!("Creating settings directory, \"{}\".", path)
            }
            SyncEvent::FilterResolved(FilterSource::Gitignore(path)) => println!(
                "Using \"{}\" as rsync-filter since they have the same format.",
                path.display()
            ),
            SyncEvent::FilterResolved(FilterSource::CreatedEmpty) => {
                println!("Creating empty rsync-filter file.")
            }
            SyncEvent::FilterResolved(FilterSource::Existing) => {
                println!("Keeping existing rsync-filter file.")
            }
            SyncEvent::ConfigWritten { path } => println!("Creating config file in \"{}\".", path),
            SyncEvent::BootstrapWritten { path } => println!("Creating Guardfile in \"{}\".", path),
            SyncEvent::BackupCreated { source, snapshot } => println!(
                "Backed up \"{}\" to \"{}\".",
                source,
                snapshot.display()
            ),
            SyncEvent::TransferStarted {
                direction: Direction::Push,
                source,
                destination,
            } => println!("Pushing \"{}\" to \"{}\".", source, destination),
            SyncEvent::TransferStarted {
                direction: Direction::Pull,
                source,
                destination,
            } => println!(
                "Pulling from \"{}\" and replacing the contents of \"{}\".",
                source, destination
            ),
            SyncEvent::Change(change) => {
                println!("  {} ({})", change.path, change.summary.dimmed())
            }
            SyncEvent::TransferFailed { error } => {
                eprintln!("{}: {}", "initial sync failed".yellow().bold(), error);
                eprintln!("Continuing to watch; the next change will retry.");
            }
            SyncEvent::WatchStarting { command } => {
                println!("{} {}", "Starting watcher:".green().bold(), command.cyan())
            }
            SyncEvent::WorkspaceRemoved { path } => {
                println!("Removing settings directory, \"{}\".", path)
            }
            SyncEvent::WorkspacePreserved { path } => {
                println!("Keeping settings directory, \"{}\".", path)
            }
        }
    }
}
