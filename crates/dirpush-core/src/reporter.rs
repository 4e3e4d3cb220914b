//! User-facing progress events emitted while orchestrating

use std::path::PathBuf;

use crate::filter::FilterSource;
use crate::spec::Direction;
use crate::transfer::ChangeRecord;

/// Something the user should hear about during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    WorkspaceCreated { path: String },
    FilterResolved(FilterSource),
    ConfigWritten { path: String },
    BootstrapWritten { path: String },
    BackupCreated { source: String, snapshot: PathBuf },
    TransferStarted { direction: Direction, source: String, destination: String },
    Change(ChangeRecord),
    TransferFailed { error: String },
    WatchStarting { command: String },
    WorkspaceRemoved { path: String },
    WorkspacePreserved { path: String },
}

/// Receives [`SyncEvent`]s as they happen.
pub trait SyncReporter {
    fn report(&self, event: &SyncEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn report(&self, event: &SyncEvent) {
        match event {
            SyncEvent::TransferFailed { error } => {
                tracing::warn!(%error, "Initial sync failed; continuing to watch")
            }
            SyncEvent::Change(change) => {
                tracing::info!(path = %change.path, summary = %change.summary, "Changed")
            }
            other => tracing::info!(event = ?other, "dirpush"),
        }
    }
}
