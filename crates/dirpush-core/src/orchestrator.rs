//! The synchronization state machine
//!
//! ```text
//! Init -> WorkspaceReady -> ArtifactsReady -> BackedUp -> InitialSyncDone
//!      -> Watching -> CleanedUp | Preserved
//! ```
//!
//! Any fatal error before `Watching` ends in `Failed` with the workspace left
//! in place for diagnosis. Once `Watching` is entered the workspace is owned
//! by a [`WorkspaceGuard`] and released exactly once, whatever the watcher does.

use crate::artifacts::{self, ArtifactReport};
use crate::backup::{BackupSnapshot, BackupStep};
use crate::reporter::{SyncEvent, SyncReporter};
use crate::spec::SyncSpec;
use crate::transfer::{TransferInvoker, TransferResult, TransferTool};
use crate::watcher::{WatchOutcome, Watcher};
use crate::workspace::{TeardownOutcome, WorkspaceGuard};
use crate::{FilterSource, Result};

/// Orchestration states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    WorkspaceReady,
    ArtifactsReady,
    BackedUp,
    InitialSyncDone,
    Watching,
    CleanedUp,
    Preserved,
    Failed,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CleanedUp | Self::Preserved | Self::Failed)
    }
}

/// Report of a completed run.
#[derive(Debug, Clone)]
pub struct SyncRun {
    /// Every state entered, in order
    pub states: Vec<SyncState>,
    pub artifacts: ArtifactReport,
    pub backup: BackupSnapshot,
    /// Outcome of the initial transfer; a failure here does not fail the run
    pub initial_sync: TransferResult,
    pub watch: WatchOutcome,
}

impl SyncRun {
    pub fn final_state(&self) -> SyncState {
        self.states.last().copied().unwrap_or(SyncState::Init)
    }
}

/// Sequences setup, backup, the initial transfer and the watcher handoff.
pub struct SyncOrchestrator<'a> {
    spec: SyncSpec,
    transfer: &'a dyn TransferTool,
    watcher: &'a dyn Watcher,
    reporter: &'a dyn SyncReporter,
    states: Vec<SyncState>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        spec: SyncSpec,
        transfer: &'a dyn TransferTool,
        watcher: &'a dyn Watcher,
        reporter: &'a dyn SyncReporter,
    ) -> Self {
        Self {
            spec,
            transfer,
            watcher,
            reporter,
            states: vec![SyncState::Init],
        }
    }

    pub fn spec(&self) -> &SyncSpec {
        &self.spec
    }

    /// States entered so far, including `Failed` after an error.
    pub fn states(&self) -> &[SyncState] {
        &self.states
    }

    pub fn state(&self) -> SyncState {
        self.states.last().copied().unwrap_or(SyncState::Init)
    }

    /// Run the whole workflow, blocking while the watcher runs.
    pub fn run(&mut self) -> Result<SyncRun> {
        let result = self.run_steps();
        if result.is_err() && !self.states.contains(&SyncState::Watching) {
            self.enter(SyncState::Failed);
        }
        result
    }

    fn run_steps(&mut self) -> Result<SyncRun> {
        let workspace = self.spec.workspace().clone();

        if workspace.ensure_present()? {
            self.reporter.report(&SyncEvent::WorkspaceCreated {
                path: workspace.root().to_string(),
            });
        }
        self.enter(SyncState::WorkspaceReady);

        let artifacts = artifacts::materialize(&self.spec)?;
        self.report_artifacts(&artifacts);
        self.enter(SyncState::ArtifactsReady);

        let side = self.spec.overwritten_side();
        let snapshot_path = workspace.backup_path(side.base_name()).to_native();
        let backup = BackupStep::new(self.transfer)
            .exclude(workspace.root().to_native())
            .backup_before_overwrite(&side, &snapshot_path)?;
        self.reporter.report(&SyncEvent::BackupCreated {
            source: backup.source.clone(),
            snapshot: backup.path.clone(),
        });
        self.enter(SyncState::BackedUp);

        let initial_sync = self.initial_sync();
        self.enter(SyncState::InitialSyncDone);

        let guard = WorkspaceGuard::new(&workspace, self.spec.preserve_settings());
        self.enter(SyncState::Watching);
        self.reporter.report(&SyncEvent::WatchStarting {
            command: self.watcher.describe(),
        });
        let watched = self.watcher.watch(&workspace.root().to_native());

        let released = guard.release();
        if let Ok(outcome) = &released {
            let path = workspace.root().to_string();
            match outcome {
                TeardownOutcome::Removed => {
                    self.reporter.report(&SyncEvent::WorkspaceRemoved { path });
                    self.enter(SyncState::CleanedUp);
                }
                TeardownOutcome::Preserved => {
                    self.reporter.report(&SyncEvent::WorkspacePreserved { path });
                    self.enter(SyncState::Preserved);
                }
            }
        }

        let watch = watched?;
        released?;

        Ok(SyncRun {
            states: self.states.clone(),
            artifacts,
            backup,
            initial_sync,
            watch,
        })
    }

    /// Transfer once in the configured direction. Never fatal.
    fn initial_sync(&self) -> TransferResult {
        let (source, destination) = self.spec.transfer_endpoints();
        self.reporter.report(&SyncEvent::TransferStarted {
            direction: self.spec.direction(),
            source: source.render(),
            destination: destination.render(),
        });

        let result = TransferInvoker::new(self.transfer).invoke(
            &source,
            &destination,
            self.spec.transfer_options(),
        );
        match &result {
            TransferResult::Success { changes } => {
                for change in changes {
                    self.reporter.report(&SyncEvent::Change(change.clone()));
                }
            }
            TransferResult::Failure { error } => {
                self.reporter.report(&SyncEvent::TransferFailed {
                    error: error.clone(),
                });
            }
        }
        result
    }

    fn report_artifacts(&self, artifacts: &ArtifactReport) {
        let workspace = self.spec.workspace();
        if !matches!(artifacts.filter, FilterSource::Existing) {
            self.reporter
                .report(&SyncEvent::FilterResolved(artifacts.filter.clone()));
        }
        if artifacts.config_written {
            self.reporter.report(&SyncEvent::ConfigWritten {
                path: workspace.config_path().to_string(),
            });
        }
        if artifacts.bootstrap_written {
            self.reporter.report(&SyncEvent::BootstrapWritten {
                path: workspace.watcher_bootstrap_path().to_string(),
            });
        }
    }

    fn enter(&mut self, state: SyncState) {
        tracing::debug!(from = ?self.state(), to = ?state, "Orchestrator transition");
        self.states.push(state);
    }
}
