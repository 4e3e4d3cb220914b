//! Recording fakes for the transfer tool, watcher and reporter.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dirpush_core::{
    Direction, Error, Result, SyncEvent, SyncReporter, SyncRequest, TransferResult, TransferTool,
    WatchOutcome, Watcher,
};
use dirpush_test_utils::project::TestProject;

/// One recorded transfer tool invocation.
#[derive(Debug, Clone)]
pub struct TransferCall {
    pub source: String,
    pub destination: String,
    pub options: Vec<String>,
    pub started: SystemTime,
}

/// Returns queued results in order, then succeeds with no changes.
#[derive(Default)]
pub struct RecordingTransfer {
    results: RefCell<VecDeque<TransferResult>>,
    pub calls: RefCell<Vec<TransferCall>>,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, result: TransferResult) -> Self {
        self.results.borrow_mut().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<TransferCall> {
        self.calls.borrow().clone()
    }

    /// The last call, which is the initial sync in an orchestrated run.
    pub fn last_call(&self) -> TransferCall {
        self.calls.borrow().last().cloned().expect("no transfer call recorded")
    }
}

impl TransferTool for RecordingTransfer {
    fn run(&self, source: &str, destination: &str, options: &[String]) -> TransferResult {
        self.calls.borrow_mut().push(TransferCall {
            source: source.to_string(),
            destination: destination.to_string(),
            options: options.to_vec(),
            started: SystemTime::now(),
        });
        self.results
            .borrow_mut()
            .pop_front()
            .unwrap_or(TransferResult::Success { changes: vec![] })
    }
}

/// How the fake watcher ends.
#[derive(Debug, Clone, Copy)]
pub enum WatchScript {
    Exit,
    Interrupt,
    Fail(i32),
    Panic,
}

/// Records the directory it was started in and what it found there.
pub struct ScriptedWatcher {
    script: WatchScript,
    pub started_in: RefCell<Option<PathBuf>>,
    pub saw_artifacts: RefCell<Vec<String>>,
}

impl ScriptedWatcher {
    pub fn new(script: WatchScript) -> Self {
        Self {
            script,
            started_in: RefCell::new(None),
            saw_artifacts: RefCell::new(Vec::new()),
        }
    }

    pub fn was_started(&self) -> bool {
        self.started_in.borrow().is_some()
    }
}

impl Watcher for ScriptedWatcher {
    fn describe(&self) -> String {
        "scripted-watcher".to_string()
    }

    fn watch(&self, working_dir: &Path) -> Result<WatchOutcome> {
        *self.started_in.borrow_mut() = Some(working_dir.to_path_buf());
        let mut names: Vec<String> = std::fs::read_dir(working_dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        *self.saw_artifacts.borrow_mut() = names;

        match self.script {
            WatchScript::Exit => Ok(WatchOutcome::Exited),
            WatchScript::Interrupt => Ok(WatchOutcome::Interrupted),
            WatchScript::Fail(code) => Err(Error::WatchFailed {
                command: self.describe(),
                code,
            }),
            WatchScript::Panic => panic!("watcher crashed"),
        }
    }
}

/// Collects every reported event.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: RefCell<Vec<SyncEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.borrow().clone()
    }
}

impl SyncReporter for RecordingReporter {
    fn report(&self, event: &SyncEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// A push/pull request for `project` against `user@<remote>`.
pub fn request(project: &TestProject, remote: Option<&str>, direction: Direction) -> SyncRequest {
    SyncRequest {
        directory: project.source(),
        remote_address: remote.map(str::to_string),
        user: Some("user".to_string()),
        direction,
        ..SyncRequest::default()
    }
}

/// A local-only request targeting the project's stand-in remote directory.
pub fn local_only_request(project: &TestProject, direction: Direction) -> SyncRequest {
    SyncRequest {
        remote_path: Some(project.remote_dir().to_string_lossy().to_string()),
        allow_local_only: true,
        ..request(project, None, direction)
    }
}
