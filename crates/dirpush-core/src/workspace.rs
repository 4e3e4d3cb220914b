//! Hidden per-invocation settings workspace
//!
//! The workspace lives at `<working dir>/.<directory name>.dirpush-settings`
//! and holds the exclusion filter, the watcher configuration, the watcher
//! bootstrap file and backup snapshots. Two invocations against directories
//! with the same base name from the same working directory share it.

use std::fs;
use std::path::Path;

use dirpush_fs::{NormalizedPath, io};

use crate::{Error, Result, TOOL_NAME};

pub const FILTER_FILE_NAME: &str = ".rsync-filter";
pub const CONFIG_FILE_NAME: &str = "config.yml";
pub const BOOTSTRAP_FILE_NAME: &str = "Guardfile";

/// Filesystem-backed settings directory for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsWorkspace {
    root: NormalizedPath,
}

impl SettingsWorkspace {
    /// Derive the workspace for `directory_name` inside `working_dir`.
    pub fn for_directory(working_dir: &Path, directory_name: &str) -> Self {
        let name = format!(".{}.{}-settings", directory_name, TOOL_NAME);
        Self {
            root: NormalizedPath::new(working_dir).join(&name),
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn filter_path(&self) -> NormalizedPath {
        self.root.join(FILTER_FILE_NAME)
    }

    pub fn config_path(&self) -> NormalizedPath {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn watcher_bootstrap_path(&self) -> NormalizedPath {
        self.root.join(BOOTSTRAP_FILE_NAME)
    }

    /// Snapshot directory for a side whose base name is `name`.
    pub fn backup_path(&self, name: &str) -> NormalizedPath {
        self.root.join(&format!("{}.bak", name))
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Create the workspace directory if it is absent.
    ///
    /// Returns `true` when the directory was created by this call.
    pub fn ensure_present(&self) -> Result<bool> {
        let native = self.root.to_native();
        match fs::create_dir(&native) {
            Ok(()) => {
                tracing::debug!(path = %self.root, "Created settings workspace");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && native.is_dir() => {
                Ok(false)
            }
            Err(e) => Err(Error::Setup(dirpush_fs::Error::io(native, e))),
        }
    }

    /// Recursively remove the workspace. A missing workspace is not an error.
    pub fn teardown(&self) -> Result<bool> {
        io::remove_dir_all_if_exists(&self.root.to_native()).map_err(Error::Cleanup)
    }
}

/// What happened to the workspace when its guard was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    Removed,
    Preserved,
}

/// Scoped ownership of the workspace while the watcher runs.
///
/// The workspace is torn down exactly once: either through [`release`]
/// or, on early return and unwinding, when the guard is dropped.
///
/// [`release`]: WorkspaceGuard::release
#[derive(Debug)]
pub struct WorkspaceGuard<'a> {
    workspace: &'a SettingsWorkspace,
    preserve: bool,
    released: bool,
}

impl<'a> WorkspaceGuard<'a> {
    pub fn new(workspace: &'a SettingsWorkspace, preserve: bool) -> Self {
        Self {
            workspace,
            preserve,
            released: false,
        }
    }

    /// Tear down (or keep) the workspace now and report what was done.
    pub fn release(mut self) -> Result<TeardownOutcome> {
        self.released = true;
        self.finish()
    }

    fn finish(&self) -> Result<TeardownOutcome> {
        if self.preserve {
            tracing::info!(path = %self.workspace.root(), "Preserving settings workspace");
            return Ok(TeardownOutcome::Preserved);
        }
        self.workspace.teardown()?;
        tracing::info!(path = %self.workspace.root(), "Removed settings workspace");
        Ok(TeardownOutcome::Removed)
    }
}

impl Drop for WorkspaceGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.finish() {
            tracing::error!(error = %e, "Settings workspace cleanup failed");
        }
    }
}
