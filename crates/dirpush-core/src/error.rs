//! Error types for dirpush-core

use std::path::PathBuf;

/// Result type for dirpush-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating a synchronization run
///
/// A failed initial transfer is not an error: it is reported through
/// [`crate::TransferResult::Failure`] and the run continues to the watcher.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local directory does not exist or is not a directory
    #[error("Directory \"{}\" does not exist", path.display())]
    InvalidDirectory { path: PathBuf },

    /// Remote user resolved to an empty string
    #[error("Remote user is empty; pass --user or set $USER")]
    InvalidUser,

    /// Remote address is missing or a home-directory placeholder
    #[error("Remote address \"{address}\" is invalid")]
    InvalidRemoteAddress { address: String },

    /// Watch command could not be parsed
    #[error("Invalid watch command \"{command}\": {message}")]
    InvalidWatchCommand { command: String, message: String },

    /// Settings workspace or one of its artifacts could not be created
    #[error("Failed to prepare settings workspace: {0}")]
    Setup(#[source] dirpush_fs::Error),

    /// Snapshot of the side about to be overwritten failed
    #[error("Backup of {side} failed: {message}")]
    Backup { side: String, message: String },

    /// The watcher process could not be started
    #[error("Failed to launch watcher `{command}`: {source}")]
    WatchLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The watcher process exited with a failure status
    #[error("Watcher `{command}` exited with status {code}")]
    WatchFailed { command: String, code: i32 },

    /// Settings workspace could not be removed after watching
    #[error("Failed to remove settings workspace: {0}")]
    Cleanup(#[source] dirpush_fs::Error),
}

impl Error {
    /// Whether the error was raised while validating the invocation,
    /// before anything was written to disk.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDirectory { .. }
                | Self::InvalidUser
                | Self::InvalidRemoteAddress { .. }
                | Self::InvalidWatchCommand { .. }
        )
    }
}
