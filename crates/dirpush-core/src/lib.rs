//! Synchronization orchestration for dirpush
//!
//! Drives a one-way directory synchronization between a local directory and
//! a remote host:
//!
//! - **PathResolver / SyncSpec**: validated, immutable description of one invocation
//! - **SettingsWorkspace**: hidden per-invocation directory holding generated artifacts
//! - **Exclusion filter**: `.gitignore`-derived rules handed to the transfer tool
//! - **TransferInvoker / BackupStep**: adapters over an external transfer tool
//! - **SyncOrchestrator**: the ordered state machine ending in a watcher handoff
//!
//! # Architecture
//!
//! ```text
//!                    dirpush-cli
//!                         |
//!                   dirpush-core
//!          +------+-------+--------+--------+
//!          |      |       |        |        |
//!       spec  workspace transfer backup  watcher
//!                         |
//!                    dirpush-fs
//! ```

pub mod artifacts;
pub mod backup;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod reporter;
pub mod spec;
pub mod transfer;
pub mod watcher;
pub mod workspace;

pub use artifacts::{ArtifactReport, WatchConfig};
pub use backup::{BackupSnapshot, BackupStep};
pub use error::{Error, Result};
pub use filter::{FilterSource, ensure_filter_present};
pub use orchestrator::{SyncOrchestrator, SyncRun, SyncState};
pub use reporter::{SyncEvent, SyncReporter, TracingReporter};
pub use spec::{Direction, PathResolver, SyncRequest, SyncSpec};
pub use transfer::{
    ChangeRecord, Endpoint, RsyncTool, TransferInvoker, TransferResult, TransferTool,
};
pub use watcher::{CommandWatcher, WatchOutcome, Watcher};
pub use workspace::{SettingsWorkspace, TeardownOutcome, WorkspaceGuard};

/// Name used for the hidden settings workspace directory.
pub const TOOL_NAME: &str = "dirpush";
