//! Adapter to the external transfer tool
//!
//! The orchestrator only depends on [`TransferTool`]; [`RsyncTool`] is the
//! production implementation.

mod rsync;

pub use rsync::{RsyncTool, parse_itemized_changes};

use dirpush_fs::NormalizedPath;

/// One side of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A path on this machine
    Local(NormalizedPath),
    /// A path on the remote host, addressed through `prefix` (`user@host:`)
    Remote { prefix: String, path: NormalizedPath },
}

impl Endpoint {
    /// Render the endpoint as a transfer-tool argument.
    ///
    /// Both sides of a directory sync carry a trailing separator so the
    /// tool copies the directory's contents rather than nesting the
    /// directory itself inside the destination.
    pub fn render(&self) -> String {
        match self {
            Self::Local(path) => path.with_trailing_separator(),
            Self::Remote { prefix, path } => {
                format!("{}{}", prefix, path.with_trailing_separator())
            }
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        match self {
            Self::Local(path) | Self::Remote { path, .. } => path,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Base name of the endpoint path.
    pub fn base_name(&self) -> &str {
        self.path().file_name().unwrap_or("root")
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// A single change reported by the transfer tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Path relative to the transfer root
    pub path: String,
    /// One-line summary such as `created`, `updated` or `deleted`
    pub summary: String,
}

impl ChangeRecord {
    pub fn new(path: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            summary: summary.into(),
        }
    }
}

/// Outcome of one transfer tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    Success { changes: Vec<ChangeRecord> },
    Failure { error: String },
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Changes reported on success; empty on failure.
    pub fn changes(&self) -> &[ChangeRecord] {
        match self {
            Self::Success { changes } => changes,
            Self::Failure { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// An external program that copies a source tree onto a destination.
pub trait TransferTool {
    /// Transfer `source` onto `destination` with `options`, in that order.
    ///
    /// Never retries; any problem is a [`TransferResult::Failure`].
    fn run(&self, source: &str, destination: &str, options: &[String]) -> TransferResult;
}

/// Issues transfers between endpoints through a [`TransferTool`].
pub struct TransferInvoker<'a> {
    tool: &'a dyn TransferTool,
}

impl<'a> TransferInvoker<'a> {
    pub fn new(tool: &'a dyn TransferTool) -> Self {
        Self { tool }
    }

    pub fn invoke(&self, source: &Endpoint, destination: &Endpoint, options: &[String]) -> TransferResult {
        let (source, destination) = (source.render(), destination.render());
        tracing::debug!(%source, %destination, ?options, "Invoking transfer");
        let result = self.tool.run(&source, &destination, options);
        match &result {
            TransferResult::Success { changes } => {
                tracing::debug!(changes = changes.len(), "Transfer succeeded")
            }
            TransferResult::Failure { error } => tracing::debug!(%error, "Transfer failed"),
        }
        result
    }
}
