//! Foreground handoff to the external watch process

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use crate::{Error, Result};

/// Command used when none is configured.
pub const DEFAULT_WATCH_COMMAND: &str = "bundle exec guard";

/// Time the watcher gets to exit on its own after an interrupt.
const INTERRUPT_GRACE: Duration = Duration::from_secs(5);

/// Exit codes shells report for processes ended by SIGINT or SIGTERM.
const SIGNAL_EXIT_CODES: &[i32] = &[130, 143];

/// How the watcher ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Exited on its own with success status
    Exited,
    /// Stopped by an interrupt or termination signal
    Interrupted,
}

/// A long-running process that re-triggers transfers on file events.
pub trait Watcher {
    /// Human-readable command line, for reporting.
    fn describe(&self) -> String;

    /// Run in `working_dir`, blocking until the watcher exits.
    fn watch(&self, working_dir: &Path) -> Result<WatchOutcome>;
}

/// Runs an external command as the watcher.
#[derive(Debug, Clone)]
pub struct CommandWatcher {
    program: String,
    args: Vec<String>,
}

impl Default for CommandWatcher {
    fn default() -> Self {
        Self {
            program: "bundle".to_string(),
            args: vec!["exec".to_string(), "guard".to_string()],
        }
    }
}

impl CommandWatcher {
    /// Parse a shell-style command line such as `bundle exec guard -i`.
    pub fn parse(command_line: &str) -> Result<Self> {
        let invalid = |message: String| Error::InvalidWatchCommand {
            command: command_line.to_string(),
            message,
        };
        let mut words = shell_words::split(command_line).map_err(|e| invalid(e.to_string()))?;
        if words.is_empty() {
            return Err(invalid("command is empty".to_string()));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }

    async fn run_foreground(&self, working_dir: &Path) -> Result<WatchOutcome> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .current_dir(working_dir)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| self.launch_error(source))?;

        let signal = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| self.launch_error(source))?;
                return self.classify(status);
            }
            signal = shutdown_signal() => signal,
        };

        if let Err(e) = signal {
            tracing::warn!(error = %e, "Could not listen for interrupts");
            let status = child.wait().await.map_err(|source| self.launch_error(source))?;
            return self.classify(status);
        }

        tracing::info!("Interrupt received; waiting for watcher to exit");
        if tokio::time::timeout(INTERRUPT_GRACE, child.wait()).await.is_err() {
            tracing::warn!("Watcher did not exit in time; killing it");
            child.kill().await.map_err(|source| self.launch_error(source))?;
        }
        Ok(WatchOutcome::Interrupted)
    }

    fn classify(&self, status: ExitStatus) -> Result<WatchOutcome> {
        match status.code() {
            Some(0) => Ok(WatchOutcome::Exited),
            Some(code) if SIGNAL_EXIT_CODES.contains(&code) => Ok(WatchOutcome::Interrupted),
            Some(code) => Err(Error::WatchFailed {
                command: self.describe(),
                code,
            }),
            None => Ok(WatchOutcome::Interrupted),
        }
    }

    fn launch_error(&self, source: std::io::Error) -> Error {
        Error::WatchLaunch {
            command: self.describe(),
            source,
        }
    }
}

impl Watcher for CommandWatcher {
    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn watch(&self, working_dir: &Path) -> Result<WatchOutcome> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| self.launch_error(source))?;
        runtime.block_on(self.run_foreground(working_dir))
    }
}

/// Resolves on Ctrl-C, or on SIGTERM on Unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
