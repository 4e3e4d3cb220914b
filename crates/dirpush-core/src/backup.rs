//! Pre-transfer snapshot of the side about to be overwritten
//!
//! Snapshots are stored at `<workspace>/<name>.bak/` and are never restored
//! automatically; they exist for manual recovery only.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use dirpush_fs::io;
use regex::Regex;

use crate::transfer::{Endpoint, TransferResult, TransferTool};
use crate::{Error, Result};

/// Options for the remote snapshot copy: no delete, no exclusions.
const SNAPSHOT_OPTIONS: &[&str] = &["-a"];

/// `rsync: [sender] change_dir "/srv/proj" failed: No such file or directory (2)`
static MISSING_PATH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^rsync: (?:\[\w+\] )?(?:change_dir|link_stat) "(.*)" failed: No such file or directory \(2\)$"#)
        .expect("valid missing path pattern")
});

/// Summary line rsync prints after a partial transfer.
static PARTIAL_TRANSFER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rsync error: .*\(code 23\)").expect("valid partial transfer pattern")
});

/// A completed backup.
#[derive(Debug, Clone)]
pub struct BackupSnapshot {
    /// Snapshot directory inside the settings workspace
    pub path: PathBuf,
    /// Rendered endpoint that was copied
    pub source: String,
    /// False when the side did not exist yet and nothing was copied
    pub captured: bool,
    pub created: DateTime<Utc>,
}

/// Copies the overwritten side into the workspace before a transfer.
pub struct BackupStep<'a> {
    tool: &'a dyn TransferTool,
    exclude: Vec<PathBuf>,
}

impl<'a> BackupStep<'a> {
    /// `tool` is used for remote sides only; local sides are copied directly.
    pub fn new(tool: &'a dyn TransferTool) -> Self {
        Self {
            tool,
            exclude: Vec::new(),
        }
    }

    /// Leave `path` out of local snapshots, e.g. a workspace nested in the
    /// directory being backed up.
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude.push(path.into());
        self
    }

    /// Recursively copy `side` into `destination`.
    ///
    /// A leftover snapshot at `destination` is replaced. A side that does not
    /// exist yet yields an empty snapshot. Any other failure is an
    /// [`Error::Backup`] and the caller must not go on to transfer.
    pub fn backup_before_overwrite(&self, side: &Endpoint, destination: &Path) -> Result<BackupSnapshot> {
        let source = side.render();
        let fail = |message: String| Error::Backup {
            side: source.clone(),
            message,
        };

        io::remove_dir_all_if_exists(destination).map_err(|e| fail(e.to_string()))?;
        std::fs::create_dir_all(destination).map_err(|e| fail(e.to_string()))?;

        let captured = match side {
            Endpoint::Local(path) => {
                if path.is_dir() {
                    let exclude: Vec<&Path> = self.exclude.iter().map(PathBuf::as_path).collect();
                    io::copy_dir_all(&path.to_native(), destination, &exclude)
                        .map_err(|e| fail(e.to_string()))?;
                    true
                } else if path.exists() {
                    return Err(fail(format!("{} is not a directory", path)));
                } else {
                    false
                }
            }
            Endpoint::Remote { path, .. } => {
                let options: Vec<String> = SNAPSHOT_OPTIONS.iter().map(|o| o.to_string()).collect();
                let target = format!("{}/", destination.display());
                match self.tool.run(&source, &target, &options) {
                    TransferResult::Success { .. } => true,
                    TransferResult::Failure { error } if only_root_missing(&error, path.as_str()) => {
                        false
                    }
                    TransferResult::Failure { error } => return Err(fail(error)),
                }
            }
        };

        if captured {
            tracing::info!(%source, snapshot = %destination.display(), "Backed up");
        } else {
            tracing::warn!(%source, "Nothing to back up; side does not exist yet");
        }

        Ok(BackupSnapshot {
            path: destination.to_path_buf(),
            source,
            captured,
            created: Utc::now(),
        })
    }
}

/// Whether `error` says nothing but "the transfer root does not exist".
///
/// Any other error line (unreadable files, a vanished file below the root,
/// a failed ssh launch) means the snapshot is incomplete.
fn only_root_missing(error: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    let mut root_missing = false;
    for line in error.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(caps) = MISSING_PATH_LINE.captures(line) {
            let reported = caps[1].trim_end_matches("/.").trim_end_matches('/');
            if reported == root || reported.ends_with(&format!("/{}", root)) {
                root_missing = true;
                continue;
            }
            return false;
        }
        if !PARTIAL_TRANSFER_LINE.is_match(line) {
            return false;
        }
    }
    root_missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use dirpush_fs::NormalizedPath;
    use std::cell::RefCell;

    struct ScriptedTool {
        result: TransferResult,
        calls: RefCell<Vec<(String, String, Vec<String>)>>,
    }

    impl ScriptedTool {
        fn new(result: TransferResult) -> Self {
            Self {
                result,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl TransferTool for ScriptedTool {
        fn run(&self, source: &str, destination: &str, options: &[String]) -> TransferResult {
            self.calls
                .borrow_mut()
                .push((source.into(), destination.into(), options.to_vec()));
            self.result.clone()
        }
    }

    fn remote() -> Endpoint {
        Endpoint::Remote {
            prefix: "user@host:".into(),
            path: NormalizedPath::new("/srv/proj"),
        }
    }

    #[test]
    fn local_side_is_copied() {
        let side = assert_fs::TempDir::new().unwrap();
        side.child("keep.txt").write_str("precious").unwrap();
        let ws = assert_fs::TempDir::new().unwrap();
        let tool = ScriptedTool::new(TransferResult::Success { changes: vec![] });

        let snapshot = BackupStep::new(&tool)
            .backup_before_overwrite(
                &Endpoint::Local(NormalizedPath::new(side.path())),
                &ws.path().join("proj.bak"),
            )
            .unwrap();

        assert!(snapshot.captured);
        ws.child("proj.bak/keep.txt").assert("precious");
        assert!(tool.calls.borrow().is_empty());
    }

    #[test]
    fn leftover_snapshot_is_replaced() {
        let side = assert_fs::TempDir::new().unwrap();
        side.child("new.txt").write_str("new").unwrap();
        let ws = assert_fs::TempDir::new().unwrap();
        ws.child("proj.bak/stale.txt").write_str("stale").unwrap();
        let tool = ScriptedTool::new(TransferResult::Success { changes: vec![] });

        BackupStep::new(&tool)
            .backup_before_overwrite(
                &Endpoint::Local(NormalizedPath::new(side.path())),
                &ws.path().join("proj.bak"),
            )
            .unwrap();

        assert!(!ws.path().join("proj.bak/stale.txt").exists());
        ws.child("proj.bak/new.txt").assert("new");
    }

    #[test]
    fn missing_local_side_gives_empty_snapshot() {
        let ws = assert_fs::TempDir::new().unwrap();
        let tool = ScriptedTool::new(TransferResult::Success { changes: vec![] });
        let missing = ws.path().join("not-there");

        let snapshot = BackupStep::new(&tool)
            .backup_before_overwrite(
                &Endpoint::Local(NormalizedPath::new(&missing)),
                &ws.path().join("not-there.bak"),
            )
            .unwrap();

        assert!(!snapshot.captured);
        assert!(snapshot.path.is_dir());
    }

    #[test]
    fn remote_side_uses_non_destructive_options() {
        let ws = assert_fs::TempDir::new().unwrap();
        let tool = ScriptedTool::new(TransferResult::Success { changes: vec![] });
        let destination = ws.path().join("proj.bak");

        BackupStep::new(&tool)
            .backup_before_overwrite(&remote(), &destination)
            .unwrap();

        let calls = tool.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "user@host:/srv/proj/");
        assert_eq!(calls[0].1, format!("{}/", destination.display()));
        assert_eq!(calls[0].2, vec!["-a".to_string()]);
    }

    #[test]
    fn missing_remote_side_gives_empty_snapshot() {
        let ws = assert_fs::TempDir::new().unwrap();
        let tool = ScriptedTool::new(TransferResult::Failure {
            error: "rsync: [sender] change_dir \"/srv/proj\" failed: No such file or directory (2)\n\
                    rsync error: some files/attrs were not transferred (see previous errors) (code 23) at main.c(1338) [Receiver=3.2.7]"
                .into(),
        });

        let snapshot = BackupStep::new(&tool)
            .backup_before_overwrite(&remote(), &ws.path().join("proj.bak"))
            .unwrap();

        assert!(!snapshot.captured);
    }

    #[test]
    fn partial_transfer_with_vanished_file_is_a_backup_error() {
        let ws = assert_fs::TempDir::new().unwrap();
        let tool = ScriptedTool::new(TransferResult::Failure {
            error: "rsync: [sender] send_files failed to open \"/srv/proj/secret\": Permission denied (13)\n\
                    rsync: [sender] link_stat \"/srv/proj/tmp.lock\" failed: No such file or directory (2)\n\
                    rsync error: some files/attrs were not transferred (see previous errors) (code 23) at main.c(1338) [Receiver=3.2.7]"
                .into(),
        });

        let err = BackupStep::new(&tool)
            .backup_before_overwrite(&remote(), &ws.path().join("proj.bak"))
            .unwrap_err();

        assert!(matches!(err, Error::Backup { .. }));
    }

    #[test]
    fn ssh_launch_failure_is_a_backup_error() {
        let ws = assert_fs::TempDir::new().unwrap();
        let tool = ScriptedTool::new(TransferResult::Failure {
            error: "rsync: Failed to exec ssh: No such file or directory (2)\n\
                    rsync error: error in IPC code (code 14) at pipe.c(85) [Receiver=3.2.7]"
                .into(),
        });

        let err = BackupStep::new(&tool)
            .backup_before_overwrite(&remote(), &ws.path().join("proj.bak"))
            .unwrap_err();

        assert!(matches!(err, Error::Backup { .. }));
    }

    #[test]
    fn root_detection_accepts_only_the_requested_root() {
        let missing = |path: &str| format!("rsync: link_stat \"{}\" failed: No such file or directory (2)", path);

        assert!(only_root_missing(&missing("/srv/proj/."), "/srv/proj"));
        assert!(only_root_missing(&missing("/home/user/projects/proj"), "projects/proj"));
        assert!(!only_root_missing(&missing("/srv/proj/sub"), "/srv/proj"));
        assert!(!only_root_missing(&missing("/srv/project"), "/srv/proj"));
        assert!(!only_root_missing("", "/srv/proj"));
    }

    #[test]
    fn local_copy_skips_excluded_paths() {
        let side = assert_fs::TempDir::new().unwrap();
        side.child("keep.txt").write_str("precious").unwrap();
        side.child(".proj.dirpush-settings/config.yml").write_str("x").unwrap();
        let destination = side.path().join(".proj.dirpush-settings").join("proj.bak");
        let tool = ScriptedTool::new(TransferResult::Success { changes: vec![] });

        let snapshot = BackupStep::new(&tool)
            .exclude(side.path().join(".proj.dirpush-settings"))
            .backup_before_overwrite(&Endpoint::Local(NormalizedPath::new(side.path())), &destination)
            .unwrap();

        assert!(snapshot.captured);
        assert_eq!(std::fs::read_to_string(destination.join("keep.txt")).unwrap(), "precious");
        assert!(!destination.join(".proj.dirpush-settings").exists());
    }

    #[test]
    fn remote_failure_is_a_backup_error() {
        let ws = assert_fs::TempDir::new().unwrap();
        let tool = ScriptedTool::new(TransferResult::Failure {
            error: "connection refused".into(),
        });

        let err = BackupStep::new(&tool)
            .backup_before_overwrite(&remote(), &ws.path().join("proj.bak"))
            .unwrap_err();

        assert!(matches!(err, Error::Backup { ref message, .. } if message == "connection refused"));
    }
}
