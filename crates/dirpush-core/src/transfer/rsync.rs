//! rsync implementation of [`TransferTool`]

use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;

use super::{ChangeRecord, TransferResult, TransferTool};
use crate::spec::DEFAULT_RSYNC_PROGRAM;

/// `YXcstpoguax path`, as printed by `--itemize-changes`.
static ITEMIZED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([<>ch.])([fdLDS])([.+?a-zA-Z ]{7,9}) (.+)$").expect("valid itemize pattern")
});

/// `*deleting   path`
static DELETED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*deleting\s+(.+)$").expect("valid deleting pattern"));

/// Attribute columns following the update and file type characters.
const ATTRIBUTES: &[(usize, &str)] = &[
    (0, "checksum"),
    (1, "size"),
    (2, "timestamp"),
    (3, "permissions"),
    (4, "owner"),
    (5, "group"),
    (7, "acl"),
    (8, "xattr"),
];

/// Runs the `rsync` executable.
#[derive(Debug, Clone)]
pub struct RsyncTool {
    program: PathBuf,
}

impl Default for RsyncTool {
    fn default() -> Self {
        Self::new(DEFAULT_RSYNC_PROGRAM)
    }
}

impl RsyncTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TransferTool for RsyncTool {
    fn run(&self, source: &str, destination: &str, options: &[String]) -> TransferResult {
        let mut args = options.to_vec();
        if !requests_itemized(options) {
            args.push("--itemize-changes".to_string());
        }

        let output = match Command::new(&self.program)
            .args(&args)
            .arg(source)
            .arg(destination)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                return TransferResult::Failure {
                    error: format!("failed to launch {}: {}", self.program.display(), e),
                };
            }
        };

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            TransferResult::Success {
                changes: parse_itemized_changes(&stdout),
            }
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let error = if stderr.is_empty() {
                format!(
                    "{} exited with status {}",
                    self.program.display(),
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr
            };
            TransferResult::Failure { error }
        }
    }
}

fn requests_itemized(options: &[String]) -> bool {
    options.iter().any(|o| {
        o == "--itemize-changes"
            || (o.starts_with('-') && !o.starts_with("--") && o.contains('i'))
    })
}

/// Extract change records from itemized rsync output.
///
/// Lines that are not itemized changes (progress, totals, file lists) and
/// entries with nothing changed are skipped.
pub fn parse_itemized_changes(output: &str) -> Vec<ChangeRecord> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_end();
            if let Some(caps) = DELETED_LINE.captures(line) {
                return Some(ChangeRecord::new(&caps[1], "deleted"));
            }
            let caps = ITEMIZED_LINE.captures(line)?;
            let summary = summarize(&caps[1], &caps[3])?;
            Some(ChangeRecord::new(&caps[4], summary))
        })
        .collect()
}

fn summarize(update: &str, attributes: &str) -> Option<String> {
    if attributes.chars().all(|c| c == '+') {
        return Some("created".to_string());
    }
    match update {
        "<" | ">" => Some("updated".to_string()),
        "h" => Some("hard link".to_string()),
        _ => {
            let changed: Vec<&str> = ATTRIBUTES
                .iter()
                .filter(|(idx, _)| {
                    attributes
                        .chars()
                        .nth(*idx)
                        .is_some_and(|c| c.is_ascii_alphabetic())
                })
                .map(|(_, name)| *name)
                .collect();
            if changed.is_empty() {
                None
            } else {
                Some(format!("{} changed", changed.join(", ")))
            }
        }
    }
}
