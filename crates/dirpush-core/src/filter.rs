//! Exclusion filter derivation

use std::fs;
use std::path::{Path, PathBuf};

use dirpush_fs::{NormalizedPath, io};

use crate::{Error, Result};

const IGNORE_FILE_NAME: &str = ".gitignore";

/// Where the exclusion filter came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    /// Copied verbatim from the source directory's ignore file
    Gitignore(PathBuf),
    /// No ignore file and no prior filter: an empty filter excludes nothing
    CreatedEmpty,
    /// No ignore file; the existing filter was left untouched
    Existing,
}

/// Make sure an exclusion filter exists at `filter_path`.
///
/// `.gitignore` in `source_dir` is preferred and overwrites any prior
/// filter; rsync exclude rules share its syntax closely enough to be used
/// without translation. An unreadable ignore file is an error.
pub fn ensure_filter_present(source_dir: &Path, filter_path: &NormalizedPath) -> Result<FilterSource> {
    let ignore_file = source_dir.join(IGNORE_FILE_NAME);

    if ignore_file.exists() {
        let content = fs::read(&ignore_file)
            .map_err(|e| Error::Setup(dirpush_fs::Error::io(&ignore_file, e)))?;
        io::write_atomic(filter_path, &content).map_err(Error::Setup)?;
        tracing::debug!(from = %ignore_file.display(), to = %filter_path, "Copied ignore file into filter");
        return Ok(FilterSource::Gitignore(ignore_file));
    }

    if io::write_if_absent(filter_path, b"").map_err(Error::Setup)? {
        Ok(FilterSource::CreatedEmpty)
    } else {
        Ok(FilterSource::Existing)
    }
}
