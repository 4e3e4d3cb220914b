//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use walkdir::WalkDir;

use crate::{Error, NormalizedPath, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so a reader never observes a partially
/// written artifact. The parent directory must already exist.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    // Temp file in the same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    Ok(())
}

/// Write content only when nothing exists at `path` yet.
///
/// Returns `true` when the file was written and `false` when an existing
/// file was left untouched.
pub fn write_if_absent(path: &NormalizedPath, content: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_atomic(path, content)?;
    Ok(true)
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Recursively copy the directory tree at `source` into `destination`.
///
/// `destination` is created if needed. Entries at any path in `exclude`, and
/// `destination` itself when it lies inside `source`, are skipped together
/// with everything below them. Symbolic links are recreated as links on Unix
/// and skipped elsewhere. Returns the number of regular files copied.
pub fn copy_dir_all(source: &Path, destination: &Path, exclude: &[&Path]) -> Result<u64> {
    fs::create_dir_all(destination).map_err(|e| Error::io(destination, e))?;

    let source = dunce::canonicalize(source).map_err(|e| Error::io(source, e))?;
    let destination = dunce::canonicalize(destination).map_err(|e| Error::io(destination, e))?;
    let skipped: Vec<PathBuf> = std::iter::once(destination.clone())
        .chain(exclude.iter().filter_map(|path| dunce::canonicalize(path).ok()))
        .collect();

    let mut copied = 0;
    let walker = WalkDir::new(&source)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !skipped.iter().any(|skip| entry.path() == skip.as_path()));
    for entry in walker {
        let entry = entry.map_err(|e| Error::Walk {
            path: source.clone(),
            message: e.to_string(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .map_err(|e| Error::Walk {
                path: entry.path().to_path_buf(),
                message: e.to_string(),
            })?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(entry.path(), e))?;
            copied += 1;
        }
    }

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        files = copied,
        excluded = skipped.len(),
        "Copied directory tree"
    );
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let pointee = fs::read_link(link).map_err(|e| Error::io(link, e))?;
    std::os::unix::fs::symlink(&pointee, target).map_err(|e| Error::io(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _target: &Path) -> Result<()> {
    tracing::warn!(path = %link.display(), "Skipping symbolic link");
    Ok(())
}

/// Recursively remove `path`, treating an already missing directory as done.
///
/// Returns `true` when something was removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}
