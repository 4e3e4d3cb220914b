//! [`TestProject`] builder for synchronization scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary tree with three sibling directories:
///
/// - `work/` is the invocation working directory (settings workspaces land here)
/// - `<name>/` is the local source directory
/// - `remote/<name>/` stands in for the remote side in local-only runs
///
/// # Example
///
/// ```rust,no_run
/// use dirpush_test_utils::project::TestProject;
///
/// let project = TestProject::new("proj").with_gitignore("*.log\n");
/// project.write_source("src/main.rs", "fn main() {}");
/// assert!(project.source().join(".gitignore").exists());
/// ```
pub struct TestProject {
    temp_dir: TempDir,
    name: String,
}

impl TestProject {
    /// Create `work/` and an empty source directory called `name`.
    pub fn new(name: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("work")).unwrap();
        fs::create_dir_all(temp_dir.path().join(name)).unwrap();
        Self {
            temp_dir,
            name: name.to_string(),
        }
    }

    /// Write a `.gitignore` into the source directory.
    pub fn with_gitignore(self, content: &str) -> Self {
        self.write_source(".gitignore", content);
        self
    }

    /// Create the stand-in remote directory.
    pub fn with_remote_dir(self) -> Self {
        fs::create_dir_all(self.remote_dir()).unwrap();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Invocation working directory.
    pub fn work_dir(&self) -> PathBuf {
        self.root().join("work")
    }

    /// Local source directory.
    pub fn source(&self) -> PathBuf {
        self.root().join(&self.name)
    }

    /// Stand-in remote directory.
    pub fn remote_dir(&self) -> PathBuf {
        self.root().join("remote").join(&self.name)
    }

    /// Expected settings workspace path for this project.
    pub fn settings_dir(&self) -> PathBuf {
        self.work_dir().join(format!(".{}.dirpush-settings", self.name))
    }

    /// Write a file relative to the source directory, creating parents.
    pub fn write_source(&self, relative: &str, content: &str) {
        write_file(&self.source().join(relative), content);
    }

    /// Write a file relative to the stand-in remote directory.
    pub fn write_remote(&self, relative: &str, content: &str) {
        write_file(&self.remote_dir().join(relative), content);
    }

    /// Read a file relative to the settings workspace.
    pub fn read_setting(&self, relative: &str) -> String {
        fs::read_to_string(self.settings_dir().join(relative)).unwrap()
    }

    /// Assert a file exists relative to the settings workspace.
    pub fn assert_setting_exists(&self, relative: &str) {
        let path = self.settings_dir().join(relative);
        assert!(path.exists(), "Expected settings file {} to exist", path.display());
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
