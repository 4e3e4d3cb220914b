//! Invocation resolution and the immutable `SyncSpec`

use std::path::{Path, PathBuf};

use dirpush_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

use crate::transfer::Endpoint;
use crate::workspace::SettingsWorkspace;
use crate::{Error, Result};

/// Options used when the invocation does not supply its own.
pub const DEFAULT_RSYNC_OPTIONS: &[&str] = &["-arv", "--progress"];

/// Transfer tool executable used when none is configured.
pub const DEFAULT_RSYNC_PROGRAM: &str = "rsync";

/// Timeout flag ensured on every option list.
pub const DEFAULT_TIMEOUT_OPTION: &str = "--timeout=9999";

/// Remote address values meaning "no remote host".
const NO_REMOTE_SENTINELS: &[&str] = &["", "~", "$HOME", "${HOME}"];

/// Orientation of the initial transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local directory -> remote path
    #[default]
    Push,
    /// Remote path -> local directory
    Pull,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
        }
    }
}

/// Raw invocation arguments, before validation.
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// Local directory, relative to the working directory or absolute
    pub directory: PathBuf,
    pub remote_address: Option<String>,
    /// Remote account; falls back to the OS login name
    pub user: Option<String>,
    /// Path on the remote side; defaults to the local absolute path
    pub remote_path: Option<String>,
    pub direction: Direction,
    /// Transfer tool flags; empty means [`DEFAULT_RSYNC_OPTIONS`]
    pub rsync_options: Vec<String>,
    /// Append `--delete` to the transfer options
    pub delete: bool,
    /// Pattern the watcher uses to ignore filesystem events
    pub ignore: Option<String>,
    pub preserve_settings: bool,
    /// Treat a missing or placeholder remote address as local-only
    /// addressing instead of rejecting it
    pub allow_local_only: bool,
    /// Keep delete-style options on watch-triggered re-syncs
    pub delete_on_watch: bool,
    /// Transfer tool executable; [`DEFAULT_RSYNC_PROGRAM`] when unset
    pub rsync_program: Option<String>,
}

/// Resolves and validates directory, user and remote address arguments.
#[derive(Debug, Clone)]
pub struct PathResolver {
    working_dir: PathBuf,
    allow_local_only: bool,
}

impl PathResolver {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            allow_local_only: false,
        }
    }

    /// Choose the policy for missing or placeholder remote addresses.
    pub fn allow_local_only(mut self, allow: bool) -> Self {
        self.allow_local_only = allow;
        self
    }

    /// Resolve the local directory to an absolute, existing directory.
    pub fn resolve_directory(&self, raw: &Path) -> Result<PathBuf> {
        let joined = self.absolute(raw);
        if !joined.is_dir() {
            return Err(Error::InvalidDirectory { path: joined });
        }
        dunce::canonicalize(&joined).map_err(|_| Error::InvalidDirectory { path: joined })
    }

    /// Resolve the remote user, falling back to the OS login name.
    pub fn resolve_user(&self, raw: Option<&str>) -> Result<String> {
        let user = match raw {
            Some(user) => user.trim().to_string(),
            None => default_login_name().unwrap_or_default(),
        };
        if user.is_empty() {
            return Err(Error::InvalidUser);
        }
        Ok(user)
    }

    /// Normalize the remote address.
    ///
    /// Empty strings and home-directory placeholders mean "no remote". With
    /// `allow_local_only` they yield `None` (local-only addressing),
    /// otherwise they are rejected.
    pub fn resolve_remote_address(&self, raw: Option<&str>) -> Result<Option<String>> {
        let trimmed = raw.map(str::trim).unwrap_or("");
        if !NO_REMOTE_SENTINELS.contains(&trimmed) {
            return Ok(Some(trimmed.to_string()));
        }
        if self.allow_local_only {
            tracing::warn!(address = trimmed, "No remote address; using local-only addressing");
            Ok(None)
        } else {
            Err(Error::InvalidRemoteAddress {
                address: trimmed.to_string(),
            })
        }
    }

    fn absolute(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.working_dir.join(raw)
        }
    }
}

/// The OS login name, from `$USER`, `$LOGNAME` or `$USERNAME`.
pub fn default_login_name() -> Option<String> {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Validated description of one synchronization invocation.
#[derive(Debug, Clone)]
pub struct SyncSpec {
    local_directory: PathBuf,
    directory_name: String,
    user: String,
    remote_address: Option<String>,
    remote_path: String,
    direction: Direction,
    transfer_options: Vec<String>,
    ignore_pattern: Option<String>,
    preserve_settings: bool,
    delete_on_watch: bool,
    rsync_program: String,
    workspace: SettingsWorkspace,
    nested_workspace: Option<String>,
}

impl SyncSpec {
    /// Validate `request` relative to `working_dir`.
    ///
    /// Nothing is written to disk; every validation error is raised here.
    pub fn resolve(request: &SyncRequest, working_dir: &Path) -> Result<Self> {
        let resolver = PathResolver::new(working_dir).allow_local_only(request.allow_local_only);

        let local_directory = resolver.resolve_directory(&request.directory)?;
        let user = resolver.resolve_user(request.user.as_deref())?;
        let remote_address = resolver.resolve_remote_address(request.remote_address.as_deref())?;

        let remote_path = match request.remote_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => {
                if remote_address.is_none() {
                    NormalizedPath::new(resolver.absolute(Path::new(path))).to_string()
                } else {
                    path.to_string()
                }
            }
            _ => NormalizedPath::new(&local_directory).to_string(),
        };

        let directory_name = NormalizedPath::new(&local_directory)
            .file_name()
            .unwrap_or("root")
            .to_string();
        let workspace = SettingsWorkspace::for_directory(working_dir, &directory_name);
        let nested_workspace = nested_workspace(&local_directory, working_dir, &workspace);

        let transfer_options = required_options(
            &request.rsync_options,
            &workspace.filter_path(),
            nested_workspace.as_deref(),
            request.delete,
        );

        let rsync_program = request
            .rsync_program
            .as_deref()
            .map(str::trim)
            .filter(|program| !program.is_empty())
            .unwrap_or(DEFAULT_RSYNC_PROGRAM)
            .to_string();

        let spec = Self {
            local_directory,
            directory_name,
            user,
            remote_address,
            remote_path,
            direction: request.direction,
            transfer_options,
            ignore_pattern: request.ignore.clone().filter(|p| !p.is_empty()),
            preserve_settings: request.preserve_settings,
            delete_on_watch: request.delete_on_watch,
            rsync_program,
            workspace,
            nested_workspace,
        };

        if spec.remote_address.is_none()
            && NormalizedPath::new(&spec.local_directory).as_str() == spec.remote_path
        {
            tracing::warn!(
                path = %spec.remote_path,
                "Local-only destination equals the source directory"
            );
        }

        Ok(spec)
    }

    pub fn local_directory(&self) -> &Path {
        &self.local_directory
    }

    /// Base name of the local directory, which also names the workspace.
    pub fn directory_name(&self) -> &str {
        &self.directory_name
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref()
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn transfer_options(&self) -> &[String] {
        &self.transfer_options
    }

    pub fn ignore_pattern(&self) -> Option<&str> {
        self.ignore_pattern.as_deref()
    }

    pub fn preserve_settings(&self) -> bool {
        self.preserve_settings
    }

    pub fn delete_on_watch(&self) -> bool {
        self.delete_on_watch
    }

    pub fn rsync_program(&self) -> &str {
        &self.rsync_program
    }

    pub fn workspace(&self) -> &SettingsWorkspace {
        &self.workspace
    }

    /// Workspace location relative to the local directory, when the
    /// workspace lives inside it (e.g. `dirpush . host`).
    ///
    /// Such a workspace is excluded from every transfer and ignored by the
    /// watcher.
    pub fn nested_workspace(&self) -> Option<&str> {
        self.nested_workspace.as_deref()
    }

    /// `user@host:` when a remote address is present, empty otherwise.
    ///
    /// Every remote endpoint is built from this prefix.
    pub fn address_prefix(&self) -> String {
        match &self.remote_address {
            Some(address) => format!("{}@{}:", self.user, address),
            None => String::new(),
        }
    }

    /// The local directory as a transfer endpoint.
    pub fn local_endpoint(&self) -> Endpoint {
        Endpoint::Local(NormalizedPath::new(&self.local_directory))
    }

    /// The remote path as a transfer endpoint.
    ///
    /// In local-only mode this is a local path.
    pub fn remote_endpoint(&self) -> Endpoint {
        let path = NormalizedPath::new(&self.remote_path);
        if self.remote_address.is_some() {
            Endpoint::Remote {
                prefix: self.address_prefix(),
                path,
            }
        } else {
            Endpoint::Local(path)
        }
    }

    /// `(source, destination)` of the initial transfer.
    pub fn transfer_endpoints(&self) -> (Endpoint, Endpoint) {
        match self.direction {
            Direction::Push => (self.local_endpoint(), self.remote_endpoint()),
            Direction::Pull => (self.remote_endpoint(), self.local_endpoint()),
        }
    }

    /// The side the initial transfer overwrites.
    pub fn overwritten_side(&self) -> Endpoint {
        self.transfer_endpoints().1
    }
}

/// Relative path of `workspace` below `local_directory`, if it is inside it.
fn nested_workspace(
    local_directory: &Path,
    working_dir: &Path,
    workspace: &SettingsWorkspace,
) -> Option<String> {
    let working_dir = dunce::canonicalize(working_dir).unwrap_or_else(|_| working_dir.to_path_buf());
    let root = working_dir.join(workspace.root().file_name()?);
    let relative = root.strip_prefix(local_directory).ok()?;
    let relative = NormalizedPath::new(relative).to_string();
    tracing::debug!(workspace = %relative, "Settings workspace is inside the local directory");
    Some(relative)
}

/// Build the option list, guaranteeing the exclusion-file and timeout flags.
///
/// A workspace nested in the local directory is always excluded so it is
/// neither pushed to the remote nor deleted by a pull.
fn required_options(
    requested: &[String],
    filter_path: &NormalizedPath,
    nested_workspace: Option<&str>,
    delete: bool,
) -> Vec<String> {
    let mut options: Vec<String> = if requested.is_empty() {
        DEFAULT_RSYNC_OPTIONS.iter().map(|o| o.to_string()).collect()
    } else {
        requested.to_vec()
    };

    let exclude = format!("--exclude-from={}", filter_path);
    if !options.contains(&exclude) {
        options.push(exclude);
    }
    if let Some(relative) = nested_workspace {
        let exclude_workspace = format!("--exclude=/{}/", relative);
        if !options.contains(&exclude_workspace) {
            options.push(exclude_workspace);
        }
    }
    if !options.iter().any(|o| o.starts_with("--timeout")) {
        options.push(DEFAULT_TIMEOUT_OPTION.to_string());
    }
    if delete && !options.iter().any(|o| o == "--delete") {
        options.push("--delete".to_string());
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("  "))]
    #[case(Some("~"))]
    #[case(Some("$HOME"))]
    fn sentinel_addresses_are_rejected_by_default(#[case] raw: Option<&str>) {
        let resolver = PathResolver::new("/work");
        let err = resolver.resolve_remote_address(raw).unwrap_err();
        assert!(matches!(err, Error::InvalidRemoteAddress { .. }));
    }

    #[rstest]
    #[case(None)]
    #[case(Some("~"))]
    #[case(Some("${HOME}"))]
    fn sentinel_addresses_degrade_when_local_only_allowed(#[case] raw: Option<&str>) {
        let resolver = PathResolver::new("/work").allow_local_only(true);
        assert_eq!(resolver.resolve_remote_address(raw).unwrap(), None);
    }

    #[test]
    fn real_address_is_trimmed() {
        let resolver = PathResolver::new("/work");
        assert_eq!(
            resolver.resolve_remote_address(Some(" host.example ")).unwrap(),
            Some("host.example".to_string())
        );
    }

    #[test]
    fn explicit_empty_user_is_rejected() {
        let resolver = PathResolver::new("/work");
        assert!(matches!(resolver.resolve_user(Some("  ")), Err(Error::InvalidUser)));
        assert_eq!(resolver.resolve_user(Some("deploy")).unwrap(), "deploy");
    }

    #[test]
    fn default_options_gain_filter_and_timeout() {
        let filter = NormalizedPath::new("/work/.proj.dirpush-settings/.rsync-filter");
        let options = required_options(&[], &filter, None, false);
        assert_eq!(
            options,
            vec![
                "-arv",
                "--progress",
                "--exclude-from=/work/.proj.dirpush-settings/.rsync-filter",
                "--timeout=9999",
            ]
        );
    }

    #[test]
    fn nested_workspace_is_excluded_before_timeout() {
        let filter = NormalizedPath::new("/tmp/proj/.proj.dirpush-settings/.rsync-filter");
        let options = required_options(&[], &filter, Some(".proj.dirpush-settings"), false);
        assert_eq!(
            options,
            vec![
                "-arv",
                "--progress",
                "--exclude-from=/tmp/proj/.proj.dirpush-settings/.rsync-filter",
                "--exclude=/.proj.dirpush-settings/",
                "--timeout=9999",
            ]
        );
    }

    #[test]
    fn custom_timeout_is_kept_and_delete_appended_once() {
        let filter = NormalizedPath::new("/ws/.rsync-filter");
        let requested = vec!["-az".to_string(), "--timeout=30".to_string()];
        let options = required_options(&requested, &filter, None, true);
        assert_eq!(
            options,
            vec!["-az", "--timeout=30", "--exclude-from=/ws/.rsync-filter", "--delete"]
        );
    }
}
