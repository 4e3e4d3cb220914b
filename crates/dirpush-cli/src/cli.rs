//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;
use dirpush_core::spec::DEFAULT_RSYNC_PROGRAM;
use dirpush_core::watcher::DEFAULT_WATCH_COMMAND;
use dirpush_core::{Direction, SyncRequest};

/// dirpush - Push a directory to a remote host and keep it in sync
///
/// Creates a hidden `.<directory>.dirpush-settings` workspace in the current
/// directory, backs up the side about to be overwritten, runs one rsync
/// transfer and hands over to a file watcher that repeats it on changes.
///
/// Examples:
///   dirpush my-project build-host              # push, then watch
///   dirpush my-project build-host --pull       # pull once, then push edits
///   dirpush . host -u deploy --remote-path www # custom user and remote path
#[derive(Parser, Debug)]
#[command(name = "dirpush")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Local directory to synchronize
    pub directory: PathBuf,

    /// Remote host address
    pub remote_address: Option<String>,

    /// Remote user (defaults to the current login name)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Path on the remote host (defaults to the local absolute path)
    #[arg(long)]
    pub remote_path: Option<String>,

    /// Pull from the remote host instead of pushing to it
    #[arg(long)]
    pub pull: bool,

    /// rsync option replacing the defaults (repeatable)
    #[arg(long = "rsync-option", value_name = "OPTION", allow_hyphen_values = true)]
    pub rsync_options: Vec<String>,

    /// Delete files on the destination that do not exist on the source
    #[arg(long)]
    pub delete: bool,

    /// Keep delete options on watch-triggered re-syncs
    #[arg(long)]
    pub delete_on_watch: bool,

    /// Pattern of filesystem events the watcher ignores
    #[arg(short, long)]
    pub ignore: Option<String>,

    /// Keep the settings directory after the watcher exits
    #[arg(long)]
    pub preserve_settings: bool,

    /// Treat a missing remote address as a local-only sync
    #[arg(long)]
    pub allow_local_only: bool,

    /// Command that runs the watcher inside the settings directory
    #[arg(long, env = "DIRPUSH_WATCH_COMMAND", default_value = DEFAULT_WATCH_COMMAND)]
    pub watch_command: String,

    /// rsync executable
    #[arg(long, env = "DIRPUSH_RSYNC", default_value = DEFAULT_RSYNC_PROGRAM)]
    pub rsync: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the unvalidated sync request from the parsed arguments.
    pub fn to_request(&self) -> SyncRequest {
        SyncRequest {
            directory: self.directory.clone(),
            remote_address: self.remote_address.clone(),
            user: self.user.clone(),
            remote_path: self.remote_path.clone(),
            direction: if self.pull {
                Direction::Pull
            } else {
                Direction::Push
            },
            rsync_options: self.rsync_options.clone(),
            delete: self.delete,
            ignore: self.ignore.clone(),
            preserve_settings: self.preserve_settings,
            allow_local_only: self.allow_local_only,
            delete_on_watch: self.delete_on_watch,
            rsync_program: Some(self.rsync.to_string_lossy().into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_minimal_push() {
        let cli = Cli::try_parse_from(["dirpush", "proj", "host"]).unwrap();
        let request = cli.to_request();
        assert_eq!(request.directory, PathBuf::from("proj"));
        assert_eq!(request.remote_address.as_deref(), Some("host"));
        assert_eq!(request.direction, Direction::Push);
        assert!(request.rsync_options.is_empty());
        assert_eq!(request.rsync_program.as_deref(), Some("rsync"));
    }

    #[test]
    fn parse_pull_with_options() {
        let cli = Cli::try_parse_from([
            "dirpush",
            "proj",
            "host",
            "--pull",
            "-u",
            "deploy",
            "--rsync-option",
            "-az",
            "--rsync-option=--checksum",
            "--preserve-settings",
        ])
        .unwrap();
        let request = cli.to_request();
        assert_eq!(request.direction, Direction::Pull);
        assert_eq!(request.user.as_deref(), Some("deploy"));
        assert_eq!(request.rsync_options, vec!["-az", "--checksum"]);
        assert!(request.preserve_settings);
    }

    #[test]
    fn directory_is_required() {
        assert!(Cli::try_parse_from(["dirpush"]).is_err());
    }
}
