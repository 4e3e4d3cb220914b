//! Generated artifacts consumed by the external watcher

use dirpush_fs::{ConfigStore, NormalizedPath, io};
use serde::{Deserialize, Serialize};

use crate::filter::{FilterSource, ensure_filter_present};
use crate::spec::{Direction, SyncSpec};
use crate::{Error, Result};

/// Guard bootstrap; reads `config.yml` once and hands the record to the
/// plugin through its options.
pub const GUARDFILE_TEMPLATE: &str = include_str!("../templates/Guardfile");

/// Configuration record written to `config.yml` for the watcher.
///
/// Watch-triggered re-syncs always push the local directory to the remote
/// side: after a pull the local copy is the one being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub source: String,
    pub destination: String,
    pub user: String,
    pub remote_address: Option<String>,
    pub address_prefix: String,
    /// Direction of the initial transfer
    pub direction: Direction,
    pub watch_directory: String,
    pub rsync_options: Vec<String>,
    pub ignore: Option<String>,
    pub delete_on_watch: bool,
    /// Transfer tool executable, the same one the initial sync used
    pub rsync_program: String,
    /// Workspace path relative to `watch_directory` when nested inside it
    pub settings_directory: Option<String>,
}

impl WatchConfig {
    pub fn from_spec(spec: &SyncSpec) -> Self {
        let local = spec.local_endpoint();
        Self {
            source: local.render(),
            destination: spec.remote_endpoint().render(),
            user: spec.user().to_string(),
            remote_address: spec.remote_address().map(str::to_string),
            address_prefix: spec.address_prefix(),
            direction: spec.direction(),
            watch_directory: local.path().to_string(),
            rsync_options: spec.transfer_options().to_vec(),
            ignore: spec.ignore_pattern().map(str::to_string),
            delete_on_watch: spec.delete_on_watch(),
            rsync_program: spec.rsync_program().to_string(),
            settings_directory: spec.nested_workspace().map(str::to_string),
        }
    }
}

/// What artifact materialization did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub filter: FilterSource,
    /// `config.yml` was written (false: an existing file was kept)
    pub config_written: bool,
    /// `Guardfile` was written (false: an existing file was kept)
    pub bootstrap_written: bool,
}

/// Write the filter, config and bootstrap artifacts into the workspace.
///
/// Config and bootstrap are create-if-absent so hand edits survive
/// re-runs; the filter follows [`ensure_filter_present`].
pub fn materialize(spec: &SyncSpec) -> Result<ArtifactReport> {
    let workspace = spec.workspace();

    workspace.ensure_present()?;
    let filter = ensure_filter_present(spec.local_directory(), &workspace.filter_path())?;

    workspace.ensure_present()?;
    let config = WatchConfig::from_spec(spec);
    let config_written = ConfigStore::new()
        .save_if_absent(&workspace.config_path(), &config)
        .map_err(Error::Setup)?;
    if !config_written {
        warn_on_kept_config(&workspace.config_path(), &config);
    }

    workspace.ensure_present()?;
    let bootstrap_written =
        io::write_if_absent(&workspace.watcher_bootstrap_path(), GUARDFILE_TEMPLATE.as_bytes())
            .map_err(Error::Setup)?;

    Ok(ArtifactReport {
        filter,
        config_written,
        bootstrap_written,
    })
}

/// The watcher uses whatever `config.yml` holds, so say when a kept file no
/// longer matches this invocation.
fn warn_on_kept_config(path: &NormalizedPath, current: &WatchConfig) {
    match ConfigStore::new().load::<WatchConfig>(path) {
        Ok(kept) if kept == *current => {}
        Ok(_) => tracing::warn!(
            path = %path,
            "Keeping existing config; it differs from this invocation"
        ),
        Err(e) => tracing::warn!(
            path = %path,
            error = %e,
            "Keeping existing config that does not parse as a watch record"
        ),
    }
}
