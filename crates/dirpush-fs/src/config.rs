//! YAML configuration loading and saving

use crate::{Error, NormalizedPath, Result, io};
use serde::{Serialize, de::DeserializeOwned};

/// YAML configuration store.
///
/// Only `.yaml` and `.yml` paths are accepted; anything else is an
/// [`Error::UnsupportedFormat`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        check_format(path)?;
        let content = io::read_text(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_native(),
            format: "YAML".into(),
            message: e.to_string(),
        })
    }

    /// Render a value as YAML.
    pub fn render<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<String> {
        check_format(path)?;
        serde_yaml::to_string(value).map_err(|e| Error::ConfigSerialize {
            path: path.to_native(),
            format: "YAML".into(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a file atomically.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let content = self.render(path, value)?;
        io::write_atomic(path, content.as_bytes())
    }

    /// Save configuration only if no file exists at `path`.
    ///
    /// A hand-edited file is never replaced. Returns `true` when written.
    pub fn save_if_absent<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        self.save(path, value)?;
        Ok(true)
    }
}

fn check_format(path: &NormalizedPath) -> Result<()> {
    let extension = path.extension().unwrap_or("");
    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(()),
        _ => Err(Error::UnsupportedFormat {
            extension: extension.to_string(),
        }),
    }
}
