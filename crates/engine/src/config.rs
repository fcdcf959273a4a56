//! Engine configuration via `parastate.toml`
//!
//! A single TOML file sets the batch policy. Missing fields take their
//! defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use parastate_concurrency::ImporterConfig;
use parastate_core::{Error, Result};

/// Config file name placed in the engine's working directory.
pub const CONFIG_FILE_NAME: &str = "parastate.toml";

/// Engine configuration loaded from `parastate.toml`.
///
/// # Example
///
/// ```toml
/// commit_if_absent = false
/// system_paths = ["/blocks/"]
/// threads = 8
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Keep records that claim preexisting state the store does not have.
    #[serde(default)]
    pub commit_if_absent: bool,
    /// Directories whose listings are not maintained by write caches.
    #[serde(default)]
    pub system_paths: Vec<String>,
    /// Worker threads for batch processing; `None` uses rayon's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl EngineConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# parastate engine configuration
#
# Keep records that claim preexisting state the store does not have
# (default: false). When false such records are dropped on import.
commit_if_absent = false

# Directories whose child listings are maintained outside write caches.
# Writes below them do not touch the parent listing.
system_paths = []

# Worker threads for importing and finalizing a batch.
# Omit to use one thread per core.
# threads = 8
"#
    }

    /// Check field values.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero thread count or a system path that
    /// is not a directory.
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(Error::config(
                "threads must be at least 1 in parastate.toml; omit it to use the default",
            ));
        }
        if let Some(path) = self.system_paths.iter().find(|p| !p.ends_with('/')) {
            return Err(Error::config(format!(
                "system path '{}' in parastate.toml must end with '/'",
                path
            )));
        }
        Ok(())
    }

    /// Import policy derived from this config
    pub fn importer_config(&self) -> ImporterConfig {
        ImporterConfig {
            commit_if_absent: self.commit_if_absent,
        }
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
