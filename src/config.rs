//! Configuration file handling
//!
//! An optional TOML file tunes how the license server is queried. Every key
//! is optional; anything left out falls back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_SHELL, DEFAULT_TIMEOUT_SECS};

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfiguration {
    pub query: QuerySettings,
}

/// How the CIM query is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySettings {
    /// PowerShell executable (`powershell.exe` or `pwsh`)
    pub shell: String,
    /// CIM namespace holding the key pack class
    pub namespace: String,
    /// Operation timeout in seconds (1-3600)
    pub timeout_secs: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid query timeout: {0}. Must be between 1 and 3600 seconds")]
    InvalidTimeout(u32),
    #[error("Query shell must not be empty")]
    EmptyShell,
}

impl FileConfiguration {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfiguration =
            toml::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        config.query.validate()?;
        Ok(config)
    }
}

impl QuerySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout(self.timeout_secs)?;
        if self.shell.trim().is_empty() {
            return Err(ConfigError::EmptyShell);
        }
        Ok(())
    }
}

pub fn validate_timeout(timeout_secs: u32) -> Result<(), ConfigError> {
    if !(1..=3600).contains(&timeout_secs) {
        return Err(ConfigError::InvalidTimeout(timeout_secs));
    }
    Ok(())
}
