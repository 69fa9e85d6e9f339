use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// The credentials file exactly as it sits on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source_base_url: String,
    #[serde(default)]
    pub source_access_token: String,
    #[serde(default)]
    pub destination_base_url: String,
    #[serde(default)]
    pub destination_access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_password: Option<String>,
}

pub fn read_config(config: &str) -> Result<Config, ConfigError> {
    serde_yaml::from_str(config).map_err(ConfigError::Parse)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    read_config(&content)
}

pub fn write_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let content = serde_yaml::to_string(config).map_err(ConfigError::Serialize)?;

    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// `--config` when given, `$HOME/config.yaml` otherwise.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_CONFIG_FILE))
        .ok_or(ConfigError::NoHomeDir)
}
