//! Host configuration.
//!
//! Values are layered lowest to highest: built-in defaults, a JSON file, then
//! `PLUGIN_HOST_*` environment variables.
//!
//! ```rust,no_run
//! use plugin_host::config::HostConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HostConfig::load("host.json")?;
//! println!("plugins from {}", config.plugin_dir.display());
//! # Ok(())
//! # }
//! ```

pub mod env;

pub use env::EnvOverrides;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plugins::ApiVersion;

/// Errors that can occur in configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub const DEFAULT_API_VERSION: ApiVersion = ApiVersion::new(1, 0, 0);

/// Substrings a plugin name may not contain, compared case-insensitively.
pub const DEFAULT_RESTRICTED_NAMES: &[&str] = &["pocketmine", "minecraft", "mojang"];

/// Settings the plugin manager reads at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// API version the host provides. Serialized as `"M.m.p"`.
    pub api_version: ApiVersion,
    pub plugin_dir: PathBuf,
    pub restricted_names: Vec<String>,
    /// Replaces the generic denial message for permission checks that do not
    /// carry their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_message: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION,
            plugin_dir: default_plugin_dir(),
            restricted_names: DEFAULT_RESTRICTED_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            permission_message: None,
        }
    }
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// File values with `PLUGIN_HOST_*` environment overrides applied.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let mut config = Self::from_file(path)?;
        EnvOverrides::new().apply(&mut config)?;
        Ok(config)
    }

    /// Defaults with `PLUGIN_HOST_*` environment overrides applied.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        EnvOverrides::new().apply(&mut config)?;
        Ok(config)
    }

    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    pub fn with_restricted_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permission_message(mut self, message: impl Into<String>) -> Self {
        self.permission_message = Some(message.into());
        self
    }

    /// First restricted substring found in `name`, ignoring case.
    pub fn restricted_match(&self, name: &str) -> Option<&str> {
        let lowered = name.to_lowercase();
        self.restricted_names
            .iter()
            .filter(|r| !r.is_empty())
            .find(|r| lowered.contains(&r.to_lowercase()))
            .map(String::as_str)
    }
}

fn default_plugin_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "plugin-host")
        .map(|dirs| dirs.data_dir().join("plugins"))
        .unwrap_or_else(|| PathBuf::from("plugins"))
}
