//! # plugin-host
//!
//! Plugin lifecycle and permission management for extensible server hosts.
//!
//! The host scans a plugin directory through pluggable loaders, rejects
//! plugins with restricted or duplicate names and incompatible API versions,
//! orders the rest by their declared dependencies, and materializes them.
//! Permissions declared by plugins land in a registry that buckets them by
//! default grant and notifies subscribed permissibles when a bucket changes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plugin_host::config::HostConfig;
//! use plugin_host::plugins::{ManifestLoader, PluginManager};
//!
//! fn main() -> Result<(), plugin_host::Error> {
//!     let config = HostConfig::load("host.json")?;
//!     let plugin_dir = config.plugin_dir.clone();
//!
//!     let mut manager = PluginManager::new(config);
//!     manager.register_interface_by_name(ManifestLoader::NAME);
//!
//!     let report = manager.load_plugins_with_report(&plugin_dir);
//!     for name in report.loaded_names() {
//!         println!("loaded {}", name);
//!     }
//!     for failure in report.failures() {
//!         eprintln!("{}", failure);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Permissions
//!
//! ```rust
//! use plugin_host::permissions::{Permission, PermissionDefault};
//! use plugin_host::plugins::PluginManager;
//!
//! let mut manager = PluginManager::default();
//! manager.add_permission(Permission::new("host.command.ban", PermissionDefault::Op));
//! assert!(manager.get_default_permissions(true).contains_key("host.command.ban"));
//! assert!(manager.get_default_permissions(false).is_empty());
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod observability;
pub mod permissions;
pub mod plugins;
pub mod prelude;

pub use config::{ConfigError, HostConfig};
pub use permissions::{
    CommandSender, Permissible, Permission, PermissionCheck, PermissionDefault, PermissionRegistry,
};
pub use plugins::{
    ApiVersion, LoadDiagnostic, LoadIssue, LoadReport, ManifestLoader, Plugin, PluginDescriptor,
    PluginError, PluginLoader, PluginManager, Severity,
};

/// Error type for plugin-host operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Plugin descriptor or loader failure.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or invalid.
    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    /// Tracing subscriber could not be installed.
    #[error("Tracing error: {0}")]
    Tracing(#[from] observability::TracingError),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Plugin descriptors and plugin loading
    Plugin,
    /// Internal errors (IO, JSON, unexpected states)
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::Env(_) | Error::Tracing(_) => {
                ErrorCategory::Configuration
            }
            Error::Plugin(PluginError::Io(_)) => ErrorCategory::Internal,
            Error::Plugin(_) => ErrorCategory::Plugin,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_plugin_error(&self) -> bool {
        self.category() == ErrorCategory::Plugin
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::Env(e) => Error::Env(e),
        }
    }
}

/// Result type alias for plugin-host operations.
pub type Result<T> = std::result::Result<T, Error>;
