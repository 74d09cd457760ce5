//! Prelude module for convenient imports.
//!
//! ```rust
//! use plugin_host::prelude::*;
//! ```

pub use crate::Error;
pub use crate::Result;

// Configuration
pub use crate::config::HostConfig;

// Plugins
pub use crate::plugins::{
    ApiVersion, LoadDiagnostic, LoadIssue, LoadReport, ManifestLoader, Plugin, PluginDescriptor,
    PluginLoader, PluginManager, Severity,
};

// Permissions
pub use crate::permissions::{
    CommandSender, Permissible, Permission, PermissionCheck, PermissionDefault,
};
