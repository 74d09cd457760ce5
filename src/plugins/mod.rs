//! Plugin discovery, validation, dependency ordering, and loading.
//!
//! A plugin is any directory entry a registered [`PluginLoader`] accepts. The
//! built-in [`ManifestLoader`] understands directories holding a descriptor:
//!
//! ```text
//! plugins/
//! ├── economy/
//! │   └── plugin.yml
//! ├── chat/
//! │   └── plugin.json
//! └── motd.plugin.yml
//! ```
//!
//! A batch load validates names and API compatibility, orders candidates by
//! `depend` / `softdepend` / `loadbefore`, and reports every rejection in a
//! [`LoadReport`].

mod descriptor;
mod error;
mod loader;
mod manager;
mod report;
mod resolver;
mod version;

pub use descriptor::{DeclaredPermission, PluginDescriptor};
pub use error::PluginError;
pub use loader::{
    LoaderFactory, LoaderRegistry, ManifestLoader, ManifestPlugin, Plugin, PluginLoader,
};
pub use manager::PluginManager;
pub use report::{LoadDiagnostic, LoadIssue, LoadReport, Severity};
pub use resolver::DependencyResolver;
pub use version::{ApiVersion, any_compatible};
