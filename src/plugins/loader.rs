//! Loader capabilities: turning files on disk into descriptors and plugins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use super::PluginError;
use super::descriptor::PluginDescriptor;

/// A materialized plugin.
pub trait Plugin: Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

impl std::fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Plugin")
            .field(&self.descriptor().full_name())
            .finish()
    }
}

/// Reads plugin descriptors and materializes plugins of one packaging format.
///
/// # Example
///
/// ```rust,ignore
/// struct ScriptLoader { filter: Regex }
///
/// impl PluginLoader for ScriptLoader {
///     fn name(&self) -> &str { "script" }
///     fn plugin_filter(&self) -> &Regex { &self.filter }
///     fn plugin_description(&self, path: &Path) -> Result<PluginDescriptor, PluginError> { .. }
///     fn load_plugin(&self, path: &Path, descriptor: &PluginDescriptor)
///         -> Result<Arc<dyn Plugin>, PluginError> { .. }
/// }
/// ```
pub trait PluginLoader: Send + Sync {
    /// Identity under which the loader is registered.
    fn name(&self) -> &str;

    /// Matched against the file name (not the full path) of each entry.
    fn plugin_filter(&self) -> &Regex;

    fn plugin_description(&self, path: &Path) -> Result<PluginDescriptor, PluginError>;

    fn load_plugin(
        &self,
        path: &Path,
        descriptor: &PluginDescriptor,
    ) -> Result<Arc<dyn Plugin>, PluginError>;

    fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.plugin_filter().is_match(n))
    }
}

pub type LoaderFactory = fn() -> Arc<dyn PluginLoader>;

/// Registered loaders in registration order, plus factories that build
/// loaders by name.
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn PluginLoader>>,
    factories: HashMap<String, LoaderFactory>,
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderRegistry {
    /// An empty registry that knows the built-in [`ManifestLoader`] factory.
    pub fn new() -> Self {
        let mut factories: HashMap<String, LoaderFactory> = HashMap::new();
        factories.insert(ManifestLoader::NAME.to_string(), manifest_loader);
        Self {
            loaders: Vec::new(),
            factories,
        }
    }

    /// Registers a loader. A loader with the same name is replaced in place.
    /// Returns false for a loader with an empty name.
    pub fn register(&mut self, loader: Arc<dyn PluginLoader>) -> bool {
        if loader.name().trim().is_empty() {
            return false;
        }

        match self.loaders.iter().position(|l| l.name() == loader.name()) {
            Some(idx) => self.loaders[idx] = loader,
            None => self.loaders.push(loader),
        }
        true
    }

    pub fn register_factory(&mut self, name: impl Into<String>, factory: LoaderFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Builds and registers the loader known under `name`. Returns false if
    /// no factory has that name.
    pub fn register_by_name(&mut self, name: &str) -> bool {
        match self.factories.get(name) {
            Some(factory) => {
                let loader = factory();
                self.register(loader)
            }
            None => {
                tracing::warn!(loader = name, "Unknown plugin loader");
                false
            }
        }
    }

    pub fn loaders(&self) -> &[Arc<dyn PluginLoader>] {
        &self.loaders
    }

    pub fn names(&self) -> Vec<&str> {
        self.loaders.iter().map(|l| l.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// First loader, in registration order, whose filter accepts `path` and
    /// that can read a descriptor from it.
    pub fn describe(&self, path: &Path) -> Option<(Arc<dyn PluginLoader>, PluginDescriptor)> {
        for loader in &self.loaders {
            if !loader.accepts(path) {
                continue;
            }
            match loader.plugin_description(path) {
                Ok(descriptor) => return Some((Arc::clone(loader), descriptor)),
                Err(e) => {
                    tracing::debug!(
                        loader = loader.name(),
                        path = %path.display(),
                        error = %e,
                        "No usable descriptor"
                    );
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut factories: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        factories.sort_unstable();
        f.debug_struct("LoaderRegistry")
            .field("loaders", &self.names())
            .field("factories", &factories)
            .finish()
    }
}

/// Plugin produced by [`ManifestLoader`]: descriptor metadata only.
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    descriptor: PluginDescriptor,
    source: PathBuf,
    data_dir: PathBuf,
    loaded_at: DateTime<Utc>,
}

impl ManifestPlugin {
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// `<parent of source>/<plugin name>`; not created on disk.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl Plugin for ManifestPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

fn manifest_loader() -> Arc<dyn PluginLoader> {
    Arc::new(ManifestLoader::new())
}

fn visible_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^.]").expect("valid visible entry regex"))
}

/// Loads plugins packaged as a directory holding `plugin.yml`,
/// `plugin.yaml` or `plugin.json`, or as a standalone
/// `<name>.plugin.{yml,yaml,json}` file.
pub struct ManifestLoader {
    filter: Regex,
}

impl ManifestLoader {
    pub const NAME: &'static str = "manifest";

    /// Accepts every entry whose name does not start with a dot.
    pub fn new() -> Self {
        Self {
            filter: visible_entry_regex().clone(),
        }
    }

    /// Restricts accepted entry names. The pattern is validated here.
    pub fn with_filter(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            filter: Regex::new(pattern)?,
        })
    }

    fn descriptor_path(path: &Path) -> Result<PathBuf, PluginError> {
        if path.is_dir() {
            return PluginDescriptor::locate(path).ok_or_else(|| PluginError::DescriptorNotFound {
                path: path.to_path_buf(),
            });
        }

        let is_standalone = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| {
                [".plugin.yml", ".plugin.yaml", ".plugin.json"]
                    .iter()
                    .any(|suffix| n.ends_with(suffix))
            });
        if is_standalone && path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(PluginError::DescriptorNotFound {
                path: path.to_path_buf(),
            })
        }
    }
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginLoader for ManifestLoader {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn plugin_filter(&self) -> &Regex {
        &self.filter
    }

    fn plugin_description(&self, path: &Path) -> Result<PluginDescriptor, PluginError> {
        PluginDescriptor::load(&Self::descriptor_path(path)?)
    }

    fn load_plugin(
        &self,
        path: &Path,
        descriptor: &PluginDescriptor,
    ) -> Result<Arc<dyn Plugin>, PluginError> {
        if !path.exists() {
            return Err(PluginError::LoadFailed {
                plugin: descriptor.name.clone(),
                message: format!("{} disappeared before it could be loaded", path.display()),
            });
        }

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Arc::new(ManifestPlugin {
            descriptor: descriptor.clone(),
            source: path.to_path_buf(),
            data_dir: parent.join(&descriptor.name),
            loaded_at: Utc::now(),
        }))
    }
}
