use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::HostConfig;
use crate::observability::load_batch_span;
use crate::permissions::{
    Permissible, Permission, PermissionCheck, PermissionMap, PermissionRegistry,
};

use super::PluginError;
use super::descriptor::PluginDescriptor;
use super::loader::{LoaderFactory, LoaderRegistry, Plugin, PluginLoader};
use super::report::{LoadDiagnostic, LoadIssue, LoadReport};
use super::resolver::DependencyResolver;
use super::version::any_compatible;

type Candidate = (Arc<dyn PluginLoader>, PathBuf, PluginDescriptor);

/// Discovers, orders, and materializes plugins, and owns the permission
/// registry they populate.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use plugin_host::config::HostConfig;
/// use plugin_host::plugins::{ManifestLoader, PluginManager};
///
/// let mut manager = PluginManager::new(HostConfig::default());
/// manager.register_interface(Arc::new(ManifestLoader::new()));
/// let report = manager.load_plugins_with_report("plugins");
/// for diagnostic in report.failures() {
///     eprintln!("{diagnostic}");
/// }
/// ```
#[derive(Debug)]
pub struct PluginManager {
    config: HostConfig,
    loaders: LoaderRegistry,
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
    permissions: PermissionRegistry,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl PluginManager {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            loaders: LoaderRegistry::new(),
            plugins: BTreeMap::new(),
            permissions: PermissionRegistry::new(),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    pub fn register_interface(&mut self, loader: Arc<dyn PluginLoader>) -> bool {
        let name = loader.name().to_string();
        let registered = self.loaders.register(loader);
        if registered {
            tracing::debug!(loader = %name, "Registered plugin loader");
        }
        registered
    }

    pub fn register_interface_by_name(&mut self, name: &str) -> bool {
        self.loaders.register_by_name(name)
    }

    pub fn register_loader_factory(&mut self, name: impl Into<String>, factory: LoaderFactory) {
        self.loaders.register_factory(name, factory);
    }

    /// Loads a single plugin, bypassing name and dependency checks.
    pub fn try_load_plugin(&mut self, path: impl AsRef<Path>) -> Result<Arc<dyn Plugin>, PluginError> {
        let path = path.as_ref();
        let (loader, descriptor) =
            self.loaders
                .describe(path)
                .ok_or_else(|| PluginError::NoLoader {
                    path: path.to_path_buf(),
                })?;

        let plugin = loader.load_plugin(path, &descriptor)?;
        register_declared_permissions(&mut self.permissions, &descriptor);
        self.plugins
            .insert(descriptor.name.clone(), Arc::clone(&plugin));
        tracing::info!(plugin = %descriptor.full_name(), loader = loader.name(), "Loaded plugin");
        Ok(plugin)
    }

    pub fn load_plugin(&mut self, path: impl AsRef<Path>) -> Option<Arc<dyn Plugin>> {
        let path = path.as_ref();
        match self.try_load_plugin(path) {
            Ok(plugin) => Some(plugin),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not load plugin");
                None
            }
        }
    }

    /// Loads every plugin in `dir` and returns the ones this batch added.
    pub fn load_plugins(&mut self, dir: impl AsRef<Path>) -> BTreeMap<String, Arc<dyn Plugin>> {
        self.load_plugins_with_report(dir).loaded
    }

    /// Loads every plugin in `dir`, reporting each plugin that was rejected
    /// or accepted with a warning.
    pub fn load_plugins_with_report(&mut self, dir: impl AsRef<Path>) -> LoadReport {
        let dir = dir.as_ref();
        let _span = load_batch_span(dir).entered();
        let mut report = LoadReport::new();

        let entries = match scan(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Plugin directory not readable");
                return report;
            }
        };

        let mut resolver: DependencyResolver<Candidate> = DependencyResolver::new();
        for path in entries {
            let Some((loader, descriptor)) = self.loaders.describe(&path) else {
                continue;
            };
            if let Some(issue) = self.screen(&descriptor, &resolver, &mut report) {
                report.record(LoadDiagnostic::new(&descriptor.name, issue));
                continue;
            }

            resolver.add(
                descriptor.name.clone(),
                descriptor.depend.clone(),
                descriptor.softdepend.clone(),
                descriptor.loadbefore.clone(),
                (loader, path, descriptor),
            );
        }

        let mut available: HashSet<String> = self.plugins.keys().cloned().collect();
        let plugins = &mut self.plugins;
        let permissions = &mut self.permissions;
        let batch = &mut report.loaded;

        let diagnostics = resolver.resolve(&mut available, |name, (loader, path, descriptor)| {
            let plugin = loader.load_plugin(&path, &descriptor)?;
            register_declared_permissions(permissions, &descriptor);
            plugins.insert(name.to_string(), Arc::clone(&plugin));
            batch.insert(name.to_string(), plugin);
            tracing::info!(plugin = %descriptor.full_name(), loader = loader.name(), "Loaded plugin");
            Ok(())
        });
        report.diagnostics.extend(diagnostics);

        tracing::debug!(
            dir = %dir.display(),
            loaded = report.loaded.len(),
            failed = report.failures().count(),
            "Plugin batch finished"
        );
        report
    }

    /// Pre-resolution checks. Returns the rejecting issue, recording any
    /// warnings on the way.
    fn screen(
        &self,
        descriptor: &PluginDescriptor,
        batch: &DependencyResolver<Candidate>,
        report: &mut LoadReport,
    ) -> Option<LoadIssue> {
        let name = descriptor.name.as_str();

        if let Some(matched) = self.config.restricted_match(name) {
            return Some(LoadIssue::RestrictedName {
                matched: matched.to_string(),
            });
        }

        if name.contains(' ') {
            report.record(LoadDiagnostic::new(name, LoadIssue::SpacesInName));
        }

        if batch.contains(name) || self.plugins.contains_key(name) {
            return Some(LoadIssue::DuplicateName);
        }

        if !any_compatible(&descriptor.api, &self.config.api_version) {
            return Some(LoadIssue::IncompatibleApi {
                declared: descriptor.api.clone(),
                host: self.config.api_version,
            });
        }

        None
    }

    pub fn get_plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.get(name).cloned()
    }

    pub fn get_plugins(&self) -> &BTreeMap<String, Arc<dyn Plugin>> {
        &self.plugins
    }

    pub fn is_plugin_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// A check for `permission` that uses the configured denial message, if
    /// any.
    pub fn permission_check(&self, permission: impl Into<String>) -> PermissionCheck {
        let check = PermissionCheck::new(permission);
        match &self.config.permission_message {
            Some(message) => check.with_message(message.clone()),
            None => check,
        }
    }

    pub fn permissions(&self) -> &PermissionMap {
        self.permissions.permissions()
    }

    pub fn permission_registry(&self) -> &PermissionRegistry {
        &self.permissions
    }

    pub fn get_permission(&self, name: &str) -> Option<&Arc<Permission>> {
        self.permissions.get_permission(name)
    }

    pub fn add_permission(&mut self, permission: Permission) -> bool {
        self.permissions.add_permission(permission)
    }

    pub fn remove_permission(&mut self, name: &str) -> Option<Arc<Permission>> {
        self.permissions.remove_permission(name)
    }

    pub fn get_default_permissions(&self, op: bool) -> &PermissionMap {
        self.permissions.get_default_permissions(op)
    }

    pub fn recalculate_permission_defaults(&mut self, permission: &Permission) {
        self.permissions.recalculate_permission_defaults(permission);
    }

    pub fn subscribe_to_permission(&mut self, permission: &str, permissible: &Arc<dyn Permissible>) {
        self.permissions.subscribe_to_permission(permission, permissible);
    }

    pub fn unsubscribe_from_permission(
        &mut self,
        permission: &str,
        permissible: &Arc<dyn Permissible>,
    ) {
        self.permissions
            .unsubscribe_from_permission(permission, permissible);
    }

    pub fn get_permission_subscriptions(&self, permission: &str) -> Vec<Arc<dyn Permissible>> {
        self.permissions.get_permission_subscriptions(permission)
    }

    pub fn subscribe_to_default_perms(&mut self, op: bool, permissible: &Arc<dyn Permissible>) {
        self.permissions.subscribe_to_default_perms(op, permissible);
    }

    pub fn unsubscribe_from_default_perms(&mut self, op: bool, permissible: &Arc<dyn Permissible>) {
        self.permissions
            .unsubscribe_from_default_perms(op, permissible);
    }

    pub fn get_default_perm_subscriptions(&self, op: bool) -> Vec<Arc<dyn Permissible>> {
        self.permissions.get_default_perm_subscriptions(op)
    }

    pub fn prune_subscriptions(&mut self) -> usize {
        self.permissions.prune_subscriptions()
    }
}

/// Directory entries sorted by file name.
fn scan(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

fn register_declared_permissions(registry: &mut PermissionRegistry, descriptor: &PluginDescriptor) {
    for permission in descriptor.declared_permissions() {
        let name = permission.name.clone();
        if !registry.add_permission(permission) {
            tracing::warn!(
                plugin = %descriptor.name,
                permission = %name,
                "Permission already registered, keeping the existing one"
            );
        }
    }
}
