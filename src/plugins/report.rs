//! Per-plugin outcomes of a load batch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::loader::Plugin;
use super::version::ApiVersion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The plugin was accepted but something about it is discouraged.
    Warning,
    /// The plugin was rejected before dependency resolution.
    Error,
    /// The plugin was rejected during dependency resolution or materialization.
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadIssue {
    RestrictedName { matched: String },
    SpacesInName,
    DuplicateName,
    IncompatibleApi {
        declared: Vec<ApiVersion>,
        host: ApiVersion,
    },
    UnknownDependency { dependency: String },
    CircularDependency,
    LoadFailed { reason: String },
}

impl LoadIssue {
    pub fn severity(&self) -> Severity {
        match self {
            LoadIssue::SpacesInName => Severity::Warning,
            LoadIssue::RestrictedName { .. }
            | LoadIssue::DuplicateName
            | LoadIssue::IncompatibleApi { .. } => Severity::Error,
            LoadIssue::UnknownDependency { .. }
            | LoadIssue::CircularDependency
            | LoadIssue::LoadFailed { .. } => Severity::Severe,
        }
    }
}

/// One issue raised against one plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadDiagnostic {
    pub plugin: String,
    pub issue: LoadIssue,
}

impl LoadDiagnostic {
    pub fn new(plugin: impl Into<String>, issue: LoadIssue) -> Self {
        Self {
            plugin: plugin.into(),
            issue,
        }
    }

    pub fn severity(&self) -> Severity {
        self.issue.severity()
    }

    pub fn is_failure(&self) -> bool {
        self.severity() > Severity::Warning
    }

    pub(crate) fn log(&self) {
        let severity = self.severity();
        match severity {
            Severity::Warning => {
                tracing::warn!(plugin = %self.plugin, %severity, "{}", self)
            }
            Severity::Error | Severity::Severe => {
                tracing::error!(plugin = %self.plugin, %severity, "{}", self)
            }
        }
    }
}

impl fmt::Display for LoadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugin = &self.plugin;
        match &self.issue {
            LoadIssue::SpacesInName => write!(
                f,
                "Plugin '{}' uses spaces in its name, this is discouraged",
                plugin
            ),
            LoadIssue::RestrictedName { matched } => write!(
                f,
                "Could not load plugin '{}': restricted name (contains '{}')",
                plugin, matched
            ),
            LoadIssue::DuplicateName => write!(
                f,
                "Could not load duplicate plugin '{}': plugin exists",
                plugin
            ),
            LoadIssue::IncompatibleApi { declared, host } => {
                let declared: Vec<String> = declared.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "Could not load plugin '{}': API version not compatible (declared [{}], host {})",
                    plugin,
                    declared.join(", "),
                    host
                )
            }
            LoadIssue::UnknownDependency { dependency } => write!(
                f,
                "Could not load plugin '{}': Unknown dependency '{}'",
                plugin, dependency
            ),
            LoadIssue::CircularDependency => write!(
                f,
                "Could not load plugin '{}': circular dependency detected",
                plugin
            ),
            LoadIssue::LoadFailed { reason } => {
                write!(f, "Could not load plugin '{}': {}", plugin, reason)
            }
        }
    }
}

/// Everything materialized by a batch plus every issue raised along the way.
#[derive(Default)]
pub struct LoadReport {
    pub loaded: BTreeMap<String, Arc<dyn Plugin>>,
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, diagnostic: LoadDiagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }

    pub fn failures(&self) -> impl Iterator<Item = &LoadDiagnostic> {
        self.diagnostics.iter().filter(|d| d.is_failure())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LoadDiagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_failure())
    }

    pub fn diagnostics_for<'a>(&'a self, plugin: &'a str) -> impl Iterator<Item = &'a LoadDiagnostic> {
        self.diagnostics.iter().filter(move |d| d.plugin == plugin)
    }

    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.keys().map(String::as_str).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl fmt::Debug for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadReport")
            .field("loaded", &self.loaded_names())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_taxonomy() {
        assert_eq!(LoadIssue::SpacesInName.severity(), Severity::Warning);
        assert_eq!(
            LoadIssue::RestrictedName {
                matched: "mojang".into()
            }
            .severity(),
            Severity::Error
        );
        assert_eq!(LoadIssue::DuplicateName.severity(), Severity::Error);
        assert_eq!(
            LoadIssue::IncompatibleApi {
                declared: vec![],
                host: ApiVersion::new(1, 0, 0)
            }
            .severity(),
            Severity::Error
        );
        assert_eq!(
            LoadIssue::UnknownDependency {
                dependency: "X".into()
            }
            .severity(),
            Severity::Severe
        );
        assert_eq!(LoadIssue::CircularDependency.severity(), Severity::Severe);
    }

    #[test]
    fn test_display() {
        let d = LoadDiagnostic::new(
            "Economy",
            LoadIssue::UnknownDependency {
                dependency: "Database".into(),
            },
        );
        assert_eq!(
            d.to_string(),
            "Could not load plugin 'Economy': Unknown dependency 'Database'"
        );

        let d = LoadDiagnostic::new(
            "Economy",
            LoadIssue::IncompatibleApi {
                declared: vec![ApiVersion::new(3, 0, 0)],
                host: ApiVersion::new(2, 3, 0),
            },
        );
        assert!(d.to_string().contains("declared [3.0.0], host 2.3.0"));
    }

    #[test]
    fn test_report_filters() {
        let mut report = LoadReport::new();
        assert!(report.is_clean());
        report.record(LoadDiagnostic::new("My Plugin", LoadIssue::SpacesInName));
        report.record(LoadDiagnostic::new("A", LoadIssue::CircularDependency));
        report.record(LoadDiagnostic::new("B", LoadIssue::DuplicateName));

        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.diagnostics_for("A").count(), 1);
        assert!(!report.is_clean());
    }
}
