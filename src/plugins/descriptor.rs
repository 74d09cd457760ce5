use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PluginError;
use super::version::{ApiVersion, unquoted_decimal};
use crate::permissions::{Permission, PermissionDefault};

pub(crate) const DESCRIPTOR_FILES: &[&str] = &["plugin.yml", "plugin.yaml", "plugin.json"];

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(OneOrMany::<T>::deserialize(deserializer)?.into())
}

// YAML reads `version: 1.0` as a number. Decimals like `1.10` arrive as
// `1.1` and are rejected rather than silently truncated.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(u64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(n) if n.fract() == 0.0 => format!("{n:.1}"),
        Raw::Float(n) => return Err(serde::de::Error::custom(unquoted_decimal(n))),
    })
}

/// Permission declared in a descriptor's `permissions` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredPermission {
    #[serde(default)]
    pub default: Option<PermissionDefault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, bool>,
}

/// Metadata a plugin declares about itself.
///
/// Parsed from `plugin.yml` / `plugin.json`:
///
/// ```yaml
/// name: Economy
/// version: 1.4.0
/// api: [1.0.0, 2.1.0]
/// depend: [Database]
/// softdepend: [Chat]
/// loadbefore: [Shops]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub api: Vec<ApiVersion>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub depend: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub softdepend: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub loadbefore: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "author", deserialize_with = "one_or_many")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, DeclaredPermission>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            api: Vec::new(),
            depend: Vec::new(),
            softdepend: Vec::new(),
            loadbefore: Vec::new(),
            main: None,
            description: None,
            authors: Vec::new(),
            website: None,
            permissions: BTreeMap::new(),
        }
    }

    pub fn with_api(mut self, version: ApiVersion) -> Self {
        self.api.push(version);
        self
    }

    pub fn with_depend(mut self, name: impl Into<String>) -> Self {
        self.depend.push(name.into());
        self
    }

    pub fn with_softdepend(mut self, name: impl Into<String>) -> Self {
        self.softdepend.push(name.into());
        self
    }

    pub fn with_loadbefore(mut self, name: impl Into<String>) -> Self {
        self.loadbefore.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `name v<version>`, used in log lines.
    pub fn full_name(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }

    /// Declared permissions as registry nodes. Unspecified defaults read as
    /// [`PermissionDefault::Op`].
    pub fn declared_permissions(&self) -> Vec<Permission> {
        self.permissions
            .iter()
            .map(|(name, declared)| Permission {
                name: name.clone(),
                default: declared.default.unwrap_or_default(),
                description: declared.description.clone(),
                children: declared.children.clone(),
            })
            .collect()
    }

    /// Parses descriptor text, choosing the format from the file extension.
    pub fn parse(content: &str, path: &Path) -> Result<Self, PluginError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let descriptor: Self = if is_json {
            serde_json::from_str(content)?
        } else {
            serde_yaml_bw::from_str(content)?
        };

        if descriptor.name.trim().is_empty() {
            return Err(PluginError::InvalidDescriptor {
                path: path.to_path_buf(),
                reason: "name must not be empty".into(),
            });
        }

        Ok(descriptor)
    }

    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.is_file() {
            return Err(PluginError::DescriptorNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Finds the descriptor file inside a plugin directory.
    pub fn locate(dir: &Path) -> Option<std::path::PathBuf> {
        DESCRIPTOR_FILES
            .iter()
            .map(|file| dir.join(file))
            .find(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn yml() -> PathBuf {
        PathBuf::from("plugin.yml")
    }

    #[test]
    fn test_parse_yaml_full() {
        let content = r#"
name: Economy
version: 1.4.0
main: economy.Main
api: [1.0.0, "2.1.0"]
depend: [Database]
softdepend: Chat
loadbefore: [Shops, Auctions]
author: alice
website: https://example.com
permissions:
  economy.pay:
    default: true
    description: Send money
  economy.admin:
    default: op
    children:
      economy.pay: true
"#;
        let d = PluginDescriptor::parse(content, &yml()).unwrap();
        assert_eq!(d.name(), "Economy");
        assert_eq!(d.full_name(), "Economy v1.4.0");
        assert_eq!(d.api, vec![ApiVersion::new(1, 0, 0), ApiVersion::new(2, 1, 0)]);
        assert_eq!(d.depend, vec!["Database"]);
        assert_eq!(d.softdepend, vec!["Chat"]);
        assert_eq!(d.loadbefore, vec!["Shops", "Auctions"]);
        assert_eq!(d.authors, vec!["alice"]);
        assert_eq!(d.main.as_deref(), Some("economy.Main"));

        let perms = d.declared_permissions();
        assert_eq!(perms.len(), 2);
        let admin = perms.iter().find(|p| p.name == "economy.admin").unwrap();
        assert_eq!(admin.default, PermissionDefault::Op);
        assert_eq!(admin.children.get("economy.pay"), Some(&true));
        let pay = perms.iter().find(|p| p.name == "economy.pay").unwrap();
        assert_eq!(pay.default, PermissionDefault::True);
    }

    #[test]
    fn test_parse_json_minimal() {
        let d = PluginDescriptor::parse(
            r#"{"name":"Chat","version":"0.1.0","api":"2.0.0"}"#,
            &PathBuf::from("plugin.json"),
        )
        .unwrap();
        assert_eq!(d.api, vec![ApiVersion::new(2, 0, 0)]);
        assert!(d.depend.is_empty());
        assert!(d.permissions.is_empty());
    }

    #[test]
    fn test_parse_missing_name() {
        let err = PluginDescriptor::parse("version: 1.0.0", &yml()).unwrap_err();
        assert!(matches!(err, PluginError::Yaml(_)));

        let err = PluginDescriptor::parse(r#"{"version":"1.0.0"}"#, &PathBuf::from("plugin.json"))
            .unwrap_err();
        assert!(matches!(err, PluginError::Json(_)));

        let err = PluginDescriptor::parse("name: \"  \"\nversion: 1.0.0", &yml()).unwrap_err();
        assert!(matches!(err, PluginError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_parse_bad_version() {
        let err = PluginDescriptor::parse("name: A\nversion: 1.0\napi: [one.two]", &yml())
            .unwrap_err();
        assert!(matches!(err, PluginError::Yaml(_)));
    }

    #[test]
    fn test_parse_unquoted_decimal_versions() {
        let err = PluginDescriptor::parse("name: A\nversion: '1'\napi: 2.10", &yml()).unwrap_err();
        assert!(err.to_string().contains("quote the version"), "{err}");

        let err = PluginDescriptor::parse("name: A\nversion: 1.10", &yml()).unwrap_err();
        assert!(err.to_string().contains("quote the version"), "{err}");

        let d = PluginDescriptor::parse("name: A\nversion: '1.10'\napi: '2.10'", &yml()).unwrap();
        assert_eq!(d.version, "1.10");
        assert_eq!(d.api, vec![ApiVersion::new(2, 10, 0)]);

        let d = PluginDescriptor::parse("name: A\nversion: 2.0\napi: 2", &yml()).unwrap();
        assert_eq!(d.version, "2.0");
        assert_eq!(d.api, vec![ApiVersion::new(2, 0, 0)]);
    }

    #[test]
    fn test_permission_without_default_is_op() {
        let d = PluginDescriptor::parse(
            "name: A\nversion: '1'\npermissions:\n  a.use:\n    description: Use A\n",
            &yml(),
        )
        .unwrap();
        assert_eq!(d.declared_permissions()[0].default, PermissionDefault::Op);
    }

    #[test]
    fn test_load_and_locate() {
        let dir = tempdir().unwrap();
        assert!(PluginDescriptor::locate(dir.path()).is_none());
        let err = PluginDescriptor::load(&dir.path().join("plugin.yml")).unwrap_err();
        assert!(matches!(err, PluginError::DescriptorNotFound { .. }));

        std::fs::write(
            dir.path().join("plugin.json"),
            r#"{"name":"Found","version":"1.0.0"}"#,
        )
        .unwrap();
        let path = PluginDescriptor::locate(dir.path()).unwrap();
        assert_eq!(PluginDescriptor::load(&path).unwrap().name(), "Found");
    }

    #[test]
    fn test_builder() {
        let d = PluginDescriptor::new("A", "1.0.0")
            .with_api(ApiVersion::new(1, 0, 0))
            .with_depend("B")
            .with_softdepend("C")
            .with_loadbefore("D");
        assert_eq!(d.depend, vec!["B"]);
        assert_eq!(d.softdepend, vec!["C"]);
        assert_eq!(d.loadbefore, vec!["D"]);
    }
}
