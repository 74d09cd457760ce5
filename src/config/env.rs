//! Environment variable overrides for [`HostConfig`].
//!
//! Environment variables are only read, never written, since modifying them
//! at runtime is not thread-safe.

use std::env::VarError;
use std::path::PathBuf;

use super::{ConfigError, ConfigResult, HostConfig};
use crate::plugins::ApiVersion;

/// Reads `<prefix><KEY>` variables and applies them over a [`HostConfig`].
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    prefix: String,
}

impl EnvOverrides {
    pub const DEFAULT_PREFIX: &'static str = "PLUGIN_HOST_";

    pub fn new() -> Self {
        Self::prefixed(Self::DEFAULT_PREFIX)
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `api.version` with prefix `PLUGIN_HOST_` becomes `PLUGIN_HOST_API_VERSION`.
    pub fn env_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase().replace('.', "_"))
    }

    pub fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        lookup(&self.env_key(key), |k| std::env::var(k))
    }

    /// Applies overrides from the process environment.
    pub fn apply(&self, config: &mut HostConfig) -> ConfigResult<()> {
        self.apply_with(config, |k| std::env::var(k))
    }

    /// Applies overrides read through `var`, which receives full variable names.
    pub fn apply_with<F>(&self, config: &mut HostConfig, var: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let key = self.env_key("api_version");
        if let Some(raw) = lookup(&key, &var)? {
            config.api_version =
                raw.parse::<ApiVersion>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: key.clone(),
                        message: e.to_string(),
                    })?;
        }

        if let Some(raw) = lookup(&self.env_key("plugin_dir"), &var)? {
            config.plugin_dir = PathBuf::from(raw);
        }

        if let Some(raw) = lookup(&self.env_key("restricted_names"), &var)? {
            config.restricted_names = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(raw) = lookup(&self.env_key("permission_message"), &var)? {
            config.permission_message = Some(raw);
        }

        Ok(())
    }
}

impl Default for EnvOverrides {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<F>(key: &str, var: F) -> ConfigResult<Option<String>>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::Env(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_env_key_conversion() {
        let env = EnvOverrides::new();
        assert_eq!(env.env_key("api_version"), "PLUGIN_HOST_API_VERSION");
        assert_eq!(env.env_key("plugin.dir"), "PLUGIN_HOST_PLUGIN_DIR");

        let env = EnvOverrides::prefixed("TEST_");
        assert_eq!(env.env_key("plugin_dir"), "TEST_PLUGIN_DIR");
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = HostConfig::default();
        EnvOverrides::new()
            .apply_with(
                &mut config,
                vars(&[
                    ("PLUGIN_HOST_API_VERSION", "2.3"),
                    ("PLUGIN_HOST_PLUGIN_DIR", "/opt/plugins"),
                    ("PLUGIN_HOST_RESTRICTED_NAMES", "acme, ,Umbrella"),
                ]),
            )
            .unwrap();

        assert_eq!(config.api_version, ApiVersion::new(2, 3, 0));
        assert_eq!(config.plugin_dir, PathBuf::from("/opt/plugins"));
        assert_eq!(config.restricted_names, vec!["acme", "Umbrella"]);
        assert!(config.permission_message.is_none());
    }

    #[test]
    fn test_apply_nothing_set() {
        let mut config = HostConfig::default();
        EnvOverrides::new()
            .apply_with(&mut config, vars(&[]))
            .unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_invalid_api_version() {
        let mut config = HostConfig::default();
        let err = EnvOverrides::new()
            .apply_with(&mut config, vars(&[("PLUGIN_HOST_API_VERSION", "x.y")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PLUGIN_HOST_API_VERSION"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_get_unset() {
        let env = EnvOverrides::prefixed("PLUGIN_HOST_TEST_UNSET_");
        assert_eq!(env.get("nothing").unwrap(), None);
    }
}
