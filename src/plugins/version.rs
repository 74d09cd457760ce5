//! Host API versions and the plugin compatibility rule.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::PluginError;

/// A `major.minor.patch` API version.
///
/// Missing trailing components read as zero, so `"2.3"` equals `2.3.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a plugin declaring `self` can run on a host providing `host`.
    ///
    /// The host is backward compatible within a major version: it supports any
    /// minor at or below its own. Patch levels never matter.
    pub fn is_compatible_with(&self, host: &ApiVersion) -> bool {
        self.major == host.major && self.minor <= host.minor
    }
}

/// Returns true if any declared version is compatible with `host`.
///
/// An empty declaration is never compatible.
pub fn any_compatible(declared: &[ApiVersion], host: &ApiVersion) -> bool {
    declared.iter().any(|v| v.is_compatible_with(host))
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ApiVersion {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PluginError::InvalidVersion {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty version"));
        }

        let mut parts = [0u32; 3];
        for (i, component) in trimmed.split('.').enumerate() {
            if i >= parts.len() {
                return Err(invalid("more than three components"));
            }
            parts[i] = component
                .parse()
                .map_err(|_| invalid("components must be non-negative integers"))?;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Rejection for a YAML decimal such as `2.10`, which arrives as the float
/// `2.1` with its digits already lost.
pub(crate) fn unquoted_decimal(n: f64) -> PluginError {
    PluginError::InvalidVersion {
        version: n.to_string(),
        reason: "unquoted decimal loses digits, quote the version".to_string(),
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(u64),
            Float(f64),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Integer(n) => n.to_string(),
            // `2.0` is unambiguous; `2.10` is not.
            Raw::Float(n) if n.fract() == 0.0 => format!("{n:.0}"),
            Raw::Float(n) => return Err(serde::de::Error::custom(unquoted_decimal(n))),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(v("2.3.0"), ApiVersion::new(2, 3, 0));
        assert_eq!(v("2.3"), ApiVersion::new(2, 3, 0));
        assert_eq!(v("1"), ApiVersion::new(1, 0, 0));
        assert_eq!(v(" 1.2.3 "), ApiVersion::new(1, 2, 3));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<ApiVersion>().is_err());
        assert!("1.x.0".parse::<ApiVersion>().is_err());
        assert!("1.2.3.4".parse::<ApiVersion>().is_err());
        assert!("-1.0.0".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ApiVersion::new(1, 12, 4).to_string(), "1.12.4");
    }

    #[test]
    fn test_host_compatibility() {
        let host = v("2.3.0");
        assert!(v("2.2.0").is_compatible_with(&host));
        assert!(v("2.3.9").is_compatible_with(&host));
        assert!(v("2.0.0").is_compatible_with(&host));
        assert!(!v("2.4.0").is_compatible_with(&host));
        assert!(!v("3.0.0").is_compatible_with(&host));
        assert!(!v("1.9.9").is_compatible_with(&host));
    }

    #[test]
    fn test_any_compatible() {
        let host = v("2.3.0");
        assert!(any_compatible(&[v("1.9.9"), v("2.1.0")], &host));
        assert!(!any_compatible(&[v("1.9.9"), v("2.4.0")], &host));
        assert!(!any_compatible(&[], &host));
    }

    #[test]
    fn test_deserialize_yaml_number() {
        let parsed: Vec<ApiVersion> = serde_yaml_bw::from_str("[1.0, 2, \"2.1.3\"]").unwrap();
        assert_eq!(
            parsed,
            vec![
                ApiVersion::new(1, 0, 0),
                ApiVersion::new(2, 0, 0),
                ApiVersion::new(2, 1, 3)
            ]
        );
    }

    #[test]
    fn test_deserialize_unquoted_decimal_rejected() {
        let err = serde_yaml_bw::from_str::<Vec<ApiVersion>>("[2.10]").unwrap_err();
        assert!(err.to_string().contains("quote the version"), "{err}");

        let quoted: Vec<ApiVersion> = serde_yaml_bw::from_str("['2.10']").unwrap();
        assert_eq!(quoted, vec![ApiVersion::new(2, 10, 0)]);
    }

    #[test]
    fn test_unquoted_decimal_error() {
        let err = unquoted_decimal(2.1);
        assert!(matches!(err, PluginError::InvalidVersion { ref version, .. } if version == "2.1"));
    }
}
