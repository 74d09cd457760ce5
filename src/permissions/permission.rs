//! Permission nodes and their default grant classification.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Who holds a permission when nothing grants or revokes it explicitly.
///
/// # Example
///
/// ```rust
/// use plugin_host::permissions::PermissionDefault;
///
/// let default: PermissionDefault = "notop".parse().unwrap();
/// assert_eq!(default, PermissionDefault::NotOp);
/// assert!(default.grants(false));
/// assert!(!default.grants(true));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PermissionDefault {
    /// Granted to everyone.
    True,
    /// Denied to everyone.
    False,
    /// Granted to operator-class permissibles only.
    #[default]
    Op,
    /// Granted to non-operator permissibles only.
    NotOp,
}

impl PermissionDefault {
    /// Whether the default grants the permission to an actor with the given
    /// operator status.
    pub fn grants(&self, op: bool) -> bool {
        match self {
            PermissionDefault::True => true,
            PermissionDefault::False => false,
            PermissionDefault::Op => op,
            PermissionDefault::NotOp => !op,
        }
    }

    /// Whether permissions with this default belong in the operator bucket.
    pub fn in_op_bucket(&self) -> bool {
        matches!(self, PermissionDefault::Op | PermissionDefault::True)
    }

    /// Whether permissions with this default belong in the non-operator bucket.
    pub fn in_non_op_bucket(&self) -> bool {
        matches!(self, PermissionDefault::NotOp | PermissionDefault::True)
    }
}

impl fmt::Display for PermissionDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionDefault::True => write!(f, "true"),
            PermissionDefault::False => write!(f, "false"),
            PermissionDefault::Op => write!(f, "op"),
            PermissionDefault::NotOp => write!(f, "notop"),
        }
    }
}

impl FromStr for PermissionDefault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "op" | "isop" | "operator" | "isoperator" | "admin" | "isadmin" => {
                Ok(PermissionDefault::Op)
            }
            "!op" | "notop" | "!operator" | "notoperator" | "!admin" | "notadmin" => {
                Ok(PermissionDefault::NotOp)
            }
            "true" => Ok(PermissionDefault::True),
            "false" => Ok(PermissionDefault::False),
            _ => Err(format!("Unknown permission default: {}", s)),
        }
    }
}

impl Serialize for PermissionDefault {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PermissionDefault {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(PermissionDefault::True),
            Raw::Flag(false) => Ok(PermissionDefault::False),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A named capability with a default grant rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    #[serde(default)]
    pub default: PermissionDefault,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Child permission names mapped to whether holding this node grants
    /// (`true`) or revokes (`false`) them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, bool>,
}

impl Permission {
    pub fn new(name: impl Into<String>, default: PermissionDefault) -> Self {
        Self {
            name: name.into(),
            default,
            description: None,
            children: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, value: bool) -> Self {
        self.children.insert(name.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> PermissionDefault {
        self.default
    }
}
