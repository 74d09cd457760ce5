//! Permission gate used by command dispatch.

use super::Permissible;

/// Message sent when a check fails and no custom message is configured.
pub const DEFAULT_DENIAL_MESSAGE: &str = "You don't have permissions to use this command.";

/// Placeholder replaced by the permission specifier in custom denial messages.
pub const PERMISSION_PLACEHOLDER: &str = "<permission>";

/// Separator between alternative permission names in a specifier.
pub const ALTERNATIVE_SEP: char = ';';

/// A permissible that can be addressed with messages, such as a connected
/// user or the console.
pub trait CommandSender: Permissible {
    fn has_permission(&self, name: &str) -> bool;

    fn send_message(&self, message: &str);
}

/// Permission requirement attached to a command.
///
/// `permission` may list alternatives separated by `;`; holding any one of
/// them passes.
///
/// # Example
///
/// ```rust
/// use plugin_host::permissions::PermissionCheck;
///
/// let check = PermissionCheck::new("host.command.ban;host.command.kick")
///     .with_message("Missing <permission>");
/// assert_eq!(check.alternatives().count(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionCheck {
    pub permission: Option<String>,
    /// `None` sends [`DEFAULT_DENIAL_MESSAGE`]; `Some("")` stays silent.
    pub permission_message: Option<String>,
}

impl PermissionCheck {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: Some(permission.into()),
            permission_message: None,
        }
    }

    /// A check that everyone passes.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.permission_message = Some(message.into());
        self
    }

    pub fn alternatives(&self) -> impl Iterator<Item = &str> {
        self.permission
            .as_deref()
            .unwrap_or_default()
            .split(ALTERNATIVE_SEP)
            .filter(|p| !p.is_empty())
    }

    /// Checks without notifying the target.
    pub fn test_silent(&self, target: &dyn CommandSender) -> bool {
        match self.permission.as_deref() {
            None | Some("") => true,
            Some(_) => self.alternatives().any(|p| target.has_permission(p)),
        }
    }

    /// Checks and tells the target why it was denied.
    pub fn test(&self, target: &dyn CommandSender) -> bool {
        if self.test_silent(target) {
            return true;
        }

        match self.permission_message.as_deref() {
            None => target.send_message(DEFAULT_DENIAL_MESSAGE),
            Some("") => {}
            Some(template) => {
                let specifier = self.permission.as_deref().unwrap_or_default();
                target.send_message(&template.replace(PERMISSION_PLACEHOLDER, specifier));
            }
        }

        false
    }
}
