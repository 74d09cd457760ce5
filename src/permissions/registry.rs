//! Permission registry with operator / non-operator default buckets.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::subscriptions::{Permissible, SubscriptionIndex};
use super::{Permission, PermissionDefault};

pub type PermissionMap = BTreeMap<String, Arc<Permission>>;

/// Stores permission nodes and keeps the default-grant buckets current.
///
/// Every change to a bucket asks all subscribers of that bucket to
/// recalculate, whether or not the changed node affects them.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    permissions: PermissionMap,
    op_defaults: PermissionMap,
    non_op_defaults: PermissionMap,
    subscriptions: SubscriptionIndex,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_permission(&self, name: &str) -> Option<&Arc<Permission>> {
        self.permissions.get(name)
    }

    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    /// Registers a permission. Returns false if the name is already taken.
    pub fn add_permission(&mut self, permission: Permission) -> bool {
        if self.permissions.contains_key(&permission.name) {
            return false;
        }

        let permission = Arc::new(permission);
        self.permissions
            .insert(permission.name.clone(), Arc::clone(&permission));
        self.calculate_permission_default(&permission);
        true
    }

    /// Forgets a permission by name.
    ///
    /// Default buckets keep whatever entry they had and nobody is notified;
    /// call [`recalculate_permission_defaults`](Self::recalculate_permission_defaults)
    /// before removal to change bucket membership.
    pub fn remove_permission(&mut self, name: &str) -> Option<Arc<Permission>> {
        self.permissions.remove(name)
    }

    /// The operator (`true`) or non-operator default bucket.
    pub fn get_default_permissions(&self, op: bool) -> &PermissionMap {
        if op {
            &self.op_defaults
        } else {
            &self.non_op_defaults
        }
    }

    /// Reclassifies a registered permission using the default carried by
    /// `permission`. Unregistered names are ignored.
    pub fn recalculate_permission_defaults(&mut self, permission: &Permission) {
        let Some(current) = self.permissions.get_mut(&permission.name) else {
            return;
        };

        if current.default != permission.default {
            Arc::make_mut(current).default = permission.default;
        }
        let current = Arc::clone(current);

        self.op_defaults.remove(&current.name);
        self.non_op_defaults.remove(&current.name);
        self.calculate_permission_default(&current);
    }

    /// Changes the default of a registered permission and reclassifies it.
    /// Returns false if no permission has that name.
    pub fn set_permission_default(&mut self, name: &str, default: PermissionDefault) -> bool {
        let Some(current) = self.permissions.get(name) else {
            return false;
        };

        let mut updated = Permission::clone(current);
        updated.default = default;
        self.recalculate_permission_defaults(&updated);
        true
    }

    fn calculate_permission_default(&mut self, permission: &Arc<Permission>) {
        if permission.default.in_op_bucket() {
            self.op_defaults
                .insert(permission.name.clone(), Arc::clone(permission));
            self.subscriptions.notify_default_subscribers(true);
        }

        if permission.default.in_non_op_bucket() {
            self.non_op_defaults
                .insert(permission.name.clone(), Arc::clone(permission));
            self.subscriptions.notify_default_subscribers(false);
        }
    }

    /// Removes subscription entries whose permissible has been dropped.
    pub fn prune_subscriptions(&mut self) -> usize {
        self.subscriptions.prune()
    }

    pub fn subscribe_to_permission(&mut self, permission: &str, permissible: &Arc<dyn Permissible>) {
        self.subscriptions
            .subscribe_to_permission(permission, permissible);
    }

    pub fn unsubscribe_from_permission(
        &mut self,
        permission: &str,
        permissible: &Arc<dyn Permissible>,
    ) {
        self.subscriptions
            .unsubscribe_from_permission(permission, permissible);
    }

    pub fn get_permission_subscriptions(&self, permission: &str) -> Vec<Arc<dyn Permissible>> {
        self.subscriptions.get_permission_subscriptions(permission)
    }

    pub fn subscribe_to_default_perms(&mut self, op: bool, permissible: &Arc<dyn Permissible>) {
        self.subscriptions
            .subscribe_to_default_perms(op, permissible);
    }

    pub fn unsubscribe_from_default_perms(&mut self, op: bool, permissible: &Arc<dyn Permissible>) {
        self.subscriptions
            .unsubscribe_from_default_perms(op, permissible);
    }

    pub fn get_default_perm_subscriptions(&self, op: bool) -> Vec<Arc<dyn Permissible>> {
        self.subscriptions.get_default_perm_subscriptions(op)
    }
}

#[cfg(test)]
mod tests {
    use super::super::subscriptions::testing::CountingPermissible;
    use super::*;

    fn handle(p: &Arc<CountingPermissible>) -> Arc<dyn Permissible> {
        p.clone()
    }

    #[test]
    fn test_add_rejects_duplicate() {
        let mut registry = PermissionRegistry::new();
        assert!(registry.add_permission(Permission::new("fly", PermissionDefault::Op)));
        assert!(!registry.add_permission(Permission::new("fly", PermissionDefault::True)));
        assert_eq!(
            registry.get_permission("fly").unwrap().default,
            PermissionDefault::Op
        );
        assert!(!registry.get_default_permissions(false).contains_key("fly"));
    }

    #[test]
    fn test_classification() {
        let mut registry = PermissionRegistry::new();
        registry.add_permission(Permission::new("everyone", PermissionDefault::True));
        registry.add_permission(Permission::new("nobody", PermissionDefault::False));
        registry.add_permission(Permission::new("ops", PermissionDefault::Op));
        registry.add_permission(Permission::new("players", PermissionDefault::NotOp));

        let op: Vec<&str> = registry
            .get_default_permissions(true)
            .keys()
            .map(String::as_str)
            .collect();
        let non_op: Vec<&str> = registry
            .get_default_permissions(false)
            .keys()
            .map(String::as_str)
            .collect();

        assert_eq!(op, vec!["everyone", "ops"]);
        assert_eq!(non_op, vec!["everyone", "players"]);
    }

    #[test]
    fn test_true_default_notifies_both_buckets() {
        let mut registry = PermissionRegistry::new();
        let op = CountingPermissible::new(true);
        let user = CountingPermissible::new(false);
        registry.subscribe_to_default_perms(true, &handle(&op));
        registry.subscribe_to_default_perms(false, &handle(&user));

        registry.add_permission(Permission::new("everyone", PermissionDefault::True));
        assert_eq!(op.count(), 1);
        assert_eq!(user.count(), 1);

        registry.add_permission(Permission::new("nobody", PermissionDefault::False));
        assert_eq!(op.count(), 1);
        assert_eq!(user.count(), 1);
    }

    #[test]
    fn test_recalculate_op_permission_notifies_op_bucket_once() {
        let mut registry = PermissionRegistry::new();
        let perm = Permission::new("kick", PermissionDefault::Op);
        registry.add_permission(perm.clone());

        let op = CountingPermissible::new(true);
        let user = CountingPermissible::new(false);
        registry.subscribe_to_default_perms(true, &handle(&op));
        registry.subscribe_to_default_perms(false, &handle(&user));

        registry.recalculate_permission_defaults(&perm);
        assert_eq!(op.count(), 1);
        assert_eq!(user.count(), 0);
    }

    #[test]
    fn test_recalculate_moves_between_buckets() {
        let mut registry = PermissionRegistry::new();
        registry.add_permission(Permission::new("kick", PermissionDefault::Op));

        registry.recalculate_permission_defaults(&Permission::new("kick", PermissionDefault::NotOp));

        assert!(!registry.get_default_permissions(true).contains_key("kick"));
        assert!(registry.get_default_permissions(false).contains_key("kick"));
        assert_eq!(
            registry.get_permission("kick").unwrap().default,
            PermissionDefault::NotOp
        );
    }

    #[test]
    fn test_recalculate_unregistered_is_ignored() {
        let mut registry = PermissionRegistry::new();
        let op = CountingPermissible::new(true);
        registry.subscribe_to_default_perms(true, &handle(&op));

        registry.recalculate_permission_defaults(&Permission::new("ghost", PermissionDefault::Op));

        assert_eq!(op.count(), 0);
        assert!(registry.get_default_permissions(true).is_empty());
    }

    #[test]
    fn test_set_permission_default() {
        let mut registry = PermissionRegistry::new();
        registry.add_permission(Permission::new("build", PermissionDefault::False));
        assert!(registry.set_permission_default("build", PermissionDefault::True));
        assert!(registry.get_default_permissions(true).contains_key("build"));
        assert!(registry.get_default_permissions(false).contains_key("build"));
        assert!(!registry.set_permission_default("missing", PermissionDefault::True));
    }

    #[test]
    fn test_remove_leaves_buckets_untouched() {
        let mut registry = PermissionRegistry::new();
        let op = CountingPermissible::new(true);
        registry.add_permission(Permission::new("kick", PermissionDefault::Op));
        registry.subscribe_to_default_perms(true, &handle(&op));

        assert!(registry.remove_permission("kick").is_some());
        assert!(registry.get_permission("kick").is_none());
        // Bucket membership survives removal and no one is told.
        assert!(registry.get_default_permissions(true).contains_key("kick"));
        assert_eq!(op.count(), 0);

        // Once removed, recalculation no longer reaches the stale bucket entry.
        registry.recalculate_permission_defaults(&Permission::new("kick", PermissionDefault::Op));
        assert!(registry.get_default_permissions(true).contains_key("kick"));
        assert_eq!(op.count(), 0);
    }

    #[test]
    fn test_prune_subscriptions() {
        let mut registry = PermissionRegistry::new();
        let kept = CountingPermissible::new(true);
        registry.subscribe_to_permission("kick", &handle(&kept));
        registry.subscribe_to_default_perms(true, &handle(&CountingPermissible::new(true)));

        assert_eq!(registry.prune_subscriptions(), 1);
        assert_eq!(registry.get_permission_subscriptions("kick").len(), 1);
        assert!(registry.get_default_perm_subscriptions(true).is_empty());
    }
}
