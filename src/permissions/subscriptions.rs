//! Fan-out index of permissibles interested in permission changes.
//!
//! The index never owns a permissible. Each entry is a [`Weak`] link keyed by
//! the identity of the permissible's allocation; once the permissible is
//! dropped its entry is skipped on every read and removed by [`SubscriptionIndex::prune`].

use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// An actor that can hold permissions.
pub trait Permissible: Send + Sync {
    /// Whether this actor is operator-class.
    fn is_op(&self) -> bool;

    /// Rebuilds the actor's effective permission set.
    ///
    /// Invoked synchronously while the registry is mid-update; implementations
    /// must not call back into the registry.
    fn recalculate_permissions(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PermissibleKey(usize);

impl PermissibleKey {
    fn of(permissible: &Arc<dyn Permissible>) -> Self {
        // The held Weak keeps the allocation alive, so the address stays unique
        // for as long as the key is in the index.
        Self(Arc::as_ptr(permissible) as *const () as usize)
    }
}

type SubscriberSet = HashMap<PermissibleKey, Weak<dyn Permissible>>;

fn insert(set: &mut SubscriberSet, permissible: &Arc<dyn Permissible>) {
    set.insert(PermissibleKey::of(permissible), Arc::downgrade(permissible));
}

fn live(set: &SubscriberSet) -> Vec<Arc<dyn Permissible>> {
    set.values().filter_map(Weak::upgrade).collect()
}

/// Which permissibles care about which permission names and default buckets.
#[derive(Default)]
pub struct SubscriptionIndex {
    by_permission: HashMap<String, SubscriberSet>,
    default_op: SubscriberSet,
    default_non_op: SubscriberSet,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_to_permission(&mut self, permission: &str, permissible: &Arc<dyn Permissible>) {
        insert(
            self.by_permission.entry(permission.to_string()).or_default(),
            permissible,
        );
    }

    pub fn unsubscribe_from_permission(
        &mut self,
        permission: &str,
        permissible: &Arc<dyn Permissible>,
    ) {
        if let Some(set) = self.by_permission.get_mut(permission) {
            set.remove(&PermissibleKey::of(permissible));
            if set.is_empty() {
                self.by_permission.remove(permission);
            }
        }
    }

    /// Live subscribers of a single permission name.
    pub fn get_permission_subscriptions(&self, permission: &str) -> Vec<Arc<dyn Permissible>> {
        self.by_permission
            .get(permission)
            .map(live)
            .unwrap_or_default()
    }

    pub fn subscribe_to_default_perms(&mut self, op: bool, permissible: &Arc<dyn Permissible>) {
        insert(self.default_bucket_mut(op), permissible);
    }

    pub fn unsubscribe_from_default_perms(&mut self, op: bool, permissible: &Arc<dyn Permissible>) {
        self.default_bucket_mut(op)
            .remove(&PermissibleKey::of(permissible));
    }

    /// Live subscribers of the operator (`true`) or non-operator default bucket.
    pub fn get_default_perm_subscriptions(&self, op: bool) -> Vec<Arc<dyn Permissible>> {
        live(self.default_bucket(op))
    }

    /// Asks every live subscriber of a default bucket to recalculate, once each.
    /// Subscribers are visited in no particular order.
    pub(crate) fn notify_default_subscribers(&self, op: bool) {
        let subscribers = self.get_default_perm_subscriptions(op);
        tracing::debug!(op, count = subscribers.len(), "Recalculating default subscribers");
        for permissible in subscribers {
            permissible.recalculate_permissions();
        }
    }

    /// Drops entries whose permissible no longer exists. Returns how many
    /// entries were removed.
    pub fn prune(&mut self) -> usize {
        let mut removed = 0;
        let mut prune_set = |set: &mut SubscriberSet| {
            let before = set.len();
            set.retain(|_, weak| weak.strong_count() > 0);
            removed += before - set.len();
        };

        prune_set(&mut self.default_op);
        prune_set(&mut self.default_non_op);
        for set in self.by_permission.values_mut() {
            prune_set(set);
        }
        self.by_permission.retain(|_, set| !set.is_empty());

        removed
    }

    fn default_bucket(&self, op: bool) -> &SubscriberSet {
        if op {
            &self.default_op
        } else {
            &self.default_non_op
        }
    }

    fn default_bucket_mut(&mut self, op: bool) -> &mut SubscriberSet {
        if op {
            &mut self.default_op
        } else {
            &mut self.default_non_op
        }
    }
}

impl std::fmt::Debug for SubscriptionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionIndex")
            .field("permissions", &self.by_permission.len())
            .field("default_op", &self.default_op.len())
            .field("default_non_op", &self.default_non_op.len())
            .finish()
    }
}
