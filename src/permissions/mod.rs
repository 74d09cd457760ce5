//! Permission nodes, default-grant buckets, and subscriber propagation.
//!
//! Permissions carry a [`PermissionDefault`] that places them into the
//! operator bucket, the non-operator bucket, both, or neither. Permissibles
//! subscribe to a bucket and are told to recalculate whenever that bucket
//! changes.

mod check;
mod permission;
mod registry;
mod subscriptions;

pub use check::{
    ALTERNATIVE_SEP, CommandSender, DEFAULT_DENIAL_MESSAGE, PERMISSION_PLACEHOLDER,
    PermissionCheck,
};
pub use permission::{Permission, PermissionDefault};
pub use registry::{PermissionMap, PermissionRegistry};
pub use subscriptions::{Permissible, SubscriptionIndex};
