//! Status-change notifications.
//!
//! Each [`Module`](crate::tree::Module) owns one broadcast channel; every
//! resource it creates emits on that channel. There is no global event bus:
//! subscribers attach to the module whose resources they care about.

use std::sync::Arc;

use crate::remote::RemoteBinding;
use crate::status::Status;
use crate::tree::Resource;

/// Capacity of a module's event channel.
///
/// Slow subscribers that fall more than this many events behind observe a
/// `Lagged` error from the broadcast receiver and miss the overwritten
/// events.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A notification emitted by a resource.
pub enum ResourceEvent<B: RemoteBinding> {
    /// The resource's computed status changed.
    StatusChanged {
        /// The resource whose status changed.
        resource: Arc<Resource<B>>,
        /// Status before the change.
        previous: Status,
        /// Status after the change.
        current: Status,
    },
    /// The background refresh of the resource's child modules finished.
    ChildrenRefreshed {
        /// The resource whose children were refreshed.
        resource: Arc<Resource<B>>,
    },
}

impl<B: RemoteBinding> ResourceEvent<B> {
    /// Returns the resource this event concerns.
    #[must_use]
    pub fn resource(&self) -> &Arc<Resource<B>> {
        match self {
            Self::StatusChanged { resource, .. } | Self::ChildrenRefreshed { resource } => resource,
        }
    }
}

// Manual impls: derive would require bounds on `B` itself.
impl<B: RemoteBinding> Clone for ResourceEvent<B> {
    fn clone(&self) -> Self {
        match self {
            Self::StatusChanged {
                resource,
                previous,
                current,
            } => Self::StatusChanged {
                resource: Arc::clone(resource),
                previous: *previous,
                current: *current,
            },
            Self::ChildrenRefreshed { resource } => Self::ChildrenRefreshed {
                resource: Arc::clone(resource),
            },
        }
    }
}

impl<B: RemoteBinding> std::fmt::Debug for ResourceEvent<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusChanged {
                resource,
                previous,
                current,
            } => f
                .debug_struct("StatusChanged")
                .field("resource", &resource.id().as_str())
                .field("previous", previous)
                .field("current", current)
                .finish(),
            Self::ChildrenRefreshed { resource } => f
                .debug_struct("ChildrenRefreshed")
                .field("resource", &resource.id().as_str())
                .finish(),
        }
    }
}
