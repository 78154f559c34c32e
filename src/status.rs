//! Resource lifecycle status.
//!
//! A [`Status`] is a locally-derived label, never persisted remotely. Stable
//! values are computed from the latest remote snapshot by the binding's
//! status mapping; while a framework operation is in flight the resource is
//! forced to the matching unstable value and restored afterwards.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a resource.
///
/// The set is partitioned into *unstable* values (an operation is in
/// progress and the status will change again without further input) and
/// *stable* values (the status holds until the next operation or refresh).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    // -- unstable --
    /// An operation has been requested but not yet started.
    Pending,
    /// The resource is being created.
    Creating,
    /// The resource is being updated.
    Updating,
    /// The resource is being deleted.
    Deleting,
    /// The resource's snapshot is being fetched.
    Loading,
    /// The resource is being scaled.
    Scaling,
    /// A deployment to the resource is in progress.
    Deploying,
    /// The resource is starting.
    Starting,
    /// The resource is restarting.
    Restarting,
    /// The resource is stopping.
    Stopping,

    // -- stable --
    /// The resource is up and serving.
    Running,
    /// The resource is stopped.
    Stopped,
    /// The resource has been deleted.
    Deleted,
    /// The last operation on the resource failed.
    Error,
    /// The resource exists but is not active.
    Inactive,
    /// The remote state could not be classified.
    Unknown,
    /// No remote snapshot is available for the resource.
    Disconnected,
}

impl Status {
    /// Returns true if this status is stable.
    ///
    /// A stable status holds until the next operation or refresh changes it.
    #[must_use]
    pub const fn is_stable(self) -> bool {
        matches!(
            self,
            Self::Running
                | Self::Stopped
                | Self::Deleted
                | Self::Error
                | Self::Inactive
                | Self::Unknown
                | Self::Disconnected
        )
    }

    /// Returns true if this status is unstable (an operation is in flight).
    #[must_use]
    pub const fn is_unstable(self) -> bool {
        !self.is_stable()
    }

    /// Returns true if the resource reached this status through a failure.
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Creating => "creating",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
            Self::Loading => "loading",
            Self::Scaling => "scaling",
            Self::Deploying => "deploying",
            Self::Starting => "starting",
            Self::Restarting => "restarting",
            Self::Stopping => "stopping",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Deleted => "deleted",
            Self::Error => "error",
            Self::Inactive => "inactive",
            Self::Unknown => "unknown",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_exhaustive() {
        let unstable = [
            Status::Pending,
            Status::Creating,
            Status::Updating,
            Status::Deleting,
            Status::Loading,
            Status::Scaling,
            Status::Deploying,
            Status::Starting,
            Status::Restarting,
            Status::Stopping,
        ];
        let stable = [
            Status::Running,
            Status::Stopped,
            Status::Deleted,
            Status::Error,
            Status::Inactive,
            Status::Unknown,
            Status::Disconnected,
        ];

        for status in unstable {
            assert!(status.is_unstable(), "{status} should be unstable");
        }
        for status in stable {
            assert!(status.is_stable(), "{status} should be stable");
        }
    }

    #[test]
    fn test_failed_classification() {
        assert!(Status::Error.is_failed());
        assert!(!Status::Stopped.is_failed());
        assert!(!Status::Deleting.is_failed());
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(Status::Disconnected.to_string(), "disconnected");
        assert_eq!(Status::Creating.to_string(), "creating");
    }
}
