//! Error types for the Nimbus resource framework.
//!
//! This module provides the error hierarchy for all framework operations:
//! cache lookups, placeholder registration, draft commits, and the remote
//! calls made through a [`crate::remote::RemoteBinding`].

use thiserror::Error;

/// The main error type for the Nimbus resource framework.
#[derive(Debug, Error)]
pub enum NimbusError {
    /// A resource with the same name is already cached in its module.
    #[error("Resource already exists: {id}")]
    AlreadyExists {
        /// Id of the conflicting resource.
        id: String,
    },

    /// The requested resource is not cached and not present remotely.
    ///
    /// Only raised by operations that require the resource to exist
    /// (e.g. module-level delete); plain lookups report absence as `None`.
    #[error("Resource not found: {id}")]
    NotFound {
        /// Id of the missing resource.
        id: String,
    },

    /// A precondition of the requested operation does not hold.
    #[error("Precondition failed: {message}")]
    Precondition {
        /// Description of the violated precondition.
        message: String,
    },

    /// The resource's owning module has been dropped.
    #[error("Module for resource {id} has been dropped")]
    Detached {
        /// Id of the orphaned resource.
        id: String,
    },

    /// A remote call through the binding failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Errors reported by a remote binding.
///
/// Bindings translate their transport's failures into these variants so
/// the framework can classify them without knowing the wire protocol.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The transport could not reach the control plane.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The control plane rejected the request.
    #[error("Request rejected by the control plane: {message}")]
    Rejected {
        /// Error message from the control plane.
        message: String,
    },

    /// The control plane returned a response the binding could not interpret.
    #[error("Invalid response from the control plane: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The operation did not complete within the transport's deadline.
    #[error("Timeout during {operation} for {id}")]
    Timeout {
        /// The operation that timed out (list, get, create, ...).
        operation: String,
        /// Id of the affected resource or module.
        id: String,
    },
}

/// Result type alias for Nimbus operations.
pub type Result<T> = std::result::Result<T, NimbusError>;

impl NimbusError {
    /// Creates an already-exists error for the given resource id.
    #[must_use]
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    /// Creates a not-found error for the given resource id.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a precondition error with the given message.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Creates a detached error for the given resource id.
    #[must_use]
    pub fn detached(id: impl Into<String>) -> Self {
        Self::Detached { id: id.into() }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Remote(RemoteError::Transport { .. } | RemoteError::Timeout { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Remote(RemoteError::Transport { .. }) => Some(5),
            Self::Remote(RemoteError::Timeout { .. }) => Some(2),
            _ => None,
        }
    }
}

impl RemoteError {
    /// Creates a transport error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a rejected error with the given message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error with the given message.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
