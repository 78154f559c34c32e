//! Resource-id addressing scheme.
//!
//! Every node in the tree is addressed by a deterministic path:
//! `{parent_id}/{module_name}/{resource_name}`. Modules scoped above the
//! resource-group level carry [`RESOURCE_GROUP_PLACEHOLDER`] in their
//! parent id; it is substituted with the concrete group when a resource
//! under them is addressed.

use serde::{Deserialize, Serialize};

/// Placeholder token for a not-yet-known resource group in an id path.
pub const RESOURCE_GROUP_PLACEHOLDER: &str = "${resourceGroup}";

/// A deterministic path identifying one node in the resource tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates an id from a raw path string.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends a module segment and a resource segment to this id.
    #[must_use]
    pub fn child(&self, module_name: &str, resource_name: &str) -> Self {
        Self(format!("{}/{module_name}/{resource_name}", self.0))
    }

    /// Substitutes the resource-group placeholder with a concrete group.
    ///
    /// Ids without the placeholder are returned unchanged.
    #[must_use]
    pub fn with_resource_group(&self, resource_group: &str) -> Self {
        Self(self.0.replace(RESOURCE_GROUP_PLACEHOLDER, resource_group))
    }

    /// Returns the final path segment, i.e. the resource name.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(path: String) -> Self {
        Self(path)
    }
}
