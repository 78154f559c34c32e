//! Remote binding trait definition.
//!
//! This module defines the hook interface a concrete resource type supplies
//! to the framework. One binding serves one module (one collection of
//! same-typed resources); the framework owns the cache and calls through
//! the binding for every remote round-trip.

use async_trait::async_trait;

use crate::error::Result;
use crate::status::Status;
use crate::tree::ResourceId;

/// Hook interface for one remote resource type.
///
/// Implementations wrap a vendor SDK client or a raw transport. The
/// framework imposes no timeout or cancellation of its own; deadlines are
/// the binding transport's responsibility.
///
/// If the provider's list endpoint returns shallow items that need a
/// per-item hydration call, the binding should perform that fan-out inside
/// [`list_remote`](Self::list_remote) and return full snapshots.
#[async_trait]
pub trait RemoteBinding: Send + Sync + 'static {
    /// Opaque snapshot of one remote entity, as last fetched.
    type Snapshot: Clone + Send + Sync + 'static;

    /// Mutation buffer for drafts of this resource type.
    type Config: DraftConfig<Self::Snapshot>;

    /// Lists all remote entities in this binding's scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing call fails.
    async fn list_remote(&self) -> Result<Vec<Self::Snapshot>>;

    /// Fetches a single remote entity by id.
    ///
    /// Returns `Ok(None)` when the entity does not exist; absence is never
    /// an error on this path.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    async fn get_remote(&self, id: &ResourceId) -> Result<Option<Self::Snapshot>>;

    /// Creates a remote entity from the given config.
    ///
    /// # Errors
    ///
    /// Returns an error if the creation is rejected or the transport fails.
    async fn create_remote(
        &self,
        name: &str,
        resource_group: &str,
        config: &Self::Config,
    ) -> Result<Self::Snapshot>;

    /// Updates an existing remote entity, applying the set fields of the
    /// config on top of the existing snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected or the transport fails.
    async fn update_remote(
        &self,
        existing: &Self::Snapshot,
        config: &Self::Config,
    ) -> Result<Self::Snapshot>;

    /// Deletes a remote entity by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion is rejected or the transport fails.
    async fn delete_remote(&self, id: &ResourceId) -> Result<()>;

    /// Extracts the resource name from a snapshot.
    fn name_of(&self, snapshot: &Self::Snapshot) -> String;

    /// Extracts the resource group from a snapshot.
    fn group_of(&self, snapshot: &Self::Snapshot) -> String;

    /// Derives the stable status of a snapshot.
    ///
    /// This is the per-resource-type status mapping; it is invoked whenever
    /// a resource's snapshot transitions from absent to present or is
    /// replaced by a fresh fetch.
    fn status_of(&self, snapshot: &Self::Snapshot) -> Status;
}

/// Mutation buffer contract for draft configs.
///
/// A config is a bag of explicitly-set field overrides; by convention every
/// field is an `Option`, where `None` means "unchanged" and is distinct
/// from explicitly set to an empty or cleared value. Getters on the
/// concrete type should return the buffered override when set and fall
/// back to the persisted snapshot otherwise.
pub trait DraftConfig<S>: Default + Send + Sync + 'static {
    /// Returns true if at least one field has been explicitly set.
    fn is_set(&self) -> bool;

    /// Returns true if at least one explicitly-set field differs from the
    /// given persisted snapshot.
    ///
    /// This must compare field by field; callers rely on it to skip no-op
    /// remote calls.
    fn differs_from(&self, current: &S) -> bool;
}
