//! Resource entity.
//!
//! A [`Resource`] is the local mirror of one remote entity: immutable
//! identity, a cached snapshot of the last-fetched provider representation,
//! a derived [`Status`], and zero or more child modules scoped under it.
//! Resources are always handled as `Arc<Resource<B>>`; the owning module
//! guarantees at most one object per name, so holding the `Arc` across
//! refreshes keeps observing the same entity.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{NimbusError, Result};
use crate::event::ResourceEvent;
use crate::remote::RemoteBinding;
use crate::status::Status;

use super::id::ResourceId;
use super::module::{Module, Refreshable};
use super::sync::SyncMark;

/// Mutable interior of a resource.
struct ResourceState<S> {
    /// Last-fetched remote snapshot, or absent.
    remote: Option<S>,
    /// Freshness of `remote`.
    sync: SyncMark,
    /// Current derived status.
    status: Status,
}

/// The local mirror of one remote entity.
///
/// Identity (`name`, `resource_group`, `id`, owning module) is fixed at
/// construction; only the snapshot, sync mark, and status mutate in place
/// over the resource's lifetime.
pub struct Resource<B: RemoteBinding> {
    name: String,
    resource_group: String,
    id: ResourceId,
    module: Weak<Module<B>>,
    weak_self: Weak<Resource<B>>,
    state: RwLock<ResourceState<B::Snapshot>>,
    children: RwLock<Vec<Arc<dyn Refreshable>>>,
    events: broadcast::Sender<ResourceEvent<B>>,
}

impl<B: RemoteBinding> Resource<B> {
    /// Builds a resource owned by the given module.
    ///
    /// With a `seed` the resource starts hydrated (snapshot present, synced
    /// now, status as derived by the binding); without one it starts as a
    /// placeholder (no snapshot, never fetched, disconnected).
    pub(crate) fn build(
        name: &str,
        resource_group: &str,
        id: ResourceId,
        module: Weak<Module<B>>,
        events: broadcast::Sender<ResourceEvent<B>>,
        seed: Option<(B::Snapshot, Status)>,
    ) -> Arc<Self> {
        let state = match seed {
            Some((snapshot, status)) => ResourceState {
                remote: Some(snapshot),
                sync: SyncMark::now(),
                status,
            },
            None => ResourceState {
                remote: None,
                sync: SyncMark::Never,
                status: Status::Disconnected,
            },
        };
        Arc::new_cyclic(|weak| Self {
            name: name.to_string(),
            resource_group: resource_group.to_string(),
            id,
            module,
            weak_self: weak.clone(),
            state: RwLock::new(state),
            children: RwLock::new(Vec::new()),
            events,
        })
    }

    /// Returns the resource name (unique within its module and group).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resource group this resource belongs to.
    #[must_use]
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Returns the full resource id.
    #[must_use]
    pub const fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns the owning module.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::Detached`] if the module has been dropped.
    pub fn module(&self) -> Result<Arc<Module<B>>> {
        self.module
            .upgrade()
            .ok_or_else(|| NimbusError::detached(self.id.as_str()))
    }

    /// Returns true if a remote snapshot is currently cached.
    ///
    /// Pure read; call [`ensure_fresh`](Self::ensure_fresh) first when the
    /// answer must reflect the remote side.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.state().remote.is_some()
    }

    /// Returns a clone of the cached snapshot, if any.
    ///
    /// Pure read with no hidden fetch; pair with
    /// [`ensure_fresh`](Self::ensure_fresh) for the load-on-demand pattern.
    #[must_use]
    pub fn remote(&self) -> Option<B::Snapshot> {
        self.state().remote.clone()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.state().status
    }

    /// Returns the freshness of the cached snapshot.
    #[must_use]
    pub fn sync_mark(&self) -> SyncMark {
        self.state().sync
    }

    /// Marks the cached snapshot stale so the next
    /// [`ensure_fresh`](Self::ensure_fresh) refetches it.
    pub fn mark_stale(&self) {
        self.state_mut().sync = SyncMark::Stale;
    }

    /// Refreshes the snapshot iff the sync mark says it is needed.
    ///
    /// A previous failed fetch does not re-arm this (see [`SyncMark`]);
    /// call [`refresh`](Self::refresh) to retry explicitly.
    ///
    /// # Errors
    ///
    /// Propagates the refresh error when a refresh was needed and failed.
    pub async fn ensure_fresh(&self) -> Result<()> {
        if self.sync_mark().needs_refresh() {
            self.refresh().await
        } else {
            Ok(())
        }
    }

    /// Fetches the remote snapshot and updates snapshot, sync mark, and
    /// status.
    ///
    /// A vanished resource leaves the snapshot absent with status
    /// `Disconnected`; a transport failure leaves it absent with status
    /// `Error`. Both set the sync mark to `Failed` so reads do not loop on
    /// a permanently-missing resource. After a successful fetch (found or
    /// vanished) the refresh of all child modules is scheduled in the
    /// background and a `ChildrenRefreshed` event fires once they finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch itself fails; the resource's own
    /// status is set to `Error` first, so status pollers observe the
    /// degraded state either way.
    pub async fn refresh(&self) -> Result<()> {
        let module = self.module()?;
        debug!("Refreshing resource {}", self.id);
        self.set_status(Status::Loading);

        match module.binding().get_remote(&self.id).await {
            Ok(Some(snapshot)) => {
                self.apply_snapshot(snapshot)?;
                self.spawn_children_refresh();
                Ok(())
            }
            Ok(None) => {
                debug!("Resource {} not found remotely", self.id);
                self.mark_absent(Status::Disconnected);
                self.spawn_children_refresh();
                Ok(())
            }
            Err(error) => {
                warn!("Failed to refresh resource {}: {error}", self.id);
                self.mark_absent(Status::Error);
                Err(error)
            }
        }
    }

    /// Creates this resource remotely with the given config.
    ///
    /// Convenience wrapper over a [`Draft`](super::Draft) commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the owning module is gone or the commit fails.
    pub async fn create(&self, config: B::Config) -> Result<Arc<Self>> {
        let module = self.module()?;
        let mut draft = module.draft(&self.name, &self.resource_group);
        *draft.config_mut() = config;
        draft.commit().await
    }

    /// Updates this resource remotely with the given config.
    ///
    /// Convenience wrapper over a [`Draft`](super::Draft) commit.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::Precondition`] if the resource does not
    /// exist, or the commit error.
    pub async fn update(&self, config: B::Config) -> Result<Arc<Self>> {
        if !self.exists() {
            return Err(NimbusError::precondition(format!(
                "cannot update {}: no remote snapshot",
                self.id
            )));
        }
        let module = self.module()?;
        let mut draft = module.draft(&self.name, &self.resource_group);
        *draft.config_mut() = config;
        draft.commit().await
    }

    /// Deletes this resource remotely and evicts it from the module cache.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::Precondition`] if the resource does not
    /// exist, or the remote deletion error (status is set to `Error`
    /// first and the resource stays cached).
    pub async fn delete(&self) -> Result<()> {
        if !self.exists() {
            return Err(NimbusError::precondition(format!(
                "cannot delete {}: no remote snapshot",
                self.id
            )));
        }
        let module = self.module()?;
        debug!("Deleting resource {}", self.id);
        self.set_status(Status::Deleting);

        match module.binding().delete_remote(&self.id).await {
            Ok(()) => {
                module.evict(&self.name, &self.resource_group);
                self.mark_deleted();
                Ok(())
            }
            Err(error) => {
                warn!("Failed to delete resource {}: {error}", self.id);
                self.set_status(Status::Error);
                Err(error)
            }
        }
    }

    /// Attaches a child module scoped under this resource.
    pub fn attach_module<C: RemoteBinding>(&self, module: Arc<Module<C>>) {
        self.children_mut().push(module);
    }

    /// Creates a child module parented at this resource's id and attaches
    /// it.
    pub fn child_module<C: RemoteBinding>(
        &self,
        name: impl Into<String>,
        binding: C,
    ) -> Arc<Module<C>> {
        let module = Module::new(name, self.id.clone(), binding);
        self.attach_module(Arc::clone(&module));
        module
    }

    /// Returns a snapshot of the attached child modules.
    #[must_use]
    pub fn child_modules(&self) -> Vec<Arc<dyn Refreshable>> {
        self.children().clone()
    }

    /// Replaces the cached snapshot from a successful fetch or commit and
    /// recomputes the status through the binding's mapping.
    pub(crate) fn apply_snapshot(&self, snapshot: B::Snapshot) -> Result<()> {
        let module = self.module()?;
        let status = module.binding().status_of(&snapshot);
        {
            let mut state = self.state_mut();
            state.remote = Some(snapshot);
            state.sync = SyncMark::now();
        }
        self.set_status(status);
        Ok(())
    }

    /// Records that the resource is gone or unreachable.
    fn mark_absent(&self, status: Status) {
        {
            let mut state = self.state_mut();
            state.remote = None;
            state.sync = SyncMark::Failed;
        }
        self.set_status(status);
    }

    /// Records a completed deletion (remote or observed via refresh diff).
    pub(crate) fn mark_deleted(&self) {
        {
            let mut state = self.state_mut();
            state.remote = None;
            state.sync = SyncMark::Failed;
        }
        self.set_status(Status::Deleted);
    }

    /// Sets the status, emitting a `StatusChanged` event when it differs.
    pub(crate) fn set_status(&self, status: Status) {
        let previous = {
            let mut state = self.state_mut();
            std::mem::replace(&mut state.status, status)
        };
        if previous != status {
            debug!("Status of {} changed: {previous} -> {status}", self.id);
            if let Some(resource) = self.weak_self.upgrade() {
                // Send failures just mean nobody is subscribed.
                let _ = self.events.send(ResourceEvent::StatusChanged {
                    resource,
                    previous,
                    current: status,
                });
            }
        }
    }

    /// Schedules a background refresh of all child modules, followed by a
    /// `ChildrenRefreshed` event. Child failures are logged, not
    /// propagated; the caller's refresh already succeeded.
    fn spawn_children_refresh(&self) {
        let Some(resource) = self.weak_self.upgrade() else {
            return;
        };
        let children = self.children().clone();
        tokio::spawn(async move {
            for child in children {
                if let Err(error) = child.refresh().await {
                    warn!(
                        "Failed to refresh child module {} of {}: {error}",
                        child.module_name(),
                        resource.id()
                    );
                }
            }
            let _ = resource.events.send(ResourceEvent::ChildrenRefreshed {
                resource: Arc::clone(&resource),
            });
        });
    }

    fn state(&self) -> RwLockReadGuard<'_, ResourceState<B::Snapshot>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, ResourceState<B::Snapshot>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn children(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn Refreshable>>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn children_mut(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn Refreshable>>> {
        self.children.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: RemoteBinding> std::fmt::Debug for Resource<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id.as_str())
            .field("status", &self.status())
            .field("exists", &self.exists())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeServers, ServerConfig, TEST_GROUP, init_tracing, test_parent};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::timeout;

    fn servers_module(binding: FakeServers) -> Arc<Module<FakeServers>> {
        init_tracing();
        Module::new("servers", test_parent(), binding)
    }

    #[tokio::test]
    async fn test_placeholder_refresh_hydrates() {
        let module = servers_module(FakeServers::with_servers(&["db-0"]));
        let resource = module.init("db-0", TEST_GROUP).unwrap();

        assert!(!resource.exists());
        assert_eq!(resource.status(), Status::Disconnected);

        resource.refresh().await.unwrap();

        assert!(resource.exists());
        assert_eq!(resource.status(), Status::Running);
        assert!(resource.sync_mark().synced_at().is_some());
    }

    #[tokio::test]
    async fn test_refresh_not_found_marks_failed_without_loop() {
        let module = servers_module(FakeServers::default());
        let resource = module.init("ghost", TEST_GROUP).unwrap();

        resource.refresh().await.unwrap();

        assert!(!resource.exists());
        assert_eq!(resource.status(), Status::Disconnected);
        assert_eq!(resource.sync_mark(), SyncMark::Failed);

        let fetches_after_refresh = module.binding().get_calls.load(Ordering::SeqCst);
        resource.ensure_fresh().await.unwrap();
        assert_eq!(
            module.binding().get_calls.load(Ordering::SeqCst),
            fetches_after_refresh,
            "a failed fetch must not re-arm ensure_fresh"
        );
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_propagates_and_degrades() {
        let binding = FakeServers::with_servers(&["db-0"]);
        binding.fail_next.store(true, Ordering::SeqCst);
        let module = servers_module(binding);
        let resource = module.init("db-0", TEST_GROUP).unwrap();

        let result = resource.refresh().await;

        assert!(result.is_err());
        assert!(!resource.exists());
        assert_eq!(resource.status(), Status::Error);
        assert_eq!(resource.sync_mark(), SyncMark::Failed);
    }

    #[tokio::test]
    async fn test_ensure_fresh_skips_when_synced() {
        let module = servers_module(FakeServers::with_servers(&["db-0"]));
        let resource = module.get("db-0", TEST_GROUP).await.unwrap().unwrap();

        let fetches = module.binding().get_calls.load(Ordering::SeqCst);
        resource.ensure_fresh().await.unwrap();
        assert_eq!(module.binding().get_calls.load(Ordering::SeqCst), fetches);

        resource.mark_stale();
        resource.ensure_fresh().await.unwrap();
        assert_eq!(
            module.binding().get_calls.load(Ordering::SeqCst),
            fetches + 1
        );
    }

    #[tokio::test]
    async fn test_delete_requires_existing_remote() {
        let module = servers_module(FakeServers::default());
        let resource = module.init("db-0", TEST_GROUP).unwrap();

        let result = resource.delete().await;
        assert!(matches!(result, Err(NimbusError::Precondition { .. })));
    }

    #[tokio::test]
    async fn test_delete_evicts_from_cache() {
        let module = servers_module(FakeServers::with_servers(&["db-0"]));
        let resource = module.get("db-0", TEST_GROUP).await.unwrap().unwrap();

        resource.delete().await.unwrap();

        assert_eq!(resource.status(), Status::Deleted);
        assert!(!resource.exists());
        assert_eq!(module.binding().delete_calls.load(Ordering::SeqCst), 1);
        assert!(module.cached("db-0", TEST_GROUP).is_none());
    }

    #[tokio::test]
    async fn test_status_change_emits_event() {
        let module = servers_module(FakeServers::with_servers(&["db-0"]));
        let resource = module.init("db-0", TEST_GROUP).unwrap();
        let mut events = module.subscribe();

        resource.refresh().await.unwrap();

        // Loading is emitted first, then the derived stable status.
        let mut saw_running = false;
        while let Ok(Ok(event)) = timeout(Duration::from_millis(200), events.recv()).await {
            if let crate::event::ResourceEvent::StatusChanged { current, .. } = event {
                if current == Status::Running {
                    saw_running = true;
                    break;
                }
            }
        }
        assert!(saw_running);
    }

    #[tokio::test]
    async fn test_refresh_cascades_into_child_modules() {
        let module = servers_module(FakeServers::with_servers(&["app"]));
        let resource = module.get("app", TEST_GROUP).await.unwrap().unwrap();
        let instances = resource.child_module("instances", FakeServers::with_servers(&["i-0", "i-1"]));
        let mut events = module.subscribe();

        resource.refresh().await.unwrap();

        // Wait for the background cascade to announce completion.
        loop {
            let event = timeout(Duration::from_secs(2), events.recv())
                .await
                .expect("timed out waiting for cascade")
                .expect("event channel closed");
            if matches!(event, crate::event::ResourceEvent::ChildrenRefreshed { .. }) {
                break;
            }
        }

        assert!(instances.sync_mark().synced_at().is_some());
        assert!(instances.cached("i-0", TEST_GROUP).is_some());
        assert!(instances.cached("i-1", TEST_GROUP).is_some());
        assert_eq!(instances.parent_id().as_str(), resource.id().as_str());
    }

    #[tokio::test]
    async fn test_update_requires_existing_remote() {
        let module = servers_module(FakeServers::default());
        let resource = module.init("db-0", TEST_GROUP).unwrap();

        let result = resource.update(ServerConfig::default()).await;
        assert!(matches!(result, Err(NimbusError::Precondition { .. })));
    }
}
