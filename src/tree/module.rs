//! Resource module: a named, cached collection of same-typed resources.
//!
//! The module owns the only shared mutable structure in the framework, the
//! name-keyed resource cache, and the refresh algorithm that keeps it
//! consistent with the remote listing. The refresh diff is add/remove only:
//! a name present both locally and remotely keeps its existing `Resource`
//! object, so callers holding a reference never get silently pointed at a
//! stale copy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tracing::{debug, info, warn};

use crate::error::{NimbusError, Result};
use crate::event::{EVENT_CHANNEL_CAPACITY, ResourceEvent};
use crate::remote::RemoteBinding;
use crate::status::Status;

use super::draft::Draft;
use super::id::ResourceId;
use super::resource::Resource;
use super::sync::SyncMark;

/// Object-safe view of a module for cascading refresh.
///
/// A resource's child modules have heterogeneous binding types; the parent
/// only needs to refresh them and name them in logs.
#[async_trait]
pub trait Refreshable: Send + Sync {
    /// Returns the module's collection name.
    fn module_name(&self) -> &str;

    /// Refreshes the module's cache from the remote listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote listing fails.
    async fn refresh(&self) -> Result<()>;
}

/// A named collection of resources sharing one parent and one binding.
pub struct Module<B: RemoteBinding> {
    name: String,
    parent_id: ResourceId,
    binding: B,
    weak_self: Weak<Module<B>>,
    cache: RwLock<HashMap<String, Arc<Resource<B>>>>,
    sync: StdMutex<SyncMark>,
    /// Serializes the diff-and-apply pass of `refresh`.
    refresh_lock: AsyncMutex<()>,
    /// Makes cold-cache loads single-flight.
    load_lock: AsyncMutex<()>,
    events: broadcast::Sender<ResourceEvent<B>>,
}

impl<B: RemoteBinding> Module<B> {
    /// Creates a module scoped under the given parent id.
    ///
    /// Top-level modules use a root id carrying
    /// [`RESOURCE_GROUP_PLACEHOLDER`](super::RESOURCE_GROUP_PLACEHOLDER);
    /// it is substituted per resource when ids are built.
    pub fn new(name: impl Into<String>, parent_id: impl Into<ResourceId>, binding: B) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new_cyclic(|weak| Self {
            name: name.into(),
            parent_id: parent_id.into(),
            binding,
            weak_self: weak.clone(),
            cache: RwLock::new(HashMap::new()),
            sync: StdMutex::new(SyncMark::Never),
            refresh_lock: AsyncMutex::new(()),
            load_lock: AsyncMutex::new(()),
            events,
        })
    }

    /// Returns the module's collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the id of the parent this module is scoped under.
    #[must_use]
    pub const fn parent_id(&self) -> &ResourceId {
        &self.parent_id
    }

    /// Returns the module's remote binding.
    #[must_use]
    pub const fn binding(&self) -> &B {
        &self.binding
    }

    /// Subscribes to status-change and cascade events for this module's
    /// resources.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent<B>> {
        self.events.subscribe()
    }

    /// Returns the freshness of the cached listing.
    #[must_use]
    pub fn sync_mark(&self) -> SyncMark {
        *self.sync.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the listing stale so the next [`list`](Self::list) refreshes.
    pub fn mark_stale(&self) {
        self.set_sync(SyncMark::Stale);
    }

    /// Builds the id of a resource in this module:
    /// `{parent_id}/{module_name}/{resource_name}`, with the
    /// resource-group placeholder in the parent id substituted by `group`.
    #[must_use]
    pub fn to_resource_id(&self, name: &str, resource_group: &str) -> ResourceId {
        self.parent_id
            .with_resource_group(resource_group)
            .child(&self.name, name)
    }

    /// Lists all resources, refreshing first if the listing is stale.
    ///
    /// The returned vector is a snapshot copy; it does not track later
    /// cache changes.
    ///
    /// # Errors
    ///
    /// Returns an error if a needed refresh fails.
    pub async fn list(&self) -> Result<Vec<Arc<Resource<B>>>> {
        if self.sync_mark().needs_refresh() {
            self.refresh().await?;
        }
        Ok(self.cache_read().values().cloned().collect())
    }

    /// Returns the cached resource for the name, or `None`.
    ///
    /// Lock-free-read fast path of [`get`](Self::get); never fetches.
    #[must_use]
    pub fn cached(&self, name: &str, resource_group: &str) -> Option<Arc<Resource<B>>> {
        self.cache_read()
            .get(&Self::cache_key(name, resource_group))
            .cloned()
    }

    /// Cache-or-load lookup of one resource.
    ///
    /// Cache hits return immediately. Misses are single-flight: concurrent
    /// callers for a cold name produce exactly one remote fetch, and all of
    /// them observe the same resource object. Not-found is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote fetch fails.
    pub async fn get(&self, name: &str, resource_group: &str) -> Result<Option<Arc<Resource<B>>>> {
        if let Some(resource) = self.cached(name, resource_group) {
            return Ok(Some(resource));
        }

        let _guard = self.load_lock.lock().await;
        if let Some(resource) = self.cached(name, resource_group) {
            return Ok(Some(resource));
        }

        let id = self.to_resource_id(name, resource_group);
        debug!("Cache miss for {id}, fetching");
        match self.binding.get_remote(&id).await? {
            Some(snapshot) => {
                let status = self.binding.status_of(&snapshot);
                let resource = self.new_resource(name, resource_group, Some((snapshot, status)));
                Ok(Some(self.insert_if_absent(name, resource_group, resource)))
            }
            None => {
                debug!("Resource {id} not found remotely");
                Ok(None)
            }
        }
    }

    /// Registers a local placeholder for a resource that does not exist
    /// remotely yet.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::AlreadyExists`] if the name is already
    /// cached.
    pub fn init(&self, name: &str, resource_group: &str) -> Result<Arc<Resource<B>>> {
        let key = Self::cache_key(name, resource_group);
        let mut cache = self.cache_write();
        if cache.contains_key(&key) {
            return Err(NimbusError::already_exists(
                self.to_resource_id(name, resource_group).as_str(),
            ));
        }
        let resource = self.new_resource(name, resource_group, None);
        cache.insert(key, Arc::clone(&resource));
        debug!("Registered placeholder {}", resource.id());
        Ok(resource)
    }

    /// Deletes a resource by name: remote deletion, then cache eviction.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::NotFound`] if the resource neither is cached
    /// nor exists remotely, or the deletion error.
    pub async fn delete(&self, name: &str, resource_group: &str) -> Result<()> {
        match self.get(name, resource_group).await? {
            Some(resource) => resource.delete().await,
            None => Err(NimbusError::not_found(
                self.to_resource_id(name, resource_group).as_str(),
            )),
        }
    }

    /// Refreshes the cache from the full remote listing.
    ///
    /// One diff-and-apply pass runs at a time. The listing mark is set
    /// stale up front, so concurrent readers in the refresh window observe
    /// "needs refresh" rather than a half-updated cache. The diff is
    /// add/remove only: listed-but-not-cached names are inserted hydrated,
    /// cached-but-not-listed names are evicted and marked deleted, and
    /// names in both keep their object untouched (their snapshot refreshes
    /// lazily through `Resource::ensure_fresh`).
    ///
    /// # Errors
    ///
    /// Returns the listing error; the mark then stays stale, so the next
    /// [`list`](Self::list) retries.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        info!("Refreshing module {}", self.name);
        self.set_sync(SyncMark::Stale);

        let listed = match self.binding.list_remote().await {
            Ok(listed) => listed,
            Err(error) => {
                warn!("Failed to list module {}: {error}", self.name);
                return Err(error);
            }
        };

        let mut listed_by_key: HashMap<String, B::Snapshot> = HashMap::with_capacity(listed.len());
        for snapshot in listed {
            let key = Self::cache_key(&self.binding.name_of(&snapshot), &self.binding.group_of(&snapshot));
            listed_by_key.insert(key, snapshot);
        }

        let mut evicted = Vec::new();
        {
            let mut cache = self.cache_write();
            let to_remove: Vec<String> = cache
                .keys()
                .filter(|key| !listed_by_key.contains_key(*key))
                .cloned()
                .collect();
            for key in to_remove {
                if let Some(resource) = cache.remove(&key) {
                    evicted.push(resource);
                }
            }
            for (key, snapshot) in listed_by_key {
                if !cache.contains_key(&key) {
                    let name = self.binding.name_of(&snapshot);
                    let group = self.binding.group_of(&snapshot);
                    let status = self.binding.status_of(&snapshot);
                    let resource = self.new_resource(&name, &group, Some((snapshot, status)));
                    cache.insert(key, resource);
                }
            }
            debug!("Module {} now caches {} resources", self.name, cache.len());
        }
        for resource in evicted {
            debug!("Evicting {}", resource.id());
            resource.mark_deleted();
        }

        self.set_sync(SyncMark::now());
        Ok(())
    }

    /// Creates a draft for a resource of this module, whether or not it
    /// exists yet.
    #[must_use]
    pub fn draft(&self, name: impl Into<String>, resource_group: impl Into<String>) -> Draft<B> {
        Draft::new(
            name.into(),
            resource_group.into(),
            None,
            self.weak_self.clone(),
        )
    }

    /// Creates a draft updating an existing resource.
    #[must_use]
    pub fn draft_of(&self, resource: &Arc<Resource<B>>) -> Draft<B> {
        Draft::new(
            resource.name().to_string(),
            resource.resource_group().to_string(),
            Some(Arc::clone(resource)),
            self.weak_self.clone(),
        )
    }

    /// Inserts a committed snapshot into the cache, reusing the cached
    /// object (placeholder or raced insert) when one exists.
    pub(crate) fn register(
        &self,
        name: &str,
        resource_group: &str,
        snapshot: B::Snapshot,
    ) -> Result<Arc<Resource<B>>> {
        let resource = match self.cached(name, resource_group) {
            Some(resource) => resource,
            None => {
                let fresh = self.new_resource(name, resource_group, None);
                self.insert_if_absent(name, resource_group, fresh)
            }
        };
        resource.apply_snapshot(snapshot)?;
        Ok(resource)
    }

    /// Removes a resource from the cache.
    pub(crate) fn evict(&self, name: &str, resource_group: &str) {
        self.cache_write()
            .remove(&Self::cache_key(name, resource_group));
    }

    /// Inserts unless the key is already present; returns the cached
    /// winner either way, preserving object identity for concurrent
    /// callers.
    fn insert_if_absent(
        &self,
        name: &str,
        resource_group: &str,
        resource: Arc<Resource<B>>,
    ) -> Arc<Resource<B>> {
        let mut cache = self.cache_write();
        Arc::clone(
            cache
                .entry(Self::cache_key(name, resource_group))
                .or_insert(resource),
        )
    }

    fn new_resource(
        &self,
        name: &str,
        resource_group: &str,
        seed: Option<(B::Snapshot, Status)>,
    ) -> Arc<Resource<B>> {
        Resource::build(
            name,
            resource_group,
            self.to_resource_id(name, resource_group),
            self.weak_self.clone(),
            self.events.clone(),
            seed,
        )
    }

    fn cache_key(name: &str, resource_group: &str) -> String {
        format!("{resource_group}/{name}")
    }

    fn set_sync(&self, mark: SyncMark) {
        *self.sync.lock().unwrap_or_else(PoisonError::into_inner) = mark;
    }

    fn cache_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Resource<B>>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache_write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Resource<B>>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<B: RemoteBinding> Refreshable for Module<B> {
    fn module_name(&self) -> &str {
        &self.name
    }

    async fn refresh(&self) -> Result<()> {
        Self::refresh(self).await
    }
}

impl<B: RemoteBinding> std::fmt::Debug for Module<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("parent_id", &self.parent_id.as_str())
            .field("cached", &self.cache_read().len())
            .finish_non_exhaustive()
    }
}
