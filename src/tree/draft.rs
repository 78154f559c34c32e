//! Draft mutation buffer and the create-or-update commit protocol.
//!
//! A draft turns a resource type's heterogeneous create and update calls
//! into one uniform `commit()`. The buffer is owned by exactly one caller:
//! mutation and commit take `&mut self`, so exclusive access is a
//! compile-time guarantee rather than a runtime lock.

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};

use crate::error::{NimbusError, Result};
use crate::remote::{DraftConfig, RemoteBinding};
use crate::status::Status;

use super::module::Module;
use super::resource::Resource;

/// A transient mutation buffer for one resource.
///
/// Created by a module factory ([`Module::draft`] / [`Module::draft_of`]),
/// mutated through [`config_mut`](Self::config_mut), and consumed by
/// [`commit`](Self::commit). The buffer is reset on every commit exit path,
/// so a draft can never be partially replayed.
pub struct Draft<B: RemoteBinding> {
    name: String,
    resource_group: String,
    origin: Option<Arc<Resource<B>>>,
    module: Weak<Module<B>>,
    config: B::Config,
}

impl<B: RemoteBinding> Draft<B> {
    pub(crate) fn new(
        name: String,
        resource_group: String,
        origin: Option<Arc<Resource<B>>>,
        module: Weak<Module<B>>,
    ) -> Self {
        Self {
            name,
            resource_group,
            origin,
            module,
            config: B::Config::default(),
        }
    }

    /// Returns the owning module.
    fn module(&self) -> Result<Arc<Module<B>>> {
        self.module.upgrade().ok_or_else(|| {
            NimbusError::detached(format!("{}/{}", self.resource_group, self.name))
        })
    }

    /// Returns the name of the resource this draft targets.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resource group this draft targets.
    #[must_use]
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Returns the pre-existing resource being updated, if any.
    #[must_use]
    pub const fn origin(&self) -> Option<&Arc<Resource<B>>> {
        self.origin.as_ref()
    }

    /// Returns the mutation buffer.
    #[must_use]
    pub const fn config(&self) -> &B::Config {
        &self.config
    }

    /// Returns the mutation buffer for writing.
    pub fn config_mut(&mut self) -> &mut B::Config {
        &mut self.config
    }

    /// Returns true if the buffer holds at least one explicitly-set field
    /// that differs from the persisted value.
    ///
    /// Compared field by field against the origin's snapshot; with no
    /// persisted snapshot any explicitly-set field counts as a
    /// modification.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        match self.origin.as_ref().and_then(|resource| resource.remote()) {
            Some(snapshot) => self.config.differs_from(&snapshot),
            None => self.config.is_set(),
        }
    }

    /// Clears the mutation buffer.
    pub fn reset(&mut self) {
        self.config = B::Config::default();
    }

    /// Commits the draft: update when the resource exists remotely, create
    /// otherwise.
    ///
    /// An existing resource whose snapshot already matches the buffered
    /// fields is returned unchanged without a remote call, so committing a
    /// reset draft is a deterministic no-op. Status transitions to the
    /// matching unstable value before the remote call and to the derived
    /// stable value (or `Error`) after. The buffer is reset on every exit
    /// path.
    ///
    /// # Errors
    ///
    /// Returns the lookup or remote-call error; the affected resource's
    /// status is set to `Error` first.
    pub async fn commit(&mut self) -> Result<Arc<Resource<B>>> {
        let module = self.module()?;
        let cached = module.get(&self.name, &self.resource_group).await?;
        let snapshot = cached.as_ref().and_then(|resource| resource.remote());

        let outcome = if let (Some(resource), Some(snapshot)) = (cached.clone(), snapshot) {
            if self.config.differs_from(&snapshot) {
                info!("Updating resource {}", resource.id());
                resource.set_status(Status::Updating);
                match module.binding().update_remote(&snapshot, &self.config).await {
                    Ok(updated) => resource.apply_snapshot(updated).map(|()| resource),
                    Err(error) => {
                        warn!("Failed to update resource {}: {error}", resource.id());
                        resource.set_status(Status::Error);
                        Err(error)
                    }
                }
            } else {
                debug!("Draft for {} carries no changes, skipping remote call", resource.id());
                Ok(resource)
            }
        } else {
            let id = module.to_resource_id(&self.name, &self.resource_group);
            info!("Creating resource {id}");
            if let Some(placeholder) = &cached {
                placeholder.set_status(Status::Creating);
            }
            match module
                .binding()
                .create_remote(&self.name, &self.resource_group, &self.config)
                .await
            {
                Ok(created) => module.register(&self.name, &self.resource_group, created),
                Err(error) => {
                    warn!("Failed to create resource {id}: {error}");
                    if let Some(placeholder) = &cached {
                        placeholder.set_status(Status::Error);
                    }
                    Err(error)
                }
            }
        };

        self.reset();
        outcome
    }

    /// Commits a create unless the resource already exists, in which case
    /// the existing resource is returned untouched (buffer included).
    ///
    /// # Errors
    ///
    /// Returns the lookup or commit error.
    pub async fn create_if_not_exist(&mut self) -> Result<Arc<Resource<B>>> {
        let module = self.module()?;
        if let Some(resource) = module.get(&self.name, &self.resource_group).await?
            && resource.exists()
        {
            debug!("Resource {} already exists, skipping create", resource.id());
            return Ok(resource);
        }
        self.commit().await
    }

    /// Commits an update if the resource exists; `Ok(None)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the lookup or commit error.
    pub async fn update_if_exist(&mut self) -> Result<Option<Arc<Resource<B>>>> {
        let module = self.module()?;
        match module.get(&self.name, &self.resource_group).await? {
            Some(resource) if resource.exists() => self.commit().await.map(Some),
            _ => Ok(None),
        }
    }
}

impl<B: RemoteBinding> std::fmt::Debug for Draft<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Draft")
            .field("name", &self.name)
            .field("resource_group", &self.resource_group)
            .field("has_origin", &self.origin.is_some())
            .finish_non_exhaustive()
    }
}
