//! The local resource tree.
//!
//! This module contains the hierarchy that mirrors the remote control
//! plane: [`Module`]s own name-keyed caches of [`Resource`]s, resources own
//! child modules, and [`Draft`]s stage mutations against either. Addressing
//! within the tree uses [`ResourceId`] paths.

mod draft;
mod id;
mod module;
mod resource;
mod sync;

pub use draft::Draft;
pub use id::{RESOURCE_GROUP_PLACEHOLDER, ResourceId};
pub use module::{Module, Refreshable};
pub use resource::Resource;
pub use sync::SyncMark;
