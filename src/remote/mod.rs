//! Remote binding layer.
//!
//! Everything the framework knows about a concrete resource type comes in
//! through the [`RemoteBinding`] trait: how to list, fetch, create, update,
//! and delete the remote entities, and how to read identity and status out
//! of a snapshot. Vendor SDK clients live behind implementations of this
//! trait and never leak into the tree model.

mod binding;

pub use binding::{DraftConfig, RemoteBinding};
