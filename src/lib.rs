// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Nimbus
//!
//! A hierarchical, lazily-synchronized resource model for cloud control
//! planes.
//!
//! ## Overview
//!
//! Nimbus mirrors a remote control plane's resource tree into local
//! objects, allowing you to:
//!
//! - Cache remote resources per collection ([`Module`]) with lazy,
//!   on-demand refresh
//! - Keep object identity stable across refreshes (the cache diff only
//!   adds and removes, it never replaces a surviving resource)
//! - Stage create/update mutations in a [`Draft`] and apply them with one
//!   uniform commit
//! - Track a derived lifecycle [`Status`] per resource, with change
//!   notifications and background propagation into child modules
//!
//! ## Architecture
//!
//! All provider-specific behavior enters through one hook trait per
//! resource type:
//!
//! 1. **[`RemoteBinding`]**: list/fetch/create/update/delete one kind of
//!    remote entity, plus identity and status extraction from snapshots
//! 2. **[`Module`]**: owns the name-keyed cache and the refresh diff
//! 3. **[`Resource`]**: one cached entity, its snapshot, and its status
//! 4. **[`Draft`]**: a single-owner mutation buffer committed through the
//!    binding
//!
//! ## Modules
//!
//! - [`error`]: Error hierarchy for framework and remote failures
//! - [`status`]: Lifecycle status labels and their stable/unstable split
//! - [`remote`]: The binding hook interface concrete types implement
//! - [`tree`]: Resources, modules, drafts, ids, and sync marks
//! - [`event`]: Status-change and cascade notifications
//!
//! ## Example
//!
//! ```ignore
//! let servers = Module::new("servers", "/subscriptions/s1", binding);
//!
//! let mut draft = servers.draft("db-0", "rg-west");
//! draft.config_mut().capacity = Some(4);
//! let server = draft.commit().await?;
//!
//! assert!(server.exists());
//! assert!(server.status().is_stable());
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod error;
pub mod event;
pub mod remote;
pub mod status;
pub mod tree;

#[cfg(test)]
mod testutil;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{NimbusError, RemoteError, Result};
pub use event::{EVENT_CHANNEL_CAPACITY, ResourceEvent};
pub use remote::{DraftConfig, RemoteBinding};
pub use status::Status;
pub use tree::{
    Draft, Module, RESOURCE_GROUP_PLACEHOLDER, Refreshable, Resource, ResourceId, SyncMark,
};
