//! # Declarative
//!
//! A small lifecycle host for declarative remote resources.
//!
//! This crate provides the abstractions for declaring desired state,
//! observing remote state, and converging the two through lifecycle hooks.
//!
//! ## Core Concepts
//!
//! - **Resource**: A remote entity with create/read/update/delete/import hooks
//! - **DataSource**: A read-only lookup
//! - **Change**: What a pass must do (create, update, replace, delete, nothing)
//! - **Host**: Runs one pass at a time and persists identity + observed state
//! - **StateStore**: Where records live between passes (JSON file or memory)
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{FileStateStore, Host};
//!
//! let mut host = Host::new(FileStateStore::new("state.json"));
//!
//! // Declared: create or converge
//! host.apply(&resource, "user_roles.admin", Some(&config))?;
//!
//! // No longer declared: delete
//! host.apply(&resource, "user_roles.admin", None)?;
//! ```
//!
//! ## Callbacks
//!
//! - [`ProgressCallback`]: Receives plan and hook notifications
//! - [`ConfirmCallback`]: Approves destructive changes
//!
//! Passes never overlap: one hook runs to completion before the next, and
//! nothing but the stored records carries over between passes.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod state;
pub mod types;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, LogProgress, NoProgress, ProgressCallback,
};
pub use diff::SetDiff;
pub use executor::Host;
pub use planner::plan_change;
pub use resource::{DataSource, Resource};
pub use state::{FileStateStore, InstanceRecord, MemoryStateStore, StateStore};
pub use types::{ApplyOptions, ApplyResult, ApplySummary, Change, Hook};
