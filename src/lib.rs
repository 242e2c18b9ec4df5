//! # usersync
//!
//! Declarative reconciliation of a remote directory's users: the roles
//! assigned to them and their two metadata documents.
//!
//! ## Resources
//!
//! - [`UserRoles`] (`user_roles`): the declared role set is authoritative;
//!   missing roles are assigned and extra roles removed.
//! - [`UserData`] (`user_data`): declared metadata keys are merged into the
//!   stored documents; deleting the resource submits every stored key as null.
//! - [`UserLookup`] (`user`): read-only profile lookup.
//!
//! ## Example
//!
//! ```no_run
//! use usersync::{Provider, UserRolesConfig, UserSpecifier};
//!
//! let provider = Provider::load()?;
//! let mut host = usersync::resource::file_host()?;
//!
//! let config = UserRolesConfig {
//!     user: UserSpecifier::ById("auth0|5f7c8ec7c33c6c004bbafe82".into()),
//!     roles: ["rol_admin".to_string()].into(),
//! };
//! host.apply(&provider.user_roles(), "user_roles.admin", Some(&config))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod metadata;
pub mod paths;
pub mod projection;
pub mod resource;
pub mod roles;

pub use config::ProviderConfig;
pub use error::{Error, Result};
pub use identity::{UserRef, UserSpecifier};
pub use metadata::{MetadataDocuments, MetadataReconciler, MetadataScope};
pub use projection::{RoleSet, UserProfile};
pub use resource::{
    Provider, UserData, UserDataConfig, UserDataState, UserLookup, UserRoles, UserRolesConfig,
    UserRolesState,
};
pub use roles::RoleReconciler;
