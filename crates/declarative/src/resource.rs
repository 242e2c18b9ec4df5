//! Resource and data source traits
//!
//! A [`Resource`] is a remote entity whose lifecycle is driven by hooks:
//! create, read, update, delete and import. The host persists the identity
//! and observed state returned by the hooks between passes; the resource
//! itself keeps nothing across calls.

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Core trait for declarative resources
///
/// # Example
///
/// ```ignore
/// use declarative::Resource;
///
/// #[derive(Debug)]
/// struct Tag { store: Store }
///
/// impl Resource for Tag {
///     type Config = String;
///     type State = String;
///
///     fn resource_type(&self) -> &'static str { "tag" }
///
///     fn desired_identity(&self, config: &String) -> anyhow::Result<String> {
///         Ok(config.clone())
///     }
///
///     fn create(&self, config: &String) -> anyhow::Result<(String, String)> {
///         self.store.insert(config)?;
///         Ok((config.clone(), config.clone()))
///     }
///
///     fn read(&self, id: &str) -> anyhow::Result<Option<String>> {
///         Ok(self.store.get(id))
///     }
///
///     fn update(&self, id: &str, _: &String, _: &String) -> anyhow::Result<String> {
///         Ok(id.to_string())
///     }
///
///     fn delete(&self, id: &str, _: &String) -> anyhow::Result<()> {
///         self.store.remove(id)
///     }
///
///     fn needs_update(&self, _: &String, _: &String) -> bool { false }
/// }
/// ```
pub trait Resource: fmt::Debug {
    /// Declared configuration
    type Config: fmt::Debug;

    /// Observed state persisted by the host
    type State: Serialize + DeserializeOwned + Clone + fmt::Debug;

    /// Resource type name (e.g. "user_roles")
    fn resource_type(&self) -> &'static str;

    /// Identity the configuration binds to
    ///
    /// A change of identity between passes forces replacement.
    fn desired_identity(&self, config: &Self::Config) -> Result<String>;

    /// Create the instance and return its identity and observed state
    fn create(&self, config: &Self::Config) -> Result<(String, Self::State)>;

    /// Observe the instance
    ///
    /// `Ok(None)` tells the host the instance is gone and its identity
    /// should be cleared.
    fn read(&self, id: &str) -> Result<Option<Self::State>>;

    /// Converge an existing instance and return the new observed state
    fn update(&self, id: &str, config: &Self::Config, prior: &Self::State) -> Result<Self::State>;

    /// Remove the instance using the last observed state
    fn delete(&self, id: &str, prior: &Self::State) -> Result<()>;

    /// Adopt an existing remote entity
    ///
    /// Defaults to a passthrough [`Resource::read`].
    fn import(&self, id: &str) -> Result<Option<Self::State>> {
        self.read(id)
    }

    /// Check if the observed state drifted from the configuration
    fn needs_update(&self, config: &Self::Config, state: &Self::State) -> bool;
}

/// Read-only lookup of remote data
pub trait DataSource: fmt::Debug {
    /// Lookup arguments
    type Config: fmt::Debug;

    /// Projected result
    type State: Serialize + fmt::Debug;

    /// Data source type name (e.g. "user")
    fn data_type(&self) -> &'static str;

    /// Perform the lookup
    fn read(&self, config: &Self::Config) -> Result<Self::State>;
}
