//! Resource and data source definitions
//!
//! Every managed entity is modeled as a [`declarative::Resource`]:
//! - `user_roles`: the set of roles assigned to a user
//! - `user_data`: the user's two metadata documents
//!
//! plus the read-only `user` lookup ([`declarative::DataSource`]).
//! All of them share one [`UserClient`] through [`Provider`].

mod user_data;
mod user_lookup;
mod user_roles;

pub use user_data::{UserData, UserDataConfig, UserDataState};
pub use user_lookup::UserLookup;
pub use user_roles::{UserRoles, UserRolesConfig, UserRolesState};

use crate::config::ProviderConfig;
use crate::paths;
use declarative::{FileStateStore, Host};
use directory::UserClient;
use std::sync::Arc;

/// Entry point handing out resources bound to one directory client
#[derive(Debug, Clone)]
pub struct Provider {
    client: Arc<dyn UserClient>,
}

impl Provider {
    pub fn new(client: Arc<dyn UserClient>) -> Self {
        Self { client }
    }

    /// Build a provider against the management API described by `config`
    pub fn from_config(config: &ProviderConfig) -> crate::Result<Self> {
        let client = config.build_client()?;
        log::debug!("Using management API at {}", client.base_url());
        Ok(Self::new(Arc::new(client)))
    }

    /// Load the provider config from its default location and environment
    pub fn load() -> anyhow::Result<Self> {
        let config = ProviderConfig::load()?;
        Ok(Self::from_config(&config)?)
    }

    pub fn client(&self) -> &dyn UserClient {
        self.client.as_ref()
    }

    pub fn user_roles(&self) -> UserRoles {
        UserRoles::new(Arc::clone(&self.client))
    }

    pub fn user_data(&self) -> UserData {
        UserData::new(Arc::clone(&self.client))
    }

    pub fn user_lookup(&self) -> UserLookup {
        UserLookup::new(Arc::clone(&self.client))
    }
}

/// Host persisting records in the default state file
pub fn file_host() -> anyhow::Result<Host<FileStateStore>> {
    let path = paths::state_path()?;
    log::debug!("Using state file {}", path.display());
    Ok(Host::new(FileStateStore::new(path)))
}
