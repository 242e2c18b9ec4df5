//! `user` data source - read-only profile lookup

use crate::error::Error;
use crate::identity::UserSpecifier;
use crate::projection::UserProfile;
use anyhow::Result;
use declarative::DataSource;
use directory::UserClient;
use std::sync::Arc;

/// Looks up a user and projects its full profile, roles included
#[derive(Debug, Clone)]
pub struct UserLookup {
    client: Arc<dyn UserClient>,
}

impl UserLookup {
    pub fn new(client: Arc<dyn UserClient>) -> Self {
        Self { client }
    }
}

impl DataSource for UserLookup {
    type Config = UserSpecifier;
    type State = UserProfile;

    fn data_type(&self) -> &'static str {
        "user"
    }

    fn read(&self, config: &UserSpecifier) -> Result<UserProfile> {
        let user = config.resolve_user(self.client.as_ref())?;
        let roles = self
            .client
            .list_role_assignments(&user.id)
            .map_err(|e| Error::read(format!("roles of user {}", user.id), e))?;
        log::debug!("Resolved {config} to {} with {} role(s)", user.id, roles.len());
        Ok(UserProfile::project(&user, &roles))
    }
}
