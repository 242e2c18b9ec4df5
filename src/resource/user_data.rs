//! `user_data` resource - a user's user and app metadata documents

use crate::identity::{UserRef, UserSpecifier};
use crate::metadata::{MetadataDocuments, MetadataReconciler};
use crate::projection::{documents_equivalent, flatten_document, satisfies};
use anyhow::{Result, anyhow};
use declarative::Resource;
use directory::UserClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declared metadata of one user, as JSON object text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataConfig {
    pub user: UserSpecifier,
    #[serde(default)]
    pub user_metadata: Option<String>,
    #[serde(default)]
    pub app_metadata: Option<String>,
}

/// Observed documents, `""` when a document has no keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataState {
    pub user_id: String,
    pub user_metadata: String,
    pub app_metadata: String,
}

impl UserDataState {
    fn observed(user: &UserRef, docs: &MetadataDocuments) -> Self {
        Self {
            user_id: user.to_string(),
            user_metadata: flatten_document(&docs.user),
            app_metadata: flatten_document(&docs.app),
        }
    }

    fn documents(&self) -> crate::Result<MetadataDocuments> {
        MetadataDocuments::from_text(Some(&self.user_metadata), Some(&self.app_metadata))
    }
}

/// Metadata documents of a user
///
/// Writes only touch the declared keys. Deleting the resource removes every
/// key the documents hold at that moment, including keys written by another
/// `user_data` instance for the same user or outside any declaration.
#[derive(Debug, Clone)]
pub struct UserData {
    client: Arc<dyn UserClient>,
}

impl UserData {
    pub fn new(client: Arc<dyn UserClient>) -> Self {
        Self { client }
    }

    fn reconciler(&self) -> MetadataReconciler<'_> {
        MetadataReconciler::new(self.client.as_ref())
    }

    fn converge(&self, user: &UserRef, config: &UserDataConfig) -> Result<UserDataState> {
        let desired = MetadataDocuments::from_text(
            config.user_metadata.as_deref(),
            config.app_metadata.as_deref(),
        )?;
        let reconciler = self.reconciler();
        reconciler.write(user, &desired)?;

        let observed = reconciler
            .read(user)?
            .ok_or_else(|| anyhow!("user {user} not found after writing metadata"))?;
        Ok(UserDataState::observed(user, &observed))
    }
}

impl Resource for UserData {
    type Config = UserDataConfig;
    type State = UserDataState;

    fn resource_type(&self) -> &'static str {
        "user_data"
    }

    fn desired_identity(&self, config: &UserDataConfig) -> Result<String> {
        Ok(config.user.resolve(self.client.as_ref())?.into_inner())
    }

    fn create(&self, config: &UserDataConfig) -> Result<(String, UserDataState)> {
        let user = config.user.resolve(self.client.as_ref())?;
        let state = self.converge(&user, config)?;
        Ok((user.into_inner(), state))
    }

    fn read(&self, id: &str) -> Result<Option<UserDataState>> {
        let user = UserRef::new(id);
        let observed = self.reconciler().read(&user)?;
        Ok(observed.map(|docs| UserDataState::observed(&user, &docs)))
    }

    fn update(
        &self,
        id: &str,
        config: &UserDataConfig,
        _prior: &UserDataState,
    ) -> Result<UserDataState> {
        self.converge(&UserRef::new(id), config)
    }

    fn delete(&self, id: &str, _prior: &UserDataState) -> Result<()> {
        self.reconciler().purge(&UserRef::new(id))?;
        Ok(())
    }

    fn needs_update(&self, config: &UserDataConfig, state: &UserDataState) -> bool {
        let unchanged = |declared: &Option<String>, observed: &str| {
            documents_equivalent(declared.as_deref().unwrap_or_default(), observed)
        };
        if unchanged(&config.user_metadata, &state.user_metadata)
            && unchanged(&config.app_metadata, &state.app_metadata)
        {
            return false;
        }

        let desired = MetadataDocuments::from_text(
            config.user_metadata.as_deref(),
            config.app_metadata.as_deref(),
        );
        match (desired, state.documents()) {
            (Ok(desired), Ok(observed)) => {
                !(satisfies(&desired.user, &observed.user) && satisfies(&desired.app, &observed.app))
            }
            // Let the update hook report the parse error
            _ => true,
        }
    }
}
