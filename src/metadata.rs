//! Metadata reconciliation
//!
//! A user carries two metadata documents, one per [`MetadataScope`]. The
//! directory only ever merges into them: submitted keys with values are
//! upserted, submitted keys set to null are removed, everything else is left
//! alone. Writing therefore submits the desired keys verbatim, and deleting
//! submits every known key as null.

use crate::error::{Error, Result};
use crate::identity::UserRef;
use crate::projection::parse_document;
use directory::{Metadata, UserClient, UserUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which of the two documents a key lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataScope {
    /// `user_metadata`, editable by the user
    User,
    /// `app_metadata`, editable only by applications
    Application,
}

impl MetadataScope {
    /// Field name in the user record
    pub fn field(&self) -> &'static str {
        match self {
            Self::User => "user_metadata",
            Self::Application => "app_metadata",
        }
    }
}

impl fmt::Display for MetadataScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// The pair of documents attached to a user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDocuments {
    pub user: Metadata,
    pub app: Metadata,
}

impl MetadataDocuments {
    /// Parse both documents from JSON text
    pub fn from_text(user: Option<&str>, app: Option<&str>) -> Result<Self> {
        Ok(Self {
            user: parse_document(user, MetadataScope::User)?,
            app: parse_document(app, MetadataScope::Application)?,
        })
    }

    /// Whether neither document has keys
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.app.is_empty()
    }
}

/// Build the merge write for a desired state
///
/// Contains exactly the desired keys; a scope without keys is left out.
pub fn write_request(desired: &MetadataDocuments) -> UserUpdate {
    UserUpdate {
        user_metadata: non_empty(&desired.user),
        app_metadata: non_empty(&desired.app),
    }
}

/// Build the write that removes every key of the stored documents
///
/// Each key is submitted as null; a scope without keys is left out.
pub fn purge_request(stored: &MetadataDocuments) -> UserUpdate {
    UserUpdate {
        user_metadata: non_empty(&tombstones(&stored.user)),
        app_metadata: non_empty(&tombstones(&stored.app)),
    }
}

fn non_empty(doc: &Metadata) -> Option<Metadata> {
    (!doc.is_empty()).then(|| doc.clone())
}

fn tombstones(doc: &Metadata) -> Metadata {
    doc.keys().map(|k| (k.clone(), Value::Null)).collect()
}

/// Reconciles the metadata documents of one user
pub struct MetadataReconciler<'a> {
    client: &'a dyn UserClient,
}

impl<'a> MetadataReconciler<'a> {
    pub fn new(client: &'a dyn UserClient) -> Self {
        Self { client }
    }

    /// Read both documents verbatim
    ///
    /// Returns `Ok(None)` when the user no longer exists.
    pub fn read(&self, user: &UserRef) -> Result<Option<MetadataDocuments>> {
        match self.client.read_user(user.as_str()) {
            Ok(record) => Ok(Some(MetadataDocuments {
                user: record.user_metadata.unwrap_or_default(),
                app: record.app_metadata.unwrap_or_default(),
            })),
            Err(e) if e.is_not_found() => {
                log::warn!("User {user} not found, treating metadata as absent");
                Ok(None)
            }
            Err(e) => Err(Error::read(format!("metadata of user {user}"), e)),
        }
    }

    /// Submit the desired documents as a merge write
    ///
    /// Returns `false` without calling the directory when both documents are
    /// empty.
    pub fn write(&self, user: &UserRef, desired: &MetadataDocuments) -> Result<bool> {
        let request = write_request(desired);
        if request.is_empty() {
            log::debug!("No metadata declared for user {user}, skipping update");
            return Ok(false);
        }

        self.client
            .update_user(user.as_str(), &request)
            .map_err(|e| Error::write(format!("update metadata of user {user}"), e))?;
        log::info!(
            "Updated metadata of user {user} ({} user keys, {} app keys)",
            desired.user.len(),
            desired.app.len()
        );
        Ok(true)
    }

    /// Remove every key the documents hold right now
    ///
    /// The documents are re-read first, so keys written since the last
    /// observation are removed too. Returns `false` without writing when the
    /// user is gone or holds no keys.
    pub fn purge(&self, user: &UserRef) -> Result<bool> {
        let Some(stored) = self.read(user)? else {
            log::debug!("User {user} is gone, metadata already purged");
            return Ok(false);
        };

        let request = purge_request(&stored);
        if request.is_empty() {
            log::debug!("No metadata stored for user {user}, nothing to purge");
            return Ok(false);
        }
        if !self.client.supports_tombstone_via_null() {
            return Err(Error::TombstoneUnsupported);
        }

        self.client
            .update_user(user.as_str(), &request)
            .map_err(|e| Error::write(format!("purge metadata of user {user}"), e))?;
        log::info!(
            "Purged metadata of user {user} ({} user keys, {} app keys)",
            stored.user.len(),
            stored.app.len()
        );
        Ok(true)
    }
}
