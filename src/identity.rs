//! User identity resolution
//!
//! Resources name their user either directly or by a connection and email
//! pair. [`UserSpecifier::resolve`] turns either form into a [`UserRef`].

use crate::error::{Error, Result};
use directory::{User, UserClient};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a remote user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRef(String);

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How a declaration names its user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSpecifier {
    /// A direct identifier
    ById(String),
    /// The user with this email in this connection
    ByConnectionAndEmail { connection: String, email: String },
}

impl UserSpecifier {
    /// Build a specifier from optional declaration inputs
    ///
    /// Exactly one form must be complete: an identifier alone, or a
    /// connection together with an email. Blank inputs count as missing.
    pub fn from_parts(
        user_id: Option<&str>,
        connection: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }

        match (present(user_id), present(connection), present(email)) {
            (Some(id), None, None) => Ok(Self::ById(id.to_string())),
            (Some(_), ..) => Err(Error::Configuration(
                "user_id cannot be combined with connection or email".into(),
            )),
            (None, Some(connection), Some(email)) => Ok(Self::ByConnectionAndEmail {
                connection: connection.to_string(),
                email: email.to_string(),
            }),
            (None, ..) => Err(Error::Configuration(
                "either user_id or both connection and email are required".into(),
            )),
        }
    }

    /// Resolve to a user identifier
    ///
    /// A direct identifier is returned as-is without a remote call.
    pub fn resolve(&self, client: &dyn UserClient) -> Result<UserRef> {
        match self {
            Self::ById(id) => Ok(UserRef::new(id.as_str())),
            Self::ByConnectionAndEmail { .. } => {
                self.resolve_user(client).map(|user| UserRef::new(user.id))
            }
        }
    }

    /// Resolve to the full user record
    pub fn resolve_user(&self, client: &dyn UserClient) -> Result<User> {
        match self {
            Self::ById(id) => client
                .read_user(id)
                .map_err(|e| Error::read(format!("user {id}"), e)),
            Self::ByConnectionAndEmail { connection, email } => {
                let candidates = client
                    .list_users_by_email(email)
                    .map_err(|e| Error::read(format!("users with email {email}"), e))?;
                log::debug!(
                    "Found {} user(s) with email {email}, filtering by connection {connection}",
                    candidates.len()
                );
                candidates
                    .into_iter()
                    .find(|u| u.in_connection(connection))
                    .ok_or_else(|| {
                        Error::Configuration(format!(
                            "no user with email {email} in connection {connection}"
                        ))
                    })
            }
        }
    }
}

impl fmt::Display for UserSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => f.write_str(id),
            Self::ByConnectionAndEmail { connection, email } => {
                write!(f, "{email} ({connection})")
            }
        }
    }
}
