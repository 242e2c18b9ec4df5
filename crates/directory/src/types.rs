//! Core types for the directory client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// A metadata document: top-level keys mapped to arbitrary JSON values.
pub type Metadata = Map<String, Value>;

/// A user record as returned by the directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier (e.g. `auth0|5f7c8ec7c33c6c004bbafe82`)
    #[serde(rename = "user_id")]
    pub id: String,

    /// Connection the user was created in, when reported directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,

    /// Metadata the user may edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<Metadata>,

    /// Metadata only the application may edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<Metadata>,

    /// Linked identities, each carrying its connection name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<Identity>,
}

impl User {
    /// Create a user with only an identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the connection the user belongs to.
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    /// Whether the user belongs to the named connection, either directly or
    /// through one of its linked identities.
    pub fn in_connection(&self, name: &str) -> bool {
        self.connection.as_deref() == Some(name)
            || self.identities.iter().any(|i| i.connection == name)
    }
}

/// A linked identity of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub connection: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub user_id: Value,
    #[serde(default, rename = "isSocial")]
    pub is_social: bool,
}

/// A role assigned to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    /// Create a role whose name equals its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
        }
    }
}

/// Partial user document submitted on update.
///
/// Only populated scopes are serialized. Within a scope the directory merges
/// top-level keys: non-null values are upserted and, when the directory
/// supports tombstones, null values delete the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<Metadata>,
}

impl UserUpdate {
    /// Whether the update would not touch anything.
    pub fn is_empty(&self) -> bool {
        self.user_metadata.as_ref().is_none_or(Map::is_empty)
            && self.app_metadata.as_ref().is_none_or(Map::is_empty)
    }
}

/// Configuration for retry behavior on transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_deserialize_management_payload() {
        let payload = json!({
            "user_id": "auth0|123",
            "email": "jane@example.com",
            "email_verified": true,
            "user_metadata": {"theme": "dark"},
            "identities": [
                {"connection": "Username-Password-Authentication", "provider": "auth0",
                 "user_id": "123", "isSocial": false}
            ],
            "logins_count": 4
        });

        let user: User = serde_json::from_value(payload).unwrap();
        assert_eq!(user.id, "auth0|123");
        assert_eq!(user.email_verified, Some(true));
        assert_eq!(user.user_metadata.unwrap()["theme"], json!("dark"));
        assert!(user.app_metadata.is_none());
        assert_eq!(user.identities.len(), 1);
    }

    #[test]
    fn test_in_connection_checks_identities() {
        let mut user = User::new("auth0|1");
        assert!(!user.in_connection("db"));

        user.identities.push(Identity {
            connection: "db".to_string(),
            ..Default::default()
        });
        assert!(user.in_connection("db"));
        assert!(!user.in_connection("other"));

        let direct = User::new("auth0|2").with_connection("other");
        assert!(direct.in_connection("other"));
    }

    #[test]
    fn test_user_update_skips_absent_scopes() {
        let mut update = UserUpdate::default();
        assert!(update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({}));

        update.app_metadata = Some(Map::new());
        assert!(update.is_empty());

        let mut doc = Map::new();
        doc.insert("k1".to_string(), Value::Null);
        update.user_metadata = Some(doc);
        assert!(!update.is_empty());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"user_metadata": {"k1": null}, "app_metadata": {}})
        );
    }

    #[test]
    fn test_retry_config_delay_calculation() {
        let config = RetryConfig::new(5, Duration::from_secs(1), 2.0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(10));
    }
}
