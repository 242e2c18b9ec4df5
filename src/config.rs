//! Provider configuration
//!
//! Read from `config.toml` (see [`crate::paths::config_path`]), then
//! overridden by `AUTH0_*` environment variables:
//!
//! ```toml
//! domain = "example.eu.auth0.com"
//! client_id = "..."
//! client_secret = "..."
//! timeout_secs = 30
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//! ```

use crate::error::{Error, Result};
use crate::paths;
use anyhow::Context;
use directory::{Credentials, ManagementClient, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ENV_DOMAIN: &str = "AUTH0_DOMAIN";
pub const ENV_CLIENT_ID: &str = "AUTH0_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AUTH0_CLIENT_SECRET";
pub const ENV_API_TOKEN: &str = "AUTH0_API_TOKEN";
pub const ENV_AUDIENCE: &str = "AUTH0_AUDIENCE";

/// Connection settings for the management API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Tenant domain, e.g. `example.eu.auth0.com`
    pub domain: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Pre-issued management API token; wins over client credentials
    pub api_token: Option<String>,
    /// Token audience, defaults to the tenant's management API
    pub audience: Option<String>,
    /// Per-request timeout
    pub timeout_secs: Option<u64>,
    pub retry: RetrySettings,
}

/// Retry policy for transient remote failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            ..Self::default()
        }
    }
}

impl ProviderConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Invalid provider config format")
    }

    /// Load a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Load the config file if present, apply environment overrides and
    /// validate
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_path()?;
        let config = if path.exists() {
            log::debug!("Loading provider config from {}", path.display());
            Self::from_file(&path)?
        } else {
            log::debug!("No provider config at {}, using environment", path.display());
            Self::default()
        };

        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace fields with non-empty values returned by `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            (ENV_DOMAIN, &mut self.domain),
            (ENV_CLIENT_ID, &mut self.client_id),
            (ENV_CLIENT_SECRET, &mut self.client_secret),
            (ENV_API_TOKEN, &mut self.api_token),
            (ENV_AUDIENCE, &mut self.audience),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                log::debug!("Using {key} from environment");
                *field = Some(value);
            }
        }
        self
    }

    /// Check that a domain and a complete set of credentials are present
    pub fn validate(&self) -> Result<()> {
        self.domain()?;
        self.credentials().map(|_| ())
    }

    fn domain(&self) -> Result<&str> {
        non_blank(self.domain.as_deref()).ok_or_else(|| {
            Error::Configuration(format!("a tenant domain is required (set {ENV_DOMAIN})"))
        })
    }

    /// Credentials to authenticate with
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = non_blank(self.api_token.as_deref()) {
            return Ok(Credentials::Token(token.to_string()));
        }

        match (
            non_blank(self.client_id.as_deref()),
            non_blank(self.client_secret.as_deref()),
        ) {
            (Some(client_id), Some(client_secret)) => Ok(Credentials::ClientCredentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                audience: non_blank(self.audience.as_deref()).map(str::to_string),
            }),
            (Some(_), None) | (None, Some(_)) => Err(Error::Configuration(format!(
                "{ENV_CLIENT_ID} and {ENV_CLIENT_SECRET} must be set together"
            ))),
            (None, None) => Err(Error::Configuration(format!(
                "either {ENV_API_TOKEN} or {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET} are required"
            ))),
        }
    }

    /// Build a management API client from this config
    pub fn build_client(&self) -> Result<ManagementClient> {
        let domain = self.domain()?;
        let client = ManagementClient::new(domain, self.credentials()?)
            .map_err(|e| Error::Configuration(format!("invalid domain {domain}: {e}")))?
            .with_retry(RetryConfig::from(&self.retry));

        Ok(match self.timeout_secs {
            Some(secs) => client.with_timeout(Duration::from_secs(secs)),
            None => client,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
