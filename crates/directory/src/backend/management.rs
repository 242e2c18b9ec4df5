//! Management API backend.
//!
//! [`ManagementClient`] implements [`UserClient`] over the tenant's
//! management API (`/api/v2`). Requests are authenticated with a bearer token
//! that is either supplied directly or obtained through the client-credentials
//! grant and cached until shortly before it expires.
//!
//! Every call is wrapped in [`with_retry`], so rate limiting and transient
//! network failures are absorbed here and never reach the caller as anything
//! but a final error.

use crate::backend::UserClient;
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::{RetryConfig, Role, User, UserUpdate};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use url::Url;

/// Roles are fetched in pages of this size.
const ROLES_PER_PAGE: usize = 50;

/// Cached tokens are refreshed this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("usersync/", env!("CARGO_PKG_VERSION"));

/// How the client authenticates against the management API.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A pre-issued management API token.
    Token(String),
    /// Machine-to-machine application credentials.
    ClientCredentials {
        client_id: String,
        client_secret: String,
        /// Defaults to `https://{domain}/api/v2/`.
        audience: Option<String>,
    },
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Blocking management API client.
pub struct ManagementClient {
    agent: ureq::Agent,
    base_url: Url,
    credentials: Credentials,
    retry: RetryConfig,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementClient")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ManagementClient {
    /// Create a client for a tenant domain (`example.eu.auth0.com`) or a full
    /// base URL (`https://example.eu.auth0.com`).
    pub fn new(domain: &str, credentials: Credentials) -> Result<Self> {
        let base = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        let base_url = Url::parse(&base)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidRequest(format!("not a base URL: {base}")));
        }

        Ok(Self {
            agent: build_agent(None),
            base_url,
            credentials,
            retry: RetryConfig::default(),
            token: Mutex::new(None),
        })
    }

    /// Set a global timeout for each request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(Some(timeout));
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build an endpoint URL from path segments; each segment is
    /// percent-encoded, so identifiers containing `/` stay one segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidRequest(format!("not a base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn default_audience(&self) -> Result<String> {
        Ok(self.endpoint(&["api", "v2", ""])?.to_string())
    }

    /// Return a bearer token, exchanging client credentials when the cached
    /// one is missing or about to expire.
    fn bearer(&self) -> Result<String> {
        let (client_id, client_secret, audience) = match &self.credentials {
            Credentials::Token(token) => return Ok(format!("Bearer {token}")),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
                audience,
            } => (client_id, client_secret, audience),
        };

        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(format!("Bearer {}", token.value));
        }

        let audience = match audience {
            Some(a) => a.clone(),
            None => self.default_audience()?,
        };
        let url = self.endpoint(&["oauth", "token"])?;
        log::debug!("Requesting management API token from {url}");

        let response: TokenResponse = self
            .agent
            .post(url.as_str())
            .header("User-Agent", USER_AGENT)
            .send_json(&TokenRequest {
                grant_type: "client_credentials",
                client_id,
                client_secret,
                audience: &audience,
            })
            .map_err(|e| match e {
                ureq::Error::StatusCode(code @ (400..=403)) => {
                    Error::Auth(format!("token request rejected with HTTP {code}"))
                }
                other => other.into(),
            })?
            .body_mut()
            .read_json()?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let header = format!("Bearer {}", response.access_token);
        *cached = Some(CachedToken {
            value: response.access_token,
            expires_at: Instant::now() + lifetime,
        });
        Ok(header)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url, kind: &str, id: &str) -> Result<T> {
        let what = format!("GET {}", url.path());
        with_retry(&self.retry, &what, || {
            log::debug!("{what}");
            let auth = self.bearer()?;
            let value = self
                .agent
                .get(url.as_str())
                .header("Authorization", &auth)
                .header("User-Agent", USER_AGENT)
                .call()
                .map_err(|e| Error::from_transport(e, kind, id))?
                .body_mut()
                .read_json()?;
            Ok(value)
        })
    }

    fn roles_page(&self, id: &str, page: usize) -> Result<RolePage> {
        let mut url = self.endpoint(&["api", "v2", "users", id, "roles"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &ROLES_PER_PAGE.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("include_totals", "true");
        self.get_json(&url, "user", id)
    }

    fn send_roles(&self, method: RolesMethod, id: &str, roles: &[String]) -> Result<()> {
        let url = self.endpoint(&["api", "v2", "users", id, "roles"])?;
        let body = RolesRequest { roles };
        let what = format!("{} {}", method.as_str(), url.path());

        with_retry(&self.retry, &what, || {
            log::debug!("{what} ({} roles)", roles.len());
            let auth = self.bearer()?;
            let result = match method {
                RolesMethod::Assign => self
                    .agent
                    .post(url.as_str())
                    .header("Authorization", &auth)
                    .header("User-Agent", USER_AGENT)
                    .send_json(&body),
                RolesMethod::Remove => self
                    .agent
                    .delete(url.as_str())
                    .header("Authorization", &auth)
                    .header("User-Agent", USER_AGENT)
                    .force_send_body()
                    .send_json(&body),
            };
            result.map_err(|e| Error::from_transport(e, "user or role", id))?;
            Ok(())
        })
    }
}

fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(timeout)
        .build();
    ureq::Agent::new_with_config(config)
}

/// Whether role paging should stop after a page of `fetched` roles
///
/// `so_far` counts every role collected including this page. Without a
/// reported total, a short page is the last one.
fn exhausted(fetched: usize, so_far: usize, total: Option<usize>) -> bool {
    if fetched == 0 {
        return true;
    }
    match total {
        Some(total) => so_far >= total,
        None => fetched < ROLES_PER_PAGE,
    }
}

#[derive(Debug, Clone, Copy)]
enum RolesMethod {
    Assign,
    Remove,
}

impl RolesMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "POST",
            Self::Remove => "DELETE",
        }
    }
}

impl UserClient for ManagementClient {
    fn read_user(&self, id: &str) -> Result<User> {
        let url = self.endpoint(&["api", "v2", "users", id])?;
        self.get_json(&url, "user", id)
    }

    fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User> {
        let url = self.endpoint(&["api", "v2", "users", id])?;
        let what = format!("PATCH {}", url.path());

        with_retry(&self.retry, &what, || {
            log::debug!("{what}");
            let auth = self.bearer()?;
            let user = self
                .agent
                .patch(url.as_str())
                .header("Authorization", &auth)
                .header("User-Agent", USER_AGENT)
                .send_json(update)
                .map_err(|e| Error::from_transport(e, "user", id))?
                .body_mut()
                .read_json()?;
            Ok(user)
        })
    }

    fn list_role_assignments(&self, id: &str) -> Result<Vec<Role>> {
        let mut roles = Vec::new();
        let mut page = 0;
        loop {
            let batch = self.roles_page(id, page)?;
            let fetched = batch.roles.len();
            roles.extend(batch.roles);

            if exhausted(fetched, roles.len(), batch.total) {
                break;
            }
            page += 1;
        }
        Ok(roles)
    }

    fn assign_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        self.send_roles(RolesMethod::Assign, id, roles)
    }

    fn remove_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        self.send_roles(RolesMethod::Remove, id, roles)
    }

    fn list_users_by_email(&self, email: &str) -> Result<Vec<User>> {
        let mut url = self.endpoint(&["api", "v2", "users-by-email"])?;
        url.query_pairs_mut().append_pair("email", email);
        self.get_json(&url, "email", email)
    }
}

// =============================================================================
// Management API payloads
// =============================================================================

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    86_400
}

#[derive(Debug, Serialize)]
struct RolesRequest<'a> {
    roles: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RolePage {
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    total: Option<usize>,
}
