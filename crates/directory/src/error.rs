//! Error types for directory operations.
//!
//! Every remote call returns a typed [`Error`]. The distinction between
//! "not found" and every other failure is surfaced through
//! [`Error::is_not_found`] because callers build idempotent deletes and
//! absent-reads on top of it.

use std::fmt;

/// Result type alias for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of directory errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The user, role or assignment does not exist (HTTP 404).
    NotFound,
    /// Network-related errors (transient, retryable).
    Network,
    /// The management API throttled the request (HTTP 429).
    RateLimited,
    /// Credentials were rejected or lack the required scopes.
    Auth,
    /// Response could not be decoded.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Entity not found",
            Self::Network => "Network connectivity issue",
            Self::RateLimited => "Rate limited by the management API",
            Self::Auth => "Authentication failed",
            Self::Format => "Invalid response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the user and role identifiers exist in the tenant",
            Self::Network => "Check your internet connection and the tenant domain",
            Self::RateLimited => "Wait a moment and try again",
            Self::Auth => "Check the client credentials and their granted scopes",
            Self::Format => "The API returned an unexpected payload, check the API version",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the directory.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The requested entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity ("user", "role", ...).
        kind: String,
        /// Identifier that was looked up.
        id: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Too many requests.
    #[error("rate limited by management API")]
    RateLimited,

    /// Credentials rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The request could not be built (bad URL, bad identifier).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Translate a transport error, attributing a 404 to the given entity.
    pub fn from_transport(err: ureq::Error, kind: &str, id: &str) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::not_found(kind, id),
            other => other.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Http { status, .. } => match status {
                Some(code) if *code >= 500 => ErrorCategory::Network,
                Some(_) => ErrorCategory::Other,
                None => ErrorCategory::Network,
            },
            Error::RateLimited => ErrorCategory::RateLimited,
            Error::Auth(_) => ErrorCategory::Auth,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::InvalidRequest(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the remote reported that the target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::not_found("resource", ""),
            ureq::Error::StatusCode(429) => Self::RateLimited,
            ureq::Error::StatusCode(code @ (401 | 403)) => {
                Self::Auth(format!("HTTP {code}"))
            }
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
