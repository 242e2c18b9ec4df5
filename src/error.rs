//! Error types for reconciliation
//!
//! Remote failures are split by whether the directory reported the target as
//! missing. Callers recover from [`Error::RemoteNotFound`] where it means
//! "already done" (unassigning roles) or "gone" (reading metadata); every
//! other variant is fatal for the pass.

use crate::metadata::MetadataScope;
use thiserror::Error;

/// Errors that can occur during reconciliation
#[derive(Error, Debug)]
pub enum Error {
    /// A read failed for a reason other than not-found
    #[error("failed to read {what}: {source}")]
    RemoteRead {
        what: String,
        #[source]
        source: directory::Error,
    },

    /// The target entity does not exist
    #[error("{what}: {source}")]
    RemoteNotFound {
        what: String,
        #[source]
        source: directory::Error,
    },

    /// An assign, remove or update failed for a reason other than not-found
    #[error("failed to {what}: {source}")]
    RemoteWrite {
        what: String,
        #[source]
        source: directory::Error,
    },

    /// Declared identity inputs are ambiguous or insufficient, or a lookup
    /// matched nothing
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Metadata text is not a JSON object
    #[error("invalid {scope}: {source}")]
    InvalidMetadata {
        scope: MetadataScope,
        #[source]
        source: serde_json::Error,
    },

    /// Metadata keys cannot be deleted through this directory
    #[error("the remote directory does not remove metadata keys submitted as null")]
    TombstoneUnsupported,
}

impl Error {
    /// Classify a failed read
    pub fn read(what: impl Into<String>, source: directory::Error) -> Self {
        let what = what.into();
        if source.is_not_found() {
            Self::RemoteNotFound { what, source }
        } else {
            Self::RemoteRead { what, source }
        }
    }

    /// Classify a failed write
    pub fn write(what: impl Into<String>, source: directory::Error) -> Self {
        let what = what.into();
        if source.is_not_found() {
            Self::RemoteNotFound { what, source }
        } else {
            Self::RemoteWrite { what, source }
        }
    }

    /// Whether the directory reported the target as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RemoteNotFound { .. })
    }
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_classification() {
        let err = Error::read("user auth0|1", directory::Error::not_found("user", "auth0|1"));
        assert!(err.is_not_found());

        let err = Error::read("user auth0|1", directory::Error::http("reset", None));
        assert!(matches!(err, Error::RemoteRead { .. }));
        assert!(err.to_string().starts_with("failed to read user auth0|1"));
    }

    #[test]
    fn test_write_classification() {
        let err = Error::write("assign roles", directory::Error::RateLimited);
        assert!(matches!(err, Error::RemoteWrite { .. }));
        assert!(!err.is_not_found());

        let err = Error::write("assign roles", directory::Error::not_found("role", "rol_x"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "assign roles: role not found: rol_x");
    }
}
