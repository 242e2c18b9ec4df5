//! # directory
//!
//! Blocking client for a remote user directory's management API.
//!
//! This crate covers the remote side of user reconciliation:
//! - Reading and partially updating user records
//! - Listing, assigning and removing role assignments
//! - Looking users up by email
//!
//! Every operation returns a typed [`Error`] whose [`Error::is_not_found`]
//! separates "the entity does not exist" from every other failure.
//!
//! ## Example
//!
//! ```no_run
//! use directory::backend::UserClient;
//! use directory::backend::management::{Credentials, ManagementClient};
//!
//! let client = ManagementClient::new(
//!     "example.eu.auth0.com",
//!     Credentials::Token("eyJhbGciOi...".to_string()),
//! )
//! .expect("valid domain");
//!
//! let user = client.read_user("auth0|5f7c8ec7c33c6c004bbafe82").expect("read");
//! println!("{:?}", user.user_metadata);
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod retry;
pub mod types;

pub use backend::{Call, MockDirectory, Operation, UserClient};
pub use backend::management::{Credentials, ManagementClient};
pub use error::{Error, ErrorCategory, Result};
pub use types::{Identity, Metadata, RetryConfig, Role, User, UserUpdate};
