//! Observed-state projection
//!
//! Pure translation of directory records into the fields resources expose:
//! role identifiers as a flat set, metadata documents as JSON text. Nothing
//! here talks to the directory.

use crate::error::{Error, Result};
use crate::metadata::MetadataScope;
use directory::{Metadata, Role, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A set of role identifiers
pub type RoleSet = BTreeSet<String>;

/// Project role assignments to their identifiers
pub fn role_ids(roles: &[Role]) -> RoleSet {
    roles.iter().map(|r| r.id.clone()).collect()
}

/// Both metadata documents of a user, verbatim; a missing one is empty
pub fn metadata_of(user: &User) -> (Metadata, Metadata) {
    (
        user.user_metadata.clone().unwrap_or_default(),
        user.app_metadata.clone().unwrap_or_default(),
    )
}

/// Serialize a document to JSON text, or `""` when it has no keys
///
/// Keys are emitted in sorted order so equal documents produce equal text.
pub fn flatten_document(doc: &Metadata) -> String {
    if doc.is_empty() {
        return String::new();
    }
    Value::Object(doc.clone()).to_string()
}

/// Parse JSON text into a document; absent or blank text is empty
pub fn parse_document(text: Option<&str>, scope: MetadataScope) -> Result<Metadata> {
    match text.map(str::trim) {
        None | Some("") => Ok(Metadata::new()),
        Some(text) => {
            serde_json::from_str(text).map_err(|source| Error::InvalidMetadata { scope, source })
        }
    }
}

/// Semantic equality of two JSON texts, ignoring formatting and key order
///
/// Blank text counts as an empty object. Unparseable text only equals
/// itself.
pub fn documents_equivalent(a: &str, b: &str) -> bool {
    fn parse(text: &str) -> Option<Value> {
        let text = text.trim();
        if text.is_empty() {
            return Some(Value::Object(Metadata::new()));
        }
        serde_json::from_str(text).ok()
    }

    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Whether an observed document already reflects a desired merge write
///
/// Every non-null desired key must hold the same value, every null desired
/// key must be absent. Keys the declaration does not mention are ignored.
pub fn satisfies(desired: &Metadata, observed: &Metadata) -> bool {
    desired.iter().all(|(key, value)| match value {
        Value::Null => !observed.contains_key(key),
        value => observed.get(key) == Some(value),
    })
}

/// Full user profile exposed by the user lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub verify_email: bool,
    pub phone_number: Option<String>,
    pub phone_verified: bool,
    pub blocked: bool,
    pub picture: Option<String>,
    /// JSON text, `""` when empty
    pub user_metadata: String,
    /// JSON text, `""` when empty
    pub app_metadata: String,
    pub roles: RoleSet,
}

impl UserProfile {
    /// Project a user record and its role assignments
    pub fn project(user: &User, roles: &[Role]) -> Self {
        let (user_metadata, app_metadata) = metadata_of(user);
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            family_name: user.family_name.clone(),
            given_name: user.given_name.clone(),
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified.unwrap_or_default(),
            verify_email: user.verify_email.unwrap_or_default(),
            phone_number: user.phone_number.clone(),
            phone_verified: user.phone_verified.unwrap_or_default(),
            blocked: user.blocked.unwrap_or_default(),
            picture: user.picture.clone(),
            user_metadata: flatten_document(&user_metadata),
            app_metadata: flatten_document(&app_metadata),
            roles: role_ids(roles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_role_ids_dedupes() {
        let roles = vec![Role::new("rol_b"), Role::new("rol_a"), Role::new("rol_b")];
        let ids: Vec<_> = role_ids(&roles).into_iter().collect();
        assert_eq!(ids, vec!["rol_a".to_string(), "rol_b".to_string()]);
    }

    #[test]
    fn test_flatten_document() {
        assert_eq!(flatten_document(&Metadata::new()), "");
        assert_eq!(
            flatten_document(&doc(json!({"b": 1, "a": {"x": null}}))),
            r#"{"a":{"x":null},"b":1}"#
        );
    }

    #[test]
    fn test_parse_document() {
        assert!(parse_document(None, MetadataScope::User).unwrap().is_empty());
        assert!(parse_document(Some("  "), MetadataScope::User).unwrap().is_empty());
        assert_eq!(
            parse_document(Some(r#"{"k1": "v1", "k2": null}"#), MetadataScope::User).unwrap(),
            doc(json!({"k1": "v1", "k2": null}))
        );

        let err = parse_document(Some("[1, 2]"), MetadataScope::Application).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidMetadata {
                scope: MetadataScope::Application,
                ..
            }
        ));
        assert!(parse_document(Some("{"), MetadataScope::User).is_err());
    }

    #[test]
    fn test_documents_equivalent() {
        assert!(documents_equivalent(r#"{"a": 1, "b": 2}"#, r#"{"b":2,"a":1}"#));
        assert!(documents_equivalent("", "{}"));
        assert!(!documents_equivalent(r#"{"a": 1}"#, r#"{"a": "1"}"#));
        assert!(documents_equivalent("{not json", "{not json"));
        assert!(!documents_equivalent("{not json", "{}"));
    }

    #[test]
    fn test_satisfies_merge_semantics() {
        let observed = doc(json!({"k1": "v1", "k2": "v2"}));
        assert!(satisfies(&doc(json!({"k1": "v1"})), &observed));
        assert!(satisfies(&doc(json!({"k3": null})), &observed));
        assert!(satisfies(&Metadata::new(), &observed));
        assert!(!satisfies(&doc(json!({"k1": "old"})), &observed));
        assert!(!satisfies(&doc(json!({"k2": null})), &observed));
    }

    #[test]
    fn test_profile_projection() {
        let mut user = User::new("auth0|1").with_email("jane@example.com");
        user.email_verified = Some(true);
        user.app_metadata = Some(doc(json!({"plan": "pro"})));

        let profile = UserProfile::project(&user, &[Role::new("rol_admin")]);
        assert_eq!(profile.user_id, "auth0|1");
        assert!(profile.email_verified);
        assert!(!profile.blocked);
        assert_eq!(profile.user_metadata, "");
        assert_eq!(profile.app_metadata, r#"{"plan":"pro"}"#);
        assert!(profile.roles.contains("rol_admin"));
    }
}
