//! The [`UserClient`] trait and its implementations.
//!
//! [`management::ManagementClient`] talks to the management API over HTTP.
//! [`MockDirectory`] keeps users, roles and assignments in memory and applies
//! the same merge rules the real directory does, so reconciliation logic can
//! be exercised without network access:
//!
//! ```
//! use directory::backend::{MockDirectory, UserClient};
//! use directory::User;
//!
//! let mock = MockDirectory::new();
//! mock.add_user(User::new("auth0|1"));
//! mock.add_roles(&["rol_admin"]);
//!
//! mock.assign_roles("auth0|1", &["rol_admin".to_string()]).unwrap();
//! let roles = mock.list_role_assignments("auth0|1").unwrap();
//! assert_eq!(roles.len(), 1);
//! ```

pub mod management;

use crate::error::{Error, Result};
use crate::types::{Metadata, Role, User, UserUpdate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Remote user directory operations.
///
/// All calls block until the directory answers. Implementations must report a
/// missing user or role as [`Error::NotFound`] so callers can tell it apart
/// from every other failure.
pub trait UserClient: fmt::Debug + Send + Sync {
    /// Fetch a single user.
    fn read_user(&self, id: &str) -> Result<User>;

    /// Apply a partial update and return the stored user.
    ///
    /// Metadata scopes are merged key by key, never replaced.
    fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User>;

    /// List every role currently assigned to the user.
    fn list_role_assignments(&self, id: &str) -> Result<Vec<Role>>;

    /// Assign roles to the user. Re-assigning an assigned role is a no-op.
    fn assign_roles(&self, id: &str, roles: &[String]) -> Result<()>;

    /// Remove roles from the user.
    fn remove_roles(&self, id: &str, roles: &[String]) -> Result<()>;

    /// Find users by email address across all connections.
    fn list_users_by_email(&self, email: &str) -> Result<Vec<User>>;

    /// Whether submitting a null metadata value deletes the key.
    fn supports_tombstone_via_null(&self) -> bool {
        true
    }
}

impl<T: UserClient + ?Sized> UserClient for Arc<T> {
    fn read_user(&self, id: &str) -> Result<User> {
        (**self).read_user(id)
    }

    fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User> {
        (**self).update_user(id, update)
    }

    fn list_role_assignments(&self, id: &str) -> Result<Vec<Role>> {
        (**self).list_role_assignments(id)
    }

    fn assign_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        (**self).assign_roles(id, roles)
    }

    fn remove_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        (**self).remove_roles(id, roles)
    }

    fn list_users_by_email(&self, email: &str) -> Result<Vec<User>> {
        (**self).list_users_by_email(email)
    }

    fn supports_tombstone_via_null(&self) -> bool {
        (**self).supports_tombstone_via_null()
    }
}

/// Operations exposed by [`UserClient`], used for call accounting and
/// failure injection in [`MockDirectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadUser,
    UpdateUser,
    ListRoleAssignments,
    AssignRoles,
    RemoveRoles,
    ListUsersByEmail,
}

/// A call recorded by [`MockDirectory`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ReadUser(String),
    UpdateUser(String, UserUpdate),
    ListRoleAssignments(String),
    AssignRoles(String, Vec<String>),
    RemoveRoles(String, Vec<String>),
    ListUsersByEmail(String),
}

impl Call {
    /// The operation this call invoked.
    pub fn operation(&self) -> Operation {
        match self {
            Self::ReadUser(_) => Operation::ReadUser,
            Self::UpdateUser(..) => Operation::UpdateUser,
            Self::ListRoleAssignments(_) => Operation::ListRoleAssignments,
            Self::AssignRoles(..) => Operation::AssignRoles,
            Self::RemoveRoles(..) => Operation::RemoveRoles,
            Self::ListUsersByEmail(_) => Operation::ListUsersByEmail,
        }
    }
}

#[derive(Debug)]
struct DirectoryState {
    users: BTreeMap<String, User>,
    roles: BTreeMap<String, Role>,
    assignments: BTreeMap<String, BTreeSet<String>>,
    calls: Vec<Call>,
    failures: HashMap<Operation, Error>,
    tombstones: bool,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            roles: BTreeMap::new(),
            assignments: BTreeMap::new(),
            calls: Vec::new(),
            failures: HashMap::new(),
            tombstones: true,
        }
    }
}

impl DirectoryState {
    /// Record a call and return the injected failure for it, if any.
    fn record(&mut self, call: Call) -> Result<()> {
        let operation = call.operation();
        self.calls.push(call);
        match self.failures.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require_user(&self, id: &str) -> Result<()> {
        if self.users.contains_key(id) {
            Ok(())
        } else {
            Err(Error::not_found("user", id))
        }
    }

    fn require_roles(&self, roles: &[String]) -> Result<()> {
        match roles.iter().find(|r| !self.roles.contains_key(*r)) {
            Some(missing) => Err(Error::not_found("role", missing.as_str())),
            None => Ok(()),
        }
    }
}

/// In-memory directory for tests.
///
/// Cloning shares the underlying state, so a test can keep a handle while the
/// code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MockDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) a user.
    pub fn add_user(&self, user: User) {
        let mut state = self.lock();
        state.assignments.entry(user.id.clone()).or_default();
        state.users.insert(user.id.clone(), user);
    }

    /// Delete a user out-of-band, together with its assignments.
    pub fn remove_user(&self, id: &str) {
        let mut state = self.lock();
        state.users.remove(id);
        state.assignments.remove(id);
    }

    /// Register roles in the tenant's role catalog.
    pub fn add_roles(&self, ids: &[&str]) {
        let mut state = self.lock();
        for id in ids {
            state.roles.insert((*id).to_string(), Role::new(*id));
        }
    }

    /// Delete a role from the catalog out-of-band, unassigning it everywhere.
    pub fn delete_role(&self, id: &str) {
        let mut state = self.lock();
        state.roles.remove(id);
        for assigned in state.assignments.values_mut() {
            assigned.remove(id);
        }
    }

    /// Assign roles without recording a call, simulating a change made
    /// outside the reconciler.
    pub fn assign_out_of_band(&self, user_id: &str, roles: &[&str]) {
        let mut state = self.lock();
        for id in roles {
            state.roles.entry((*id).to_string()).or_insert_with(|| Role::new(*id));
        }
        state
            .assignments
            .entry(user_id.to_string())
            .or_default()
            .extend(roles.iter().map(|r| (*r).to_string()));
    }

    /// Current user record, if present.
    pub fn user(&self, id: &str) -> Option<User> {
        self.lock().users.get(id).cloned()
    }

    /// Role identifiers currently assigned to the user.
    pub fn assigned(&self, user_id: &str) -> BTreeSet<String> {
        self.lock()
            .assignments
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call made through [`UserClient`] so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls made for one operation.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make every subsequent call of `operation` fail with `error`.
    pub fn fail_on(&self, operation: Operation, error: Error) {
        self.lock().failures.insert(operation, error);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Toggle the null-as-delete merge rule.
    pub fn set_tombstone_support(&self, enabled: bool) {
        self.lock().tombstones = enabled;
    }
}

/// Merge `patch` into `stored` one top-level key at a time.
fn merge_metadata(stored: &mut Option<Metadata>, patch: &Metadata, tombstones: bool) {
    let doc = stored.get_or_insert_with(Metadata::new);
    for (key, value) in patch {
        if value.is_null() && tombstones {
            doc.remove(key);
        } else {
            doc.insert(key.clone(), value.clone());
        }
    }
}

impl UserClient for MockDirectory {
    fn read_user(&self, id: &str) -> Result<User> {
        let mut state = self.lock();
        state.record(Call::ReadUser(id.to_string()))?;
        state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("user", id))
    }

    fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User> {
        let mut state = self.lock();
        state.record(Call::UpdateUser(id.to_string(), update.clone()))?;
        let tombstones = state.tombstones;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| Error::not_found("user", id))?;

        if let Some(patch) = &update.user_metadata {
            merge_metadata(&mut user.user_metadata, patch, tombstones);
        }
        if let Some(patch) = &update.app_metadata {
            merge_metadata(&mut user.app_metadata, patch, tombstones);
        }
        Ok(user.clone())
    }

    fn list_role_assignments(&self, id: &str) -> Result<Vec<Role>> {
        let mut state = self.lock();
        state.record(Call::ListRoleAssignments(id.to_string()))?;
        state.require_user(id)?;
        let assigned = state.assignments.get(id).cloned().unwrap_or_default();
        Ok(assigned
            .iter()
            .map(|r| state.roles.get(r).cloned().unwrap_or_else(|| Role::new(r)))
            .collect())
    }

    fn assign_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::AssignRoles(id.to_string(), roles.to_vec()))?;
        state.require_user(id)?;
        state.require_roles(roles)?;
        state
            .assignments
            .entry(id.to_string())
            .or_default()
            .extend(roles.iter().cloned());
        Ok(())
    }

    fn remove_roles(&self, id: &str, roles: &[String]) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::RemoveRoles(id.to_string(), roles.to_vec()))?;
        state.require_user(id)?;
        state.require_roles(roles)?;
        if let Some(assigned) = state.assignments.get_mut(id) {
            for role in roles {
                assigned.remove(role);
            }
        }
        Ok(())
    }

    fn list_users_by_email(&self, email: &str) -> Result<Vec<User>> {
        let mut state = self.lock();
        state.record(Call::ListUsersByEmail(email.to_string()))?;
        Ok(state
            .users
            .values()
            .filter(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned()
            .collect())
    }

    fn supports_tombstone_via_null(&self) -> bool {
        self.lock().tombstones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn directory_with_user() -> MockDirectory {
        let mock = MockDirectory::new();
        mock.add_user(User::new("auth0|1").with_email("jane@example.com"));
        mock.add_roles(&["role_a", "role_b", "role_c"]);
        mock
    }

    #[test]
    fn test_read_missing_user_is_not_found() {
        let mock = MockDirectory::new();
        let err = mock.read_user("auth0|missing").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.calls(), vec![Call::ReadUser("auth0|missing".to_string())]);
    }

    #[test]
    fn test_update_merges_and_tombstones() {
        let mock = directory_with_user();
        mock.update_user(
            "auth0|1",
            &UserUpdate {
                user_metadata: Some(doc(json!({"k1": "old", "k2": "v2"}))),
                app_metadata: None,
            },
        )
        .unwrap();

        let user = mock
            .update_user(
                "auth0|1",
                &UserUpdate {
                    user_metadata: Some(doc(json!({"k1": "v1", "k2": null}))),
                    app_metadata: None,
                },
            )
            .unwrap();

        assert_eq!(user.user_metadata, Some(doc(json!({"k1": "v1"}))));
        assert!(user.app_metadata.is_none());
    }

    #[test]
    fn test_update_without_tombstones_stores_null() {
        let mock = directory_with_user();
        mock.set_tombstone_support(false);
        assert!(!mock.supports_tombstone_via_null());

        let user = mock
            .update_user(
                "auth0|1",
                &UserUpdate {
                    user_metadata: None,
                    app_metadata: Some(doc(json!({"plan": null}))),
                },
            )
            .unwrap();
        assert_eq!(user.app_metadata, Some(doc(json!({"plan": null}))));
    }

    #[test]
    fn test_assign_and_remove_roles() {
        let mock = directory_with_user();
        mock.assign_roles("auth0|1", &["role_a".to_string(), "role_b".to_string()])
            .unwrap();
        mock.assign_roles("auth0|1", &["role_a".to_string()]).unwrap();
        assert_eq!(mock.assigned("auth0|1").len(), 2);

        mock.remove_roles("auth0|1", &["role_b".to_string(), "role_c".to_string()])
            .unwrap();
        let ids: Vec<String> = mock
            .list_role_assignments("auth0|1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["role_a".to_string()]);
    }

    #[test]
    fn test_remove_unknown_role_is_not_found() {
        let mock = directory_with_user();
        mock.assign_out_of_band("auth0|1", &["role_a"]);
        let err = mock
            .remove_roles("auth0|1", &["role_a".to_string(), "role_gone".to_string()])
            .unwrap_err();
        assert!(err.is_not_found());
        // Batch is all-or-nothing
        assert!(mock.assigned("auth0|1").contains("role_a"));
    }

    #[test]
    fn test_failure_injection() {
        let mock = directory_with_user();
        mock.fail_on(Operation::AssignRoles, Error::http("boom", Some(500)));
        assert!(mock.assign_roles("auth0|1", &["role_a".to_string()]).is_err());
        assert_eq!(mock.call_count(Operation::AssignRoles), 1);
        assert!(mock.assigned("auth0|1").is_empty());

        mock.clear_failures();
        mock.assign_roles("auth0|1", &["role_a".to_string()]).unwrap();
        assert_eq!(mock.assigned("auth0|1").len(), 1);
    }

    #[test]
    fn test_list_users_by_email_ignores_case() {
        let mock = directory_with_user();
        mock.add_user(User::new("google-oauth2|9").with_email("other@example.com"));
        let users = mock.list_users_by_email("Jane@Example.com").unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "auth0|1");
    }

    #[test]
    fn test_shared_state_across_clones() {
        let mock = directory_with_user();
        let handle = mock.clone();
        let client: Arc<dyn UserClient> = Arc::new(mock);
        client.assign_roles("auth0|1", &["role_c".to_string()]).unwrap();
        assert!(handle.assigned("auth0|1").contains("role_c"));
        assert_eq!(handle.call_count(Operation::AssignRoles), 1);
    }
}
