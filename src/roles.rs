//! Role assignment reconciliation

use crate::error::{Error, Result};
use crate::identity::UserRef;
use crate::projection::{RoleSet, role_ids};
use declarative::SetDiff;
use directory::UserClient;

/// Keeps the roles assigned to a user equal to a desired set
pub struct RoleReconciler<'a> {
    client: &'a dyn UserClient,
}

impl<'a> RoleReconciler<'a> {
    pub fn new(client: &'a dyn UserClient) -> Self {
        Self { client }
    }

    /// Roles currently assigned to the user
    ///
    /// A missing user is reported as [`Error::RemoteNotFound`].
    pub fn observe(&self, user: &UserRef) -> Result<RoleSet> {
        let roles = self
            .client
            .list_role_assignments(user.as_str())
            .map_err(|e| Error::read(format!("roles of user {user}"), e))?;
        log::debug!("User {user} holds {} role(s)", roles.len());
        Ok(role_ids(&roles))
    }

    /// Converge the user's roles to `desired` and return the observed set
    ///
    /// Missing roles are assigned in one batch, extra roles removed in
    /// another. An already matching user gets no write and the set read
    /// before the diff is returned as is. Otherwise roles are read again
    /// after the writes.
    pub fn reconcile(&self, user: &UserRef, desired: &RoleSet) -> Result<RoleSet> {
        let observed = self.observe(user)?;
        let diff = SetDiff::compute(desired, &observed);
        if diff.is_empty() {
            log::debug!("Roles of user {user} already match");
            return Ok(observed);
        }

        if !diff.to_add.is_empty() {
            let batch: Vec<String> = diff.to_add.iter().cloned().collect();
            self.client
                .assign_roles(user.as_str(), &batch)
                .map_err(|e| Error::write(format!("assign roles to user {user}"), e))?;
            log::info!("Assigned {} role(s) to user {user}", batch.len());
        }
        self.unassign(user, &diff.to_remove)?;

        self.observe(user)
    }

    /// Remove exactly `roles` from the user
    ///
    /// An empty set issues no call. A not-found answer means the roles are
    /// already gone and counts as success.
    pub fn unassign(&self, user: &UserRef, roles: &RoleSet) -> Result<()> {
        if roles.is_empty() {
            return Ok(());
        }

        let batch: Vec<String> = roles.iter().cloned().collect();
        match self.client.remove_roles(user.as_str(), &batch) {
            Ok(()) => {
                log::info!("Removed {} role(s) from user {user}", batch.len());
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                log::warn!("Roles of user {user} already removed: {e}");
                Ok(())
            }
            Err(e) => Err(Error::write(format!("remove roles from user {user}"), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory::{Call, MockDirectory, Operation, User};

    fn set(items: &[&str]) -> RoleSet {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn directory() -> MockDirectory {
        let mock = MockDirectory::new();
        mock.add_user(User::new("auth0|1"));
        mock.add_roles(&["role_a", "role_b", "role_c"]);
        mock
    }

    #[test]
    fn test_reconcile_assigns_and_removes_delta() {
        let mock = directory();
        mock.assign_out_of_band("auth0|1", &["role_b", "role_c"]);
        let user = UserRef::new("auth0|1");

        let observed = RoleReconciler::new(&mock)
            .reconcile(&user, &set(&["role_a", "role_b"]))
            .unwrap();

        assert_eq!(observed, set(&["role_a", "role_b"]));
        assert_eq!(mock.assigned("auth0|1"), set(&["role_a", "role_b"]));
        let writes: Vec<Call> = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c.operation(), Operation::AssignRoles | Operation::RemoveRoles))
            .collect();
        assert_eq!(
            writes,
            vec![
                Call::AssignRoles("auth0|1".into(), vec!["role_a".into()]),
                Call::RemoveRoles("auth0|1".into(), vec!["role_c".into()]),
            ]
        );
    }

    #[test]
    fn test_reconcile_reaches_any_desired_set() {
        let cases: [(&[&str], &[&str]); 5] = [
            (&[], &[]),
            (&["role_a"], &[]),
            (&[], &["role_a", "role_b"]),
            (&["role_a", "role_b", "role_c"], &["role_c"]),
            (&["role_b"], &["role_a", "role_c"]),
        ];
        for (desired, observed) in cases {
            let mock = directory();
            mock.assign_out_of_band("auth0|1", observed);
            let result = RoleReconciler::new(&mock)
                .reconcile(&UserRef::new("auth0|1"), &set(desired))
                .unwrap();
            assert_eq!(result, set(desired));
            assert_eq!(mock.assigned("auth0|1"), set(desired));
        }
    }

    #[test]
    fn test_reconcile_matching_issues_no_write() {
        let mock = directory();
        mock.assign_out_of_band("auth0|1", &["role_a"]);
        let observed = RoleReconciler::new(&mock)
            .reconcile(&UserRef::new("auth0|1"), &set(&["role_a"]))
            .unwrap();
        assert_eq!(observed, set(&["role_a"]));
        assert_eq!(mock.calls(), vec![Call::ListRoleAssignments("auth0|1".into())]);
    }

    #[test]
    fn test_reconcile_returns_roles_read_after_writes() {
        let mock = directory();
        mock.assign_out_of_band("auth0|1", &["role_b"]);
        let observed = RoleReconciler::new(&mock)
            .reconcile(&UserRef::new("auth0|1"), &set(&["role_a"]))
            .unwrap();

        assert_eq!(observed, mock.assigned("auth0|1"));
        let reads: Vec<Call> = mock
            .calls()
            .into_iter()
            .filter(|c| c.operation() == Operation::ListRoleAssignments)
            .collect();
        assert_eq!(reads.len(), 2);
        assert_eq!(
            mock.calls().last(),
            Some(&Call::ListRoleAssignments("auth0|1".into()))
        );
    }

    #[test]
    fn test_assign_failure_is_fatal() {
        let mock = directory();
        mock.fail_on(
            Operation::AssignRoles,
            directory::Error::http("internal error", Some(500)),
        );
        let err = RoleReconciler::new(&mock)
            .reconcile(&UserRef::new("auth0|1"), &set(&["role_a"]))
            .unwrap_err();
        assert!(matches!(err, Error::RemoteWrite { .. }));
    }

    #[test]
    fn test_observe_missing_user_is_surfaced() {
        let mock = MockDirectory::new();
        let err = RoleReconciler::new(&mock)
            .observe(&UserRef::new("auth0|gone"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unassign_empty_issues_no_call() {
        let mock = directory();
        RoleReconciler::new(&mock)
            .unassign(&UserRef::new("auth0|1"), &RoleSet::new())
            .unwrap();
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_unassign_already_removed_is_success() {
        let mock = directory();
        mock.assign_out_of_band("auth0|1", &["role_a"]);
        mock.delete_role("role_a");

        RoleReconciler::new(&mock)
            .unassign(&UserRef::new("auth0|1"), &set(&["role_a"]))
            .unwrap();
        assert_eq!(mock.call_count(Operation::RemoveRoles), 1);

        // Same for a user deleted out-of-band
        mock.remove_user("auth0|1");
        RoleReconciler::new(&mock)
            .unassign(&UserRef::new("auth0|1"), &set(&["role_b"]))
            .unwrap();
    }

    #[test]
    fn test_unassign_other_failure_is_fatal() {
        let mock = directory();
        mock.fail_on(Operation::RemoveRoles, directory::Error::RateLimited);
        let err = RoleReconciler::new(&mock)
            .unassign(&UserRef::new("auth0|1"), &set(&["role_a"]))
            .unwrap_err();
        assert!(matches!(err, Error::RemoteWrite { .. }));
    }
}
