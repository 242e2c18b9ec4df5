//! `user_roles` resource - the complete set of roles assigned to a user

use crate::identity::{UserRef, UserSpecifier};
use crate::projection::RoleSet;
use crate::roles::RoleReconciler;
use anyhow::Result;
use declarative::Resource;
use directory::UserClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declared roles of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRolesConfig {
    pub user: UserSpecifier,
    #[serde(default)]
    pub roles: RoleSet,
}

/// Observed roles, persisted between passes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRolesState {
    pub user_id: String,
    pub roles: RoleSet,
}

/// Role assignments of a user
///
/// The declared set is authoritative: roles assigned outside the
/// declaration are removed on the next pass.
#[derive(Debug, Clone)]
pub struct UserRoles {
    client: Arc<dyn UserClient>,
}

impl UserRoles {
    pub fn new(client: Arc<dyn UserClient>) -> Self {
        Self { client }
    }

    fn reconciler(&self) -> RoleReconciler<'_> {
        RoleReconciler::new(self.client.as_ref())
    }

    fn converge(&self, user: &UserRef, config: &UserRolesConfig) -> Result<UserRolesState> {
        let roles = self.reconciler().reconcile(user, &config.roles)?;
        Ok(UserRolesState {
            user_id: user.to_string(),
            roles,
        })
    }
}

impl Resource for UserRoles {
    type Config = UserRolesConfig;
    type State = UserRolesState;

    fn resource_type(&self) -> &'static str {
        "user_roles"
    }

    fn desired_identity(&self, config: &UserRolesConfig) -> Result<String> {
        Ok(config.user.resolve(self.client.as_ref())?.into_inner())
    }

    fn create(&self, config: &UserRolesConfig) -> Result<(String, UserRolesState)> {
        let user = config.user.resolve(self.client.as_ref())?;
        let state = self.converge(&user, config)?;
        Ok((user.into_inner(), state))
    }

    fn read(&self, id: &str) -> Result<Option<UserRolesState>> {
        let roles = self.reconciler().observe(&UserRef::new(id))?;
        Ok(Some(UserRolesState {
            user_id: id.to_string(),
            roles,
        }))
    }

    fn update(
        &self,
        id: &str,
        config: &UserRolesConfig,
        _prior: &UserRolesState,
    ) -> Result<UserRolesState> {
        self.converge(&UserRef::new(id), config)
    }

    fn delete(&self, id: &str, prior: &UserRolesState) -> Result<()> {
        self.reconciler().unassign(&UserRef::new(id), &prior.roles)?;
        Ok(())
    }

    fn needs_update(&self, config: &UserRolesConfig, state: &UserRolesState) -> bool {
        config.roles != state.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ApplyResult, Change, Host, MemoryStateStore, StateStore};
    use directory::{MockDirectory, Operation, User};

    const ADDRESS: &str = "user_roles.jane";

    fn set(items: &[&str]) -> RoleSet {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn setup() -> (MockDirectory, UserRoles) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mock = MockDirectory::new();
        mock.add_user(User::new("auth0|1").with_email("jane@example.com").with_connection("db"));
        mock.add_user(User::new("auth0|2"));
        mock.add_roles(&["role_a", "role_b", "role_c"]);
        let resource = UserRoles::new(Arc::new(mock.clone()));
        (mock, resource)
    }

    fn config(user: &str, roles: &[&str]) -> UserRolesConfig {
        UserRolesConfig {
            user: UserSpecifier::ById(user.into()),
            roles: set(roles),
        }
    }

    fn stored(host: &Host<MemoryStateStore>) -> UserRolesState {
        let record = host.store().load(ADDRESS).unwrap().unwrap();
        serde_json::from_value(record.state).unwrap()
    }

    #[test]
    fn test_create_converges_to_declared_roles() {
        let (mock, resource) = setup();
        mock.assign_out_of_band("auth0|1", &["role_b", "role_c"]);
        let mut host = Host::new(MemoryStateStore::new());

        let result = host
            .apply(&resource, ADDRESS, Some(&config("auth0|1", &["role_a", "role_b"])))
            .unwrap();

        assert_eq!(result, ApplyResult::Created { id: "auth0|1".into() });
        assert_eq!(mock.assigned("auth0|1"), set(&["role_a", "role_b"]));
        assert_eq!(stored(&host).roles, set(&["role_a", "role_b"]));
    }

    #[test]
    fn test_out_of_band_drift_is_corrected() {
        let (mock, resource) = setup();
        let mut host = Host::new(MemoryStateStore::new());
        let declared = config("auth0|1", &["role_a"]);
        host.apply(&resource, ADDRESS, Some(&declared)).unwrap();

        mock.assign_out_of_band("auth0|1", &["role_c"]);
        assert_eq!(host.plan(&resource, ADDRESS, Some(&declared)).unwrap(), Change::Update);

        let result = host.apply(&resource, ADDRESS, Some(&declared)).unwrap();
        assert_eq!(result, ApplyResult::Updated { id: "auth0|1".into() });
        assert_eq!(mock.assigned("auth0|1"), set(&["role_a"]));

        let result = host.apply(&resource, ADDRESS, Some(&declared)).unwrap();
        assert_eq!(result, ApplyResult::NoChange);
    }

    #[test]
    fn test_delete_unassigns_every_role() {
        let (mock, resource) = setup();
        let mut host = Host::new(MemoryStateStore::new());
        host.apply(&resource, ADDRESS, Some(&config("auth0|1", &["role_a", "role_b"])))
            .unwrap();

        let result = host.apply(&resource, ADDRESS, None).unwrap();
        assert_eq!(result, ApplyResult::Deleted { id: "auth0|1".into() });
        assert!(mock.assigned("auth0|1").is_empty());
        assert!(host.store().load(ADDRESS).unwrap().is_none());
    }

    #[test]
    fn test_delete_tolerates_roles_removed_out_of_band() {
        let (mock, resource) = setup();
        mock.assign_out_of_band("auth0|1", &["role_a"]);
        mock.delete_role("role_a");

        let prior = UserRolesState {
            user_id: "auth0|1".into(),
            roles: set(&["role_a"]),
        };
        resource.delete("auth0|1", &prior).unwrap();
        assert_eq!(mock.call_count(Operation::RemoveRoles), 1);
    }

    #[test]
    fn test_delete_with_no_roles_issues_no_call() {
        let (mock, resource) = setup();
        let prior = UserRolesState {
            user_id: "auth0|1".into(),
            roles: RoleSet::new(),
        };
        resource.delete("auth0|1", &prior).unwrap();
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_read_missing_user_is_an_error() {
        let (mock, resource) = setup();
        let mut host = Host::new(MemoryStateStore::new());
        host.apply(&resource, ADDRESS, Some(&config("auth0|1", &["role_a"])))
            .unwrap();

        mock.remove_user("auth0|1");
        let err = host
            .apply(&resource, ADDRESS, Some(&config("auth0|1", &["role_a"])))
            .unwrap_err();
        assert!(format!("{err:#}").contains("user not found"));
    }

    #[test]
    fn test_user_resolved_by_email() {
        let (mock, resource) = setup();
        let mut host = Host::new(MemoryStateStore::new());
        let declared = UserRolesConfig {
            user: UserSpecifier::ByConnectionAndEmail {
                connection: "db".into(),
                email: "jane@example.com".into(),
            },
            roles: set(&["role_c"]),
        };

        let result = host.apply(&resource, ADDRESS, Some(&declared)).unwrap();
        assert_eq!(result, ApplyResult::Created { id: "auth0|1".into() });
        assert_eq!(mock.assigned("auth0|1"), set(&["role_c"]));
    }

    #[test]
    fn test_changed_user_replaces() {
        let (mock, resource) = setup();
        let mut host = Host::new(MemoryStateStore::new());
        host.apply(&resource, ADDRESS, Some(&config("auth0|1", &["role_a"])))
            .unwrap();

        let result = host
            .apply(&resource, ADDRESS, Some(&config("auth0|2", &["role_a"])))
            .unwrap();
        assert_eq!(
            result,
            ApplyResult::Replaced {
                previous: "auth0|1".into(),
                id: "auth0|2".into()
            }
        );
        assert!(mock.assigned("auth0|1").is_empty());
        assert_eq!(mock.assigned("auth0|2"), set(&["role_a"]));
    }

    #[test]
    fn test_import_adopts_current_roles() {
        let (mock, resource) = setup();
        mock.assign_out_of_band("auth0|1", &["role_b"]);
        let mut host = Host::new(MemoryStateStore::new());

        host.import(&resource, ADDRESS, "auth0|1").unwrap();
        assert_eq!(stored(&host).roles, set(&["role_b"]));
        assert_eq!(
            host.plan(&resource, ADDRESS, Some(&config("auth0|1", &["role_b"])))
                .unwrap(),
            Change::NoOp
        );
    }
}
