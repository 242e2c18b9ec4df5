//! Change planner - decides which hooks a pass needs

use crate::resource::Resource;
use crate::types::Change;
use anyhow::Result;

/// Plan the change that brings an instance to its declaration
///
/// `desired` is `None` when the instance is no longer declared; `current` is
/// `None` when no identity is bound (never created, or cleared by a read
/// that found the entity gone).
pub fn plan_change<R: Resource + ?Sized>(
    resource: &R,
    desired: Option<&R::Config>,
    current: Option<(&str, &R::State)>,
) -> Result<Change> {
    let change = match (desired, current) {
        (None, None) => Change::NoOp,
        (None, Some(_)) => Change::Delete,
        (Some(_), None) => Change::Create,
        (Some(config), Some((id, state))) => {
            let wanted = resource.desired_identity(config)?;
            if wanted != id {
                log::debug!(
                    "{}: identity changed from {} to {}",
                    resource.resource_type(),
                    id,
                    wanted
                );
                Change::Replace
            } else if resource.needs_update(config, state) {
                Change::Update
            } else {
                Change::NoOp
            }
        }
    };
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Label;

    impl Resource for Label {
        type Config = (String, String);
        type State = String;

        fn resource_type(&self) -> &'static str {
            "label"
        }

        fn desired_identity(&self, config: &Self::Config) -> Result<String> {
            Ok(config.0.clone())
        }

        fn create(&self, config: &Self::Config) -> Result<(String, String)> {
            Ok((config.0.clone(), config.1.clone()))
        }

        fn read(&self, _id: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn update(&self, _id: &str, config: &Self::Config, _prior: &String) -> Result<String> {
            Ok(config.1.clone())
        }

        fn delete(&self, _id: &str, _prior: &String) -> Result<()> {
            Ok(())
        }

        fn needs_update(&self, config: &Self::Config, state: &String) -> bool {
            &config.1 != state
        }
    }

    fn config(id: &str, value: &str) -> (String, String) {
        (id.to_string(), value.to_string())
    }

    #[test]
    fn test_plan_absent_and_undeclared() {
        assert_eq!(plan_change(&Label, None, None).unwrap(), Change::NoOp);
        assert_eq!(
            plan_change(&Label, Some(&config("a", "v")), None).unwrap(),
            Change::Create
        );
        let state = "v".to_string();
        assert_eq!(
            plan_change(&Label, None, Some(("a", &state))).unwrap(),
            Change::Delete
        );
    }

    #[test]
    fn test_plan_existing() {
        let state = "v".to_string();
        assert_eq!(
            plan_change(&Label, Some(&config("a", "v")), Some(("a", &state))).unwrap(),
            Change::NoOp
        );
        assert_eq!(
            plan_change(&Label, Some(&config("a", "w")), Some(("a", &state))).unwrap(),
            Change::Update
        );
        assert_eq!(
            plan_change(&Label, Some(&config("b", "v")), Some(("a", &state))).unwrap(),
            Change::Replace
        );
    }
}
