//! Diff computation between desired and observed values

use std::collections::BTreeSet;

/// Difference between a desired and an observed set
///
/// Computed fresh on every pass and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T: Ord> {
    /// Members desired but not observed
    pub to_add: BTreeSet<T>,
    /// Members observed but not desired
    pub to_remove: BTreeSet<T>,
}

impl<T: Ord + Clone> SetDiff<T> {
    /// Compute `desired - observed` and `observed - desired`
    pub fn compute(desired: &BTreeSet<T>, observed: &BTreeSet<T>) -> Self {
        Self {
            to_add: desired.difference(observed).cloned().collect(),
            to_remove: observed.difference(desired).cloned().collect(),
        }
    }

    /// Check if both sides already match
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_set_diff() {
        let diff = SetDiff::compute(&set(&["role_a", "role_b"]), &set(&["role_b", "role_c"]));
        assert_eq!(diff.to_add, set(&["role_a"]));
        assert_eq!(diff.to_remove, set(&["role_c"]));
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_set_diff_equal_sets() {
        let diff = SetDiff::compute(&set(&["x"]), &set(&["x"]));
        assert!(diff.is_empty());

        let empty: SetDiff<String> = SetDiff::compute(&BTreeSet::new(), &BTreeSet::new());
        assert!(empty.is_empty());
    }
}
