//! Core types for declarative resource lifecycles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle hook invoked on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hook {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        };
        f.write_str(name)
    }
}

/// Change planned for a single resource instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Observed state already satisfies the declaration
    NoOp,
    /// Instance is declared but absent
    Create,
    /// Instance exists and drifted from the declaration
    Update,
    /// Declared identity differs from the bound one; delete then create
    Replace,
    /// Instance exists but is no longer declared
    Delete,
}

impl Change {
    /// Check if the change does anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Check if the change removes remote state
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Replace | Self::Delete)
    }

    /// Hooks run, in order, to carry out this change
    pub fn hooks(&self) -> &'static [Hook] {
        match self {
            Self::NoOp => &[],
            Self::Create => &[Hook::Create],
            Self::Update => &[Hook::Update],
            Self::Replace => &[Hook::Delete, Hook::Create],
            Self::Delete => &[Hook::Delete],
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        f.write_str(verb)
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Instance was created and bound to an identity
    Created { id: String },
    /// Instance was updated in place
    Updated { id: String },
    /// Instance was deleted and recreated under a new identity
    Replaced { previous: String, id: String },
    /// Instance was deleted
    Deleted { id: String },
    /// Existing remote entity was adopted into state
    Imported { id: String },
    /// Pass was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange | Self::Skipped { .. })
    }

    /// Identity bound after the pass, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Created { id }
            | Self::Updated { id }
            | Self::Replaced { id, .. }
            | Self::Imported { id } => Some(id),
            Self::NoChange | Self::Deleted { .. } | Self::Skipped { .. } => None,
        }
    }
}

/// Summary of results across passes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub imported: usize,
    pub skipped: usize,
    pub no_change: usize,
}

impl ApplySummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted + self.imported
    }

    /// Total number of passes recorded
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created { .. } => self.created += 1,
            ApplyResult::Updated { .. } => self.updated += 1,
            ApplyResult::Replaced { .. } => self.replaced += 1,
            ApplyResult::Deleted { .. } => self.deleted += 1,
            ApplyResult::Imported { .. } => self.imported += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Plan and refresh only; never run create/update/delete hooks
    pub dry_run: bool,
}
