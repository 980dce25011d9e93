//! Core types for declarative reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Old value reported for a setting that did not exist before
pub const NEW_VALUE: &str = "<NEW>";

/// State the caller wants a resource to end up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// Resource should exist and match the desired spec
    Present,
    /// Resource should not exist
    Absent,
}

/// What the orchestration layer has to do to converge a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Resource is missing and must be created
    Create,
    /// Resource exists but differs from desired
    Update,
    /// Resource exists and must be removed
    Delete,
    /// Nothing to do
    Noop,
}

impl Action {
    /// Whether this action mutates the remote resource
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Noop)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Noop => "noop",
        };
        write!(f, "{s}")
    }
}

/// A single field-level difference between observed and desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Field name, or `Namespace:OptionName` for option settings
    pub key: String,
    /// Observed value ([`NEW_VALUE`] if the setting did not exist)
    pub old: String,
    /// Desired value
    pub new: String,
}

impl Change {
    /// Create a new change
    pub fn new(key: impl Into<String>, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            old: old.into(),
            new: new.into(),
        }
    }

    /// Whether this change introduces a setting that did not exist
    pub fn is_addition(&self) -> bool {
        self.old == NEW_VALUE
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.key, self.old, self.new)
    }
}

/// Result of comparing desired and observed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Action to take
    pub action: Action,
    /// Field-level changes (only populated for updates)
    pub changes: Vec<Change>,
}

impl Decision {
    /// Decision to create a missing resource
    pub fn create() -> Self {
        Self {
            action: Action::Create,
            changes: Vec::new(),
        }
    }

    /// Decision to delete an existing resource
    pub fn delete() -> Self {
        Self {
            action: Action::Delete,
            changes: Vec::new(),
        }
    }

    /// Decision to leave the resource alone
    pub fn noop() -> Self {
        Self {
            action: Action::Noop,
            changes: Vec::new(),
        }
    }

    /// Update when there are changes, noop otherwise
    pub fn from_changes(changes: Vec<Change>) -> Self {
        if changes.is_empty() {
            Self::noop()
        } else {
            Self {
                action: Action::Update,
                changes,
            }
        }
    }

    /// Whether this decision mutates the remote resource
    pub fn is_change(&self) -> bool {
        self.action.is_change()
    }
}
