//! State differ: decides create / update / delete / noop for one resource

use crate::resource::{DesiredSpec, Field, ObservedResource};
use crate::settings::{EquivalenceTable, diff_settings};
use crate::types::{Change, Decision, TargetState};

/// Compares desired specs against observed resources
///
/// Pure: it never fetches or mutates anything. The orchestration layer
/// passes in a freshly fetched snapshot (or `None` when the resource is absent).
#[derive(Debug, Clone, Default)]
pub struct Differ {
    table: EquivalenceTable,
}

impl Differ {
    /// Create a differ with a custom equivalence table
    pub fn new(table: EquivalenceTable) -> Self {
        Self { table }
    }

    /// The equivalence table used for option settings
    pub fn table(&self) -> &EquivalenceTable {
        &self.table
    }

    /// Decide what to do to bring `observed` to `target`
    pub fn decide<D, O>(&self, desired: &D, observed: Option<&O>, target: TargetState) -> Decision
    where
        D: DesiredSpec + ?Sized,
        O: ObservedResource + ?Sized,
    {
        match (target, observed) {
            (TargetState::Present, None) => Decision::create(),
            (TargetState::Present, Some(current)) => {
                Decision::from_changes(self.changes(desired, current))
            }
            (TargetState::Absent, None) => Decision::noop(),
            (TargetState::Absent, Some(_)) => Decision::delete(),
        }
    }

    /// Enumerate the changes between a desired spec and an existing resource
    ///
    /// Scalar fields come first in [`Field::ALL`] order, then option settings
    /// in desired order.
    pub fn changes<D, O>(&self, desired: &D, observed: &O) -> Vec<Change>
    where
        D: DesiredSpec + ?Sized,
        O: ObservedResource + ?Sized,
    {
        let mut changes: Vec<Change> = Field::ALL
            .into_iter()
            .filter_map(|field| scalar_change(field, desired, observed))
            .collect();

        changes.extend(diff_settings(
            desired.option_settings(),
            observed.option_settings(),
            &self.table,
        ));

        changes
    }
}

/// Decide with the platform's default equivalence table
pub fn decide<D, O>(desired: &D, observed: Option<&O>, target: TargetState) -> Decision
where
    D: DesiredSpec + ?Sized,
    O: ObservedResource + ?Sized,
{
    Differ::default().decide(desired, observed, target)
}

fn scalar_change<D, O>(field: Field, desired: &D, observed: &O) -> Option<Change>
where
    D: DesiredSpec + ?Sized,
    O: ObservedResource + ?Sized,
{
    let wanted = desired.declared(field)?;
    let wanted = normalize(Some(wanted));
    let current = normalize(observed.field(field));

    if wanted == current {
        return None;
    }

    Some(Change::new(
        field.key(),
        current.unwrap_or_default(),
        wanted.unwrap_or_default(),
    ))
}

/// Empty strings and missing values are the same thing
fn normalize(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
