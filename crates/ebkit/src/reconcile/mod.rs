//! Reconcile flows, one module per resource kind.
//!
//! Every flow follows the same shape: fetch a fresh snapshot, let the differ
//! decide, stop there in check mode, otherwise issue the one mutation the
//! decision calls for and block on the waiter until the platform shows it.

pub mod application;
pub mod environment;
pub mod template;
pub mod version;

use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::types::ResourceKind;
use declarative::{
    Action, Change, Decision, DesiredSpec, Differ, ObservedResource, Predicate, TargetState,
    WaitPolicy, wait_for,
};
use serde::Serialize;

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether anything was (or in check mode, would be) mutated
    pub changed: bool,
    /// The resource acted on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
    /// Resources returned by list-like operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<serde_json::Value>>,
    /// Changes applied by an update
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<Change>,
    /// Human-readable summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Outcome {
    fn new(changed: bool) -> Self {
        Self {
            changed,
            resource: None,
            resources: None,
            updates: Vec::new(),
            output: None,
        }
    }

    /// Something was mutated.
    pub fn changed() -> Self {
        Self::new(true)
    }

    /// Nothing was mutated.
    pub fn unchanged() -> Self {
        Self::new(false)
    }

    /// Attach the resource acted on.
    pub fn with_resource<T: Serialize>(mut self, resource: &T) -> Result<Self> {
        self.resource = Some(serde_json::to_value(resource)?);
        Ok(self)
    }

    /// Attach the resource acted on, if there is one.
    pub fn with_optional_resource<T: Serialize>(self, resource: Option<&T>) -> Result<Self> {
        match resource {
            Some(r) => self.with_resource(r),
            None => Ok(self),
        }
    }

    /// Attach a list of resources.
    pub fn with_resources<T: Serialize>(mut self, resources: &[T]) -> Result<Self> {
        let values = resources
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.resources = Some(values);
        Ok(self)
    }

    /// Attach the applied changes.
    pub fn with_updates(mut self, updates: Vec<Change>) -> Self {
        self.updates = updates;
        self
    }

    /// Attach a summary message.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// What check mode reports for a decision.
pub(crate) fn preview(kind: ResourceKind, decision: &Decision, target: TargetState) -> Outcome {
    let message = match (decision.action, target) {
        (Action::Create, _) => format!("{kind} would be created"),
        (Action::Update, _) => format!("{kind} would be updated"),
        (Action::Delete, _) => format!("{kind} will be deleted"),
        (Action::Noop, TargetState::Present) => format!("{kind} is up-to-date"),
        (Action::Noop, TargetState::Absent) => format!("{kind} does not exist"),
    };
    Outcome::new(decision.is_change())
        .with_updates(decision.changes.clone())
        .with_output(message)
}

/// Zero matches is absence; more than one is an error.
pub(crate) fn unique<T>(kind: ResourceKind, query: &str, mut found: Vec<T>) -> Result<Option<T>> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(Error::AmbiguousMatch {
            kind,
            query: query.to_string(),
            count,
        }),
    }
}

/// Poll `fetch` until `predicate` holds, within the context's budget.
pub(crate) fn wait_until<T, F>(ctx: &ApplyContext<'_>, predicate: Predicate<T>, fetch: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let policy = WaitPolicy::new(ctx.wait.timeout, predicate, Error::is_transient)
        .with_interval(ctx.wait.interval);
    Ok(wait_for(&policy, ctx.clock, ctx.callback, fetch)?)
}

/// Wait until the fetched resource exists and matches `spec`.
pub(crate) fn wait_converged<D, O, F>(
    ctx: &ApplyContext<'_>,
    kind: ResourceKind,
    name: &str,
    spec: &D,
    fetch: F,
) -> Result<O>
where
    D: DesiredSpec + Clone + 'static,
    O: ObservedResource + 'static,
    F: FnMut() -> Result<Option<O>>,
{
    let predicate = converged(&ctx.differ, format!("{kind} {name} to match"), spec);
    wait_until(ctx, predicate, fetch)?.ok_or_else(|| Error::not_found(kind, name))
}

/// Wait until the fetched resource no longer exists.
pub(crate) fn wait_gone<O, F>(ctx: &ApplyContext<'_>, kind: ResourceKind, name: &str, fetch: F) -> Result<()>
where
    O: 'static,
    F: FnMut() -> Result<Option<O>>,
{
    let predicate = Predicate::new(format!("{kind} {name} to be deleted"), |o: &Option<O>| {
        o.is_none()
    });
    wait_until(ctx, predicate, fetch).map(|_| ())
}

fn converged<D, O>(differ: &Differ, name: String, spec: &D) -> Predicate<Option<O>>
where
    D: DesiredSpec + Clone + 'static,
    O: ObservedResource + 'static,
{
    let differ = differ.clone();
    let spec = spec.clone();
    Predicate::new(name, move |observed: &Option<O>| {
        observed
            .as_ref()
            .is_some_and(|o| differ.changes(&spec, o).is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique() {
        assert_eq!(unique::<u8>(ResourceKind::Version, "v1", vec![]).unwrap(), None);
        assert_eq!(unique(ResourceKind::Version, "v1", vec![7]).unwrap(), Some(7));

        let err = unique(ResourceKind::Environment, "web", vec![1, 2]).unwrap_err();
        match err {
            Error::AmbiguousMatch { kind, query, count } => {
                assert_eq!(kind, ResourceKind::Environment);
                assert_eq!(query, "web");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_preview_messages() {
        let create = preview(ResourceKind::Application, &Decision::create(), TargetState::Present);
        assert!(create.changed);
        assert_eq!(create.output.as_deref(), Some("Application would be created"));

        let missing = preview(ResourceKind::Environment, &Decision::noop(), TargetState::Absent);
        assert!(!missing.changed);
        assert_eq!(missing.output.as_deref(), Some("Environment does not exist"));

        let update = Decision::from_changes(vec![Change::new("Description", "a", "b")]);
        let outcome = preview(ResourceKind::Template, &update, TargetState::Present);
        assert_eq!(
            outcome.output.as_deref(),
            Some("Configuration Template would be updated")
        );
        assert_eq!(outcome.updates.len(), 1);
    }

    #[test]
    fn test_outcome_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Outcome::unchanged().with_output("nothing")).unwrap();
        assert_eq!(json, serde_json::json!({"changed": false, "output": "nothing"}));

        let json = serde_json::to_value(Outcome::changed().with_resources(&["a", "b"]).unwrap())
            .unwrap();
        assert_eq!(json, serde_json::json!({"changed": true, "resources": ["a", "b"]}));
    }
}
