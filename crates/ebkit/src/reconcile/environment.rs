//! Environment flow.
//!
//! Environments are tracked by id once created, so a terminated environment
//! with the same name cannot satisfy a wait. A create that loses a race to a
//! concurrent creator falls through to the update path.

use super::{Outcome, preview, unique, wait_until};
use crate::backend::{Backend, SettingsTarget};
use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::types::{Environment, EnvironmentSnapshot, EnvironmentSpec, EnvironmentStatus, ResourceKind};
use declarative::{Action, Change, Predicate, TargetState};

const KIND: ResourceKind = ResourceKind::Environment;

/// Look up the live environment with this name.
///
/// Terminating and terminated environments are treated as absent.
pub fn find(backend: &dyn Backend, app: &str, name: &str) -> Result<Option<Environment>> {
    let names = [name.to_string()];
    let live = backend
        .list_environments(app, Some(&names))?
        .into_iter()
        .filter(|e| !e.status.is_terminal())
        .collect();
    unique(KIND, name, live)
}

/// Pair an environment with its current option settings.
pub fn snapshot(backend: &dyn Backend, environment: Environment) -> Result<EnvironmentSnapshot> {
    let target = SettingsTarget::Environment(&environment.environment_name);
    let option_settings = backend
        .describe_configuration_settings(&environment.application_name, target)?
        .into_iter()
        .next()
        .map(|s| s.option_settings)
        .unwrap_or_default();
    Ok(EnvironmentSnapshot {
        environment,
        option_settings,
    })
}

/// Drive an environment toward `target`.
pub fn reconcile(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    spec: &EnvironmentSpec,
    target: TargetState,
) -> Result<Outcome> {
    let app = spec.application_name.as_str();
    let name = spec.environment_name.as_str();
    let observed = match find(backend, app, name)? {
        Some(env) => Some(snapshot(backend, env)?),
        None => None,
    };
    let decision = ctx.differ.decide(spec, observed.as_ref(), target);
    log::debug!("{KIND} {app}/{name}: {}", decision.action);

    if ctx.check_mode {
        let env = observed.as_ref().map(|s| &s.environment);
        return preview(KIND, &decision, target).with_optional_resource(env);
    }

    match (decision.action, observed) {
        (Action::Create, _) => create(backend, ctx, spec),
        (Action::Update, _) => update(backend, ctx, spec, decision.changes),
        (Action::Delete, Some(current)) => terminate(backend, ctx, current.environment),
        (Action::Noop, Some(current)) => Outcome::unchanged().with_resource(&current.environment),
        (_, None) => Ok(Outcome::unchanged().with_output("Environment not found")),
    }
}

fn create(backend: &dyn Backend, ctx: &ApplyContext<'_>, spec: &EnvironmentSpec) -> Result<Outcome> {
    let app = spec.application_name.as_str();
    let name = spec.environment_name.as_str();
    log::info!("Creating environment {name} in {app}");

    match backend.create_environment(spec) {
        Ok(env) => {
            let env = wait_ready(backend, ctx, spec, &env.environment_id)?;
            Outcome::changed().with_resource(&env)
        }
        Err(e) if is_name_race(&e, name) => {
            let Some(env) = find(backend, app, name)? else {
                return Err(Error::AlreadyExists {
                    kind: KIND,
                    name: name.to_string(),
                    message: format!("Environment {name} already exists in another application"),
                });
            };
            log::info!("Environment {name} was created concurrently, reconciling as update");
            let current = snapshot(backend, env)?;
            let changes = ctx.differ.changes(spec, &current);
            if changes.is_empty() {
                Outcome::unchanged().with_resource(&current.environment)
            } else {
                update(backend, ctx, spec, changes)
            }
        }
        Err(e) => Err(e),
    }
}

/// Only the platform's "Environment NAME already exists" rejection is a
/// lost race; other conflicts (a taken CNAME prefix) are reported as is.
fn is_name_race(err: &Error, name: &str) -> bool {
    match err {
        Error::AlreadyExists { message, .. } => {
            message.contains(&format!("Environment {name} already exists"))
        }
        _ => false,
    }
}

fn update(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    spec: &EnvironmentSpec,
    changes: Vec<Change>,
) -> Result<Outcome> {
    log::info!(
        "Updating environment {} ({} change(s))",
        spec.environment_name,
        changes.len()
    );
    let env = backend.update_environment(spec)?;
    let env = wait_ready(backend, ctx, spec, &env.environment_id)?;
    Ok(Outcome::changed().with_resource(&env)?.with_updates(changes))
}

fn terminate(backend: &dyn Backend, ctx: &ApplyContext<'_>, current: Environment) -> Result<Outcome> {
    let name = current.environment_name.as_str();
    log::info!("Terminating environment {name}");

    match backend.terminate_environment(name) {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            return Ok(Outcome::unchanged().with_output("Environment not found"));
        }
        Err(e) => return Err(e),
    }

    let predicate = Predicate::new(
        format!("environment {name} to be Terminated"),
        |env: &Option<Environment>| {
            env.as_ref()
                .is_none_or(|e| e.status == EnvironmentStatus::Terminated)
        },
    );
    let last = wait_until(ctx, predicate, || {
        by_id(backend, &current.application_name, name, &current.environment_id)
    })?;
    Outcome::changed().with_resource(&last.unwrap_or(current))
}

fn wait_ready(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    spec: &EnvironmentSpec,
    id: &str,
) -> Result<Environment> {
    let app = spec.application_name.as_str();
    let name = spec.environment_name.as_str();
    let env = wait_until(ctx, readiness(spec), || by_id(backend, app, name, id))?;
    env.ok_or_else(|| Error::not_found(KIND, name))
}

fn by_id(backend: &dyn Backend, app: &str, name: &str, id: &str) -> Result<Option<Environment>> {
    let names = [name.to_string()];
    Ok(backend
        .list_environments(app, Some(&names))?
        .into_iter()
        .find(|e| e.environment_id == id))
}

/// Ready, running the requested version, and healthy enough if asked.
fn readiness(spec: &EnvironmentSpec) -> Predicate<Option<Environment>> {
    let mut predicate = Predicate::new(
        format!("environment {} to be Ready", spec.environment_name),
        |env: &Option<Environment>| {
            env.as_ref()
                .is_some_and(|e| e.status == EnvironmentStatus::Ready)
        },
    );
    if let Some(label) = spec.version_label.clone() {
        predicate = predicate.and(Predicate::new(
            format!("version {label} deployed"),
            move |env: &Option<Environment>| {
                env.as_ref()
                    .is_some_and(|e| e.version_label.as_deref() == Some(label.as_str()))
            },
        ));
    }
    if let Some(health) = spec.wait_for_health {
        predicate = predicate.and(Predicate::new(
            format!("health {health}"),
            move |env: &Option<Environment>| env.as_ref().is_some_and(|e| e.health == health),
        ));
    }
    predicate
}

/// List live environments of an application.
pub fn list(backend: &dyn Backend, app: &str, name: Option<&str>) -> Result<Outcome> {
    let names = name.map(|n| vec![n.to_string()]);
    let live: Vec<Environment> = backend
        .list_environments(app, names.as_deref())?
        .into_iter()
        .filter(|e| !e.status.is_terminal())
        .collect();
    Outcome::unchanged().with_resources(&live)
}

/// Current option settings of one environment.
pub fn details(backend: &dyn Backend, app: &str, name: &str) -> Result<Outcome> {
    match find(backend, app, name)? {
        Some(env) => Outcome::unchanged().with_resource(&snapshot(backend, env)?),
        None => Ok(Outcome::unchanged().with_output("Environment not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::types::EnvironmentHealth;
    use declarative::{ManualClock, OptionSetting};

    fn spec() -> EnvironmentSpec {
        let mut spec = EnvironmentSpec::new("shop", "web");
        spec.solution_stack_name = Some("64bit Amazon Linux running Docker".to_string());
        spec.version_label = Some("v1".to_string());
        spec
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed_application("shop", None);
        backend.seed_version("shop", "v1", chrono::Utc::now());
        backend.seed_version("shop", "v2", chrono::Utc::now());
        backend
    }

    #[test]
    fn test_readiness_name_lists_every_condition() {
        let mut spec = spec();
        spec.wait_for_health = Some(EnvironmentHealth::Green);
        let predicate = readiness(&spec);
        assert_eq!(
            predicate.name(),
            "environment web to be Ready and version v1 deployed and health Green"
        );
    }

    #[test]
    fn test_create_waits_for_ready() {
        let backend = backend();
        let clock = ManualClock::new();
        let ctx = ApplyContext::new().with_clock(&clock);

        let outcome = reconcile(&backend, &ctx, &spec(), TargetState::Present).unwrap();
        assert!(outcome.changed);
        let env = outcome.resource.unwrap();
        assert_eq!(env["Status"], "Ready");
        assert_eq!(env["VersionLabel"], "v1");
        assert!(clock.sleeps() >= 1);
    }

    #[test]
    fn test_update_settings() {
        let backend = backend();
        backend.seed_environment("shop", "web", Some("v1"));
        let clock = ManualClock::new();
        let ctx = ApplyContext::new().with_clock(&clock);

        let mut spec = spec();
        spec.version_label = Some("v2".to_string());
        spec.option_settings = vec![OptionSetting::new(
            "aws:autoscaling:asg",
            "MaxSize",
            "4",
        )];

        let outcome = reconcile(&backend, &ctx, &spec, TargetState::Present).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.updates.len(), 2);
        assert_eq!(
            backend.environment("web").unwrap().version_label.as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn test_terminate_waits_for_terminated() {
        let backend = backend();
        backend.seed_environment("shop", "web", Some("v1"));
        let clock = ManualClock::new();
        let ctx = ApplyContext::new().with_clock(&clock);

        let outcome = reconcile(&backend, &ctx, &spec(), TargetState::Absent).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.resource.unwrap()["Status"], "Terminated");
        assert!(find(&backend, "shop", "web").unwrap().is_none());
    }

    #[test]
    fn test_only_the_name_conflict_is_a_race() {
        let taken = |message: &str| Error::AlreadyExists {
            kind: KIND,
            name: "web".to_string(),
            message: message.to_string(),
        };
        assert!(is_name_race(&taken("Environment web already exists."), "web"));
        assert!(!is_name_race(&taken("Environment web-prod already exists."), "web"));
        assert!(!is_name_race(&taken("CNAME shop already exists."), "web"));
        assert!(!is_name_race(&Error::not_found(KIND, "web"), "web"));
    }

    #[test]
    fn test_details_includes_settings() {
        let backend = backend();
        backend.seed_environment("shop", "web", Some("v1"));
        backend.set_environment_settings(
            "web",
            vec![OptionSetting::new("aws:autoscaling:asg", "MaxSize", "4")],
        );

        let outcome = details(&backend, "shop", "web").unwrap();
        assert!(!outcome.changed);
        let resource = outcome.resource.unwrap();
        assert_eq!(resource["EnvironmentName"], "web");
        assert_eq!(resource["VersionLabel"], "v1");
        assert_eq!(resource["Status"], "Ready");
        assert_eq!(resource["OptionSettings"][0]["OptionName"], "MaxSize");
        assert_eq!(resource["OptionSettings"][0]["Value"], "4");
        assert!(resource.get("Environment").is_none());
    }

    #[test]
    fn test_details_missing() {
        let backend = backend();
        let outcome = details(&backend, "shop", "nope").unwrap();
        assert_eq!(outcome.output.as_deref(), Some("Environment not found"));
    }
}
