//! Configuration template flow.

use super::{Outcome, preview, unique, wait_converged, wait_gone};
use crate::backend::{Backend, SettingsTarget};
use crate::context::ApplyContext;
use crate::error::Result;
use crate::types::{ConfigurationSettings, ResourceKind, TemplateSpec};
use declarative::{Action, Change, TargetState};

const KIND: ResourceKind = ResourceKind::Template;

/// Look up one template of an application.
pub fn find(backend: &dyn Backend, app: &str, name: &str) -> Result<Option<ConfigurationSettings>> {
    match backend.describe_configuration_settings(app, SettingsTarget::Template(name)) {
        Ok(found) => unique(KIND, name, found),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Drive a configuration template toward `target`.
pub fn reconcile(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    spec: &TemplateSpec,
    target: TargetState,
) -> Result<Outcome> {
    let app = spec.application_name.as_str();
    let name = spec.template_name.as_str();
    let observed = find(backend, app, name)?;
    let decision = ctx.differ.decide(spec, observed.as_ref(), target);
    log::debug!("{KIND} {app}/{name}: {}", decision.action);

    if ctx.check_mode {
        return preview(KIND, &decision, target).with_optional_resource(observed.as_ref());
    }

    match decision.action {
        Action::Create => create(backend, ctx, spec),
        Action::Update => update(backend, ctx, spec, decision.changes),
        Action::Delete => {
            log::info!("Deleting template {name} of {app}");
            match backend.delete_configuration_template(app, name) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    return Ok(Outcome::unchanged().with_output(format!("{KIND} not found")));
                }
                Err(e) => return Err(e),
            }
            wait_gone(ctx, KIND, name, || find(backend, app, name))?;
            Outcome::changed().with_optional_resource(observed.as_ref())
        }
        Action::Noop => match observed {
            Some(template) => Outcome::unchanged().with_resource(&template),
            None => Ok(Outcome::unchanged().with_output(format!("{KIND} not found"))),
        },
    }
}

fn create(backend: &dyn Backend, ctx: &ApplyContext<'_>, spec: &TemplateSpec) -> Result<Outcome> {
    let app = spec.application_name.as_str();
    let name = spec.template_name.as_str();
    log::info!("Creating template {name} of {app}");

    match backend.create_configuration_template(spec) {
        Ok(()) => {
            let template = wait_converged(ctx, KIND, name, spec, || find(backend, app, name))?;
            Outcome::changed().with_resource(&template)
        }
        Err(e) if e.is_already_exists() => {
            log::info!("Template {name} was created concurrently, reconciling as update");
            let Some(current) = find(backend, app, name)? else {
                return Err(e);
            };
            let changes = ctx.differ.changes(spec, &current);
            if changes.is_empty() {
                Outcome::unchanged().with_resource(&current)
            } else {
                update(backend, ctx, spec, changes)
            }
        }
        Err(e) => Err(e),
    }
}

fn update(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    spec: &TemplateSpec,
    changes: Vec<Change>,
) -> Result<Outcome> {
    let app = spec.application_name.as_str();
    let name = spec.template_name.as_str();
    log::info!("Updating template {name} of {app} ({} change(s))", changes.len());
    backend.update_configuration_template(spec)?;
    let template = wait_converged(ctx, KIND, name, spec, || find(backend, app, name))?;
    Ok(Outcome::changed().with_resource(&template)?.with_updates(changes))
}

/// List templates of an application, or the one named.
pub fn list(backend: &dyn Backend, app: &str, name: Option<&str>) -> Result<Outcome> {
    let templates = match name {
        Some(name) => find(backend, app, name)?.into_iter().collect(),
        None => backend.describe_configuration_settings(app, SettingsTarget::AllTemplates)?,
    };
    Outcome::unchanged().with_resources(&templates)
}

/// Current settings of one template.
pub fn details(backend: &dyn Backend, app: &str, name: &str) -> Result<Outcome> {
    match find(backend, app, name)? {
        Some(template) => Outcome::unchanged().with_resource(&template),
        None => Ok(Outcome::unchanged().with_output(format!("{KIND} not found"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use declarative::{ManualClock, OptionSetting};

    fn spec() -> TemplateSpec {
        let mut spec = TemplateSpec::new("shop", "base");
        spec.solution_stack_name = Some("64bit Amazon Linux running Docker".to_string());
        spec.option_settings = vec![OptionSetting::new(
            "aws:elasticbeanstalk:environment",
            "EnvironmentType",
            "LoadBalanced",
        )];
        spec
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed_application("shop", None);
        backend
    }

    #[test]
    fn test_create_update_delete() {
        let backend = backend();
        let clock = ManualClock::new();
        let ctx = ApplyContext::new().with_clock(&clock);

        let created = reconcile(&backend, &ctx, &spec(), TargetState::Present).unwrap();
        assert!(created.changed);

        let mut changed = spec();
        changed.description = Some("shared base".to_string());
        let updated = reconcile(&backend, &ctx, &changed, TargetState::Present).unwrap();
        assert!(updated.changed);
        assert_eq!(updated.updates.len(), 1);
        assert_eq!(updated.updates[0].key, "Description");

        let noop = reconcile(&backend, &ctx, &changed, TargetState::Present).unwrap();
        assert!(!noop.changed);

        let deleted = reconcile(&backend, &ctx, &changed, TargetState::Absent).unwrap();
        assert!(deleted.changed);
        assert!(find(&backend, "shop", "base").unwrap().is_none());
    }

    #[test]
    fn test_missing_template() {
        let backend = backend();
        let clock = ManualClock::new();
        let ctx = ApplyContext::new().with_clock(&clock);

        let outcome = reconcile(&backend, &ctx, &spec(), TargetState::Absent).unwrap();
        assert!(!outcome.changed);
        assert_eq!(
            outcome.output.as_deref(),
            Some("Configuration Template not found")
        );

        let listed = list(&backend, "shop", Some("base")).unwrap();
        assert_eq!(listed.resources.unwrap().len(), 0);
    }
}
