//! Application flow.

use super::{Outcome, preview, unique, wait_converged, wait_gone};
use crate::backend::Backend;
use crate::context::ApplyContext;
use crate::error::Result;
use crate::types::{Application, ApplicationSpec, ResourceKind};
use declarative::{Action, TargetState};

const KIND: ResourceKind = ResourceKind::Application;

/// Look up one application by exact name.
pub fn find(backend: &dyn Backend, name: &str) -> Result<Option<Application>> {
    unique(KIND, name, backend.list_applications(Some(name))?)
}

/// Drive an application toward `target`.
pub fn reconcile(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    spec: &ApplicationSpec,
    target: TargetState,
) -> Result<Outcome> {
    let name = spec.application_name.as_str();
    let observed = find(backend, name)?;
    let decision = ctx.differ.decide(spec, observed.as_ref(), target);
    log::debug!("{KIND} {name}: {}", decision.action);

    if ctx.check_mode {
        return preview(KIND, &decision, target).with_optional_resource(observed.as_ref());
    }

    match decision.action {
        Action::Create => {
            log::info!("Creating application {name}");
            backend.create_application(name, spec.description.as_deref())?;
            let app = wait_converged(ctx, KIND, name, spec, || find(backend, name))?;
            Outcome::changed().with_resource(&app)
        }
        Action::Update => {
            log::info!("Updating application {name}");
            backend.update_application(name, spec.description.as_deref())?;
            let app = wait_converged(ctx, KIND, name, spec, || find(backend, name))?;
            Ok(Outcome::changed()
                .with_resource(&app)?
                .with_updates(decision.changes))
        }
        Action::Delete => {
            log::info!("Deleting application {name}");
            backend.delete_application(name)?;
            wait_gone(ctx, KIND, name, || find(backend, name))?;
            Outcome::changed().with_optional_resource(observed.as_ref())
        }
        Action::Noop => match observed {
            Some(app) => Outcome::unchanged().with_resource(&app),
            None => Ok(Outcome::unchanged().with_output("Application not found")),
        },
    }
}

/// List applications, or the one named.
pub fn list(backend: &dyn Backend, name: Option<&str>) -> Result<Outcome> {
    let apps = backend.list_applications(name)?;
    Outcome::unchanged().with_resources(&apps)
}
