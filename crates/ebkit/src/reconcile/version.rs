//! Application version flow and retention cleanup.

use super::{Outcome, preview, unique, wait_converged, wait_gone, wait_until};
use crate::backend::Backend;
use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::types::{ApplicationVersion, EnvironmentStatus, ResourceKind, VersionSpec};
use chrono::{DateTime, Utc};
use declarative::{
    Action, DeployedSet, Predicate, RetentionPolicy, TargetState, VersionRecord, select_for_cleanup,
};
use std::collections::BTreeSet;

const KIND: ResourceKind = ResourceKind::Version;

/// Look up one version by label.
pub fn find(backend: &dyn Backend, app: &str, label: &str) -> Result<Option<ApplicationVersion>> {
    unique(KIND, label, backend.list_versions(app, Some(label))?)
}

/// Drive a version toward `target`.
///
/// Deleting a version whose source bundle is already gone counts as success.
pub fn reconcile(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    spec: &VersionSpec,
    target: TargetState,
    delete_source: bool,
) -> Result<Outcome> {
    let app = spec.application_name.as_str();
    let label = spec.version_label.as_str();
    let observed = find(backend, app, label)?;
    let decision = ctx.differ.decide(spec, observed.as_ref(), target);
    log::debug!("{KIND} {app}/{label}: {}", decision.action);

    if ctx.check_mode {
        return preview(KIND, &decision, target).with_optional_resource(observed.as_ref());
    }

    match decision.action {
        Action::Create => {
            if spec.source_bundle.is_none() {
                return Err(Error::InvalidRequest(format!(
                    "version {label} does not exist and no source bundle was given"
                )));
            }
            log::info!("Creating version {label} of {app}");
            backend.create_version(spec)?;
            let version = wait_converged(ctx, KIND, label, spec, || find(backend, app, label))?;
            Outcome::changed().with_resource(&version)
        }
        Action::Update => {
            log::info!("Updating version {label} of {app}");
            backend.update_version(app, label, spec.description.as_deref())?;
            let version = wait_converged(ctx, KIND, label, spec, || find(backend, app, label))?;
            Ok(Outcome::changed()
                .with_resource(&version)?
                .with_updates(decision.changes))
        }
        Action::Delete => {
            log::info!("Deleting version {label} of {app}");
            match backend.delete_version(app, label, delete_source) {
                Ok(()) => {}
                Err(e) if e.is_ignorable() => log::warn!("{e}"),
                Err(e) if e.is_not_found() => {
                    return Ok(Outcome::unchanged()
                        .with_output(format!("Version not found for application: {app}")));
                }
                Err(e) => return Err(e),
            }
            wait_gone(ctx, KIND, label, || find(backend, app, label))?;
            Outcome::changed().with_optional_resource(observed.as_ref())
        }
        Action::Noop => match observed {
            Some(version) => Outcome::unchanged().with_resource(&version),
            None => Ok(Outcome::unchanged()
                .with_output(format!("Version not found for application: {app}"))),
        },
    }
}

/// List versions of an application, or the one labelled.
pub fn list(backend: &dyn Backend, app: &str, label: Option<&str>) -> Result<Outcome> {
    let versions = backend.list_versions(app, label)?;
    Outcome::unchanged().with_resources(&versions)
}

/// Labels referenced by environments that still exist.
pub fn deployed_labels(backend: &dyn Backend, app: &str) -> Result<DeployedSet> {
    Ok(backend
        .list_environments(app, None)?
        .into_iter()
        .filter(|e| e.status != EnvironmentStatus::Terminated)
        .filter_map(|e| e.version_label)
        .collect())
}

/// Remove versions that fall outside the retention policy.
///
/// Deployed versions are never touched. Deletions run one at a time; the
/// first failure stops the batch and reports what was and was not processed.
pub fn cleanup(
    backend: &dyn Backend,
    ctx: &ApplyContext<'_>,
    app: &str,
    policy: RetentionPolicy,
    delete_source: bool,
    now: DateTime<Utc>,
) -> Result<Outcome> {
    let versions = backend.list_versions(app, None)?;
    if versions.is_empty() {
        return Ok(Outcome::unchanged()
            .with_output(format!("Versions not found for application: {app}")));
    }

    let deployed = deployed_labels(backend, app)?;
    let records: Vec<VersionRecord> = versions.iter().map(ApplicationVersion::to_record).collect();
    let Some(selected) = select_for_cleanup(&records, &deployed, policy, now) else {
        return Ok(Outcome::unchanged().with_output("Nothing to remove for given parameters"));
    };
    log::info!(
        "Selected {} of {} version(s) of {app} for removal",
        selected.len(),
        records.len()
    );

    if ctx.check_mode {
        return Ok(Outcome::changed()
            .with_resources(&selected)?
            .with_output(format!("Following {} versions will be removed", selected.len())));
    }

    let removed = remove_batch(backend, app, &selected, delete_source)?;

    let gone: BTreeSet<String> = removed.iter().cloned().collect();
    let predicate = Predicate::new(
        format!("{} version(s) of {app} to be deleted", gone.len()),
        move |versions: &Vec<ApplicationVersion>| {
            !versions.iter().any(|v| gone.contains(&v.version_label))
        },
    );
    wait_until(ctx, predicate, || backend.list_versions(app, None))?;

    Ok(Outcome::changed()
        .with_resources(&selected)?
        .with_output(format!("Removed {} version(s) for given parameters", removed.len())))
}

fn remove_batch(
    backend: &dyn Backend,
    app: &str,
    selected: &[VersionRecord],
    delete_source: bool,
) -> Result<Vec<String>> {
    let mut removed = Vec::with_capacity(selected.len());
    for (i, record) in selected.iter().enumerate() {
        match backend.delete_version(app, &record.label, delete_source) {
            Ok(()) => {}
            Err(e) if e.is_ignorable() => log::warn!("{e}"),
            Err(e) => {
                let not_processed = selected[i + 1..].iter().map(|r| r.label.clone()).collect();
                log::error!("Cleanup of {app} stopped at version {}", record.label);
                return Err(Error::CleanupAborted {
                    failed: record.label.clone(),
                    source: Box::new(e),
                    removed,
                    not_processed,
                });
            }
        }
        log::debug!("Removed version {}", record.label);
        removed.push(record.label.clone());
    }
    Ok(removed)
}
