//! Application version commands, including retention cleanup.

use anyhow::{Context as _, Result};
use chrono::Utc;
use ebkit::{RetentionPolicy, SourceBundle, VersionSpec};

use super::{apply, client, emit, required};
use crate::Context;
use crate::cli::{VersionArgs, VersionState, target};

pub fn run(ctx: &Context, args: VersionArgs) -> Result<()> {
    let client = client(ctx)?;
    match args.state {
        VersionState::List => emit(ctx, &client.list_versions(&args.app, args.label.as_deref())?),
        VersionState::Cleanup => {
            let policy = RetentionPolicy::new(args.days_to_store, args.files_to_store)
                .context("--days-to-store or --files-to-store is required with --state cleanup")?;
            log::info!("Cleaning up versions of {} ({policy:?})", args.app);
            apply(ctx, None, |apply| {
                client.cleanup_versions(apply, &args.app, policy, args.delete_source, Utc::now())
            })
        }
        state => {
            let label = required(args.label, "--label", "present/absent")?;
            let source_bundle = match (args.s3_bucket, args.s3_key) {
                (Some(bucket), Some(key)) => Some(SourceBundle::new(bucket, key)),
                _ => None,
            };
            let spec = VersionSpec {
                application_name: args.app,
                version_label: label,
                description: args.description,
                source_bundle,
            };
            let target = target(state == VersionState::Present);
            apply(ctx, None, |apply| {
                client.version(apply, &spec, target, args.delete_source)
            })
        }
    }
}
