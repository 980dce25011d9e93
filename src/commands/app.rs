//! Application commands.

use anyhow::Result;
use ebkit::ApplicationSpec;

use super::{apply, client, emit, required};
use crate::Context;
use crate::cli::{AppArgs, AppState, target};

pub fn run(ctx: &Context, args: AppArgs) -> Result<()> {
    let client = client(ctx)?;
    match args.state {
        AppState::List => emit(ctx, &client.list_applications(args.name.as_deref())?),
        state => {
            let name = required(args.name, "--name", "present/absent")?;
            let spec = ApplicationSpec {
                application_name: name,
                description: args.description,
            };
            let target = target(state == AppState::Present);
            apply(ctx, None, |apply| client.application(apply, &spec, target))
        }
    }
}
