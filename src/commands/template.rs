//! Configuration template commands.

use anyhow::Result;
use ebkit::TemplateSpec;

use super::{apply, client, desired_settings, emit, parse_tags, required};
use crate::Context;
use crate::cli::{ResourceState, TemplateArgs, target};

pub fn run(ctx: &Context, args: TemplateArgs) -> Result<()> {
    let client = client(ctx)?;
    match args.state {
        ResourceState::List => emit(ctx, &client.list_templates(&args.app, args.name.as_deref())?),
        ResourceState::Details => {
            let name = required(args.name, "--name", "details")?;
            emit(ctx, &client.template_details(&args.app, &name)?)
        }
        state => {
            let name = required(args.name, "--name", "present/absent")?;
            let spec = TemplateSpec {
                application_name: args.app,
                template_name: name,
                description: args.description,
                solution_stack_name: args.solution_stack_name,
                option_settings: desired_settings(
                    &args.option_settings,
                    args.settings_file.as_deref(),
                )?,
                tags: parse_tags(&args.tags)?,
            };
            let target = target(state == ResourceState::Present);
            apply(ctx, None, |apply| client.template(apply, &spec, target))
        }
    }
}
