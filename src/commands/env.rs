//! Environment commands.

use anyhow::Result;
use ebkit::EnvironmentSpec;

use super::{
    apply, client, desired_settings, emit, parse_tags, required, validate_environment_name,
};
use crate::Context;
use crate::cli::{EnvArgs, ResourceState, target};

pub fn run(ctx: &Context, args: EnvArgs) -> Result<()> {
    let client = client(ctx)?;
    match args.state {
        ResourceState::List => {
            emit(ctx, &client.list_environments(&args.app, args.name.as_deref())?)
        }
        ResourceState::Details => {
            let name = required(args.name, "--name", "details")?;
            emit(ctx, &client.environment_details(&args.app, &name)?)
        }
        state => {
            let name = required(args.name, "--name", "present/absent")?;
            validate_environment_name(&name)?;
            let option_settings =
                desired_settings(&args.option_settings, args.settings_file.as_deref())?;

            let mut spec = EnvironmentSpec::new(args.app, name);
            spec.version_label = args.version_label;
            spec.description = args.description;
            spec.template_name = args.template_name;
            spec.solution_stack_name = args.solution_stack_name;
            spec.cname_prefix = args.cname_prefix;
            spec.tier = args.tier.into();
            spec.option_settings = option_settings;
            spec.tags = parse_tags(&args.tags)?;
            spec.wait_for_health = args.wait_for_health.map(Into::into);

            let target = target(state == ResourceState::Present);
            apply(ctx, args.wait_timeout, |apply| {
                client.environment(apply, &spec, target)
            })
        }
    }
}
