use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use ebkit::{EnvironmentHealth, TargetState, TierName};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stalkctl")]
#[command(version)]
#[command(about = "Declarative control for application platform resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/stalkctl/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Control plane base URL
    #[arg(long, global = true, env = "STALKCTL_ENDPOINT", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Report what would change without changing anything
    #[arg(long, global = true)]
    pub check: bool,

    /// Result format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage an application
    App(AppArgs),

    /// Manage application versions
    Version(VersionArgs),

    /// Manage environments
    Env(EnvArgs),

    /// Manage configuration templates
    Template(TemplateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// States
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AppState {
    #[default]
    Present,
    Absent,
    List,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum VersionState {
    #[default]
    Present,
    Absent,
    List,
    Cleanup,
}

/// States for environments and templates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ResourceState {
    #[default]
    Present,
    Absent,
    List,
    Details,
}

/// Map a mutating state to the reconcile target
pub fn target(present: bool) -> TargetState {
    if present {
        TargetState::Present
    } else {
        TargetState::Absent
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    WebServer,
    Worker,
}

impl From<TierArg> for TierName {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::WebServer => Self::WebServer,
            TierArg::Worker => Self::Worker,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HealthArg {
    Green,
    Yellow,
    Red,
    Grey,
}

impl From<HealthArg> for EnvironmentHealth {
    fn from(health: HealthArg) -> Self {
        match health {
            HealthArg::Green => Self::Green,
            HealthArg::Yellow => Self::Yellow,
            HealthArg::Red => Self::Red,
            HealthArg::Grey => Self::Grey,
        }
    }
}

// ============================================================================
// Applications
// ============================================================================

#[derive(Args)]
pub struct AppArgs {
    /// Application name (optional with --state list)
    #[arg(long)]
    pub name: Option<String>,

    /// Application description
    #[arg(long)]
    pub description: Option<String>,

    /// Desired state
    #[arg(long, value_enum, default_value_t)]
    pub state: AppState,
}

// ============================================================================
// Versions
// ============================================================================

#[derive(Args)]
pub struct VersionArgs {
    /// Application the version belongs to
    #[arg(long)]
    pub app: String,

    /// Version label
    #[arg(long)]
    pub label: Option<String>,

    /// Version description
    #[arg(long)]
    pub description: Option<String>,

    /// Bucket holding the source bundle
    #[arg(long, requires = "s3_key")]
    pub s3_bucket: Option<String>,

    /// Key of the source bundle
    #[arg(long, requires = "s3_bucket")]
    pub s3_key: Option<String>,

    /// Also delete the source bundle when deleting versions
    #[arg(long)]
    pub delete_source: bool,

    /// Cleanup: keep versions updated within this many days
    #[arg(long, value_name = "DAYS")]
    pub days_to_store: Option<u32>,

    /// Cleanup: keep this many most recent versions
    #[arg(long, value_name = "COUNT")]
    pub files_to_store: Option<u32>,

    /// Desired state
    #[arg(long, value_enum, default_value_t)]
    pub state: VersionState,
}

// ============================================================================
// Environments
// ============================================================================

#[derive(Args)]
pub struct EnvArgs {
    /// Application the environment belongs to
    #[arg(long)]
    pub app: String,

    /// Environment name
    #[arg(long)]
    pub name: Option<String>,

    /// Version to deploy
    #[arg(long)]
    pub version_label: Option<String>,

    /// Environment description
    #[arg(long)]
    pub description: Option<String>,

    /// Configuration template to launch from
    #[arg(long, conflicts_with = "solution_stack_name")]
    pub template_name: Option<String>,

    /// Solution stack to launch on
    #[arg(long)]
    pub solution_stack_name: Option<String>,

    /// CNAME prefix
    #[arg(long)]
    pub cname_prefix: Option<String>,

    /// Environment tier
    #[arg(long, value_enum, default_value = "web-server")]
    pub tier: TierArg,

    /// Option setting as NAMESPACE:OPTION=VALUE (repeatable)
    #[arg(long = "option-setting", value_name = "NS:OPT=VALUE")]
    pub option_settings: Vec<String>,

    /// JSON or TOML file with option settings
    #[arg(long, value_name = "PATH")]
    pub settings_file: Option<PathBuf>,

    /// Tag as KEY=VALUE, applied on create (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Seconds to wait for the environment (overrides config)
    #[arg(long, value_name = "SECONDS")]
    pub wait_timeout: Option<u64>,

    /// Also wait for this health after create or update
    #[arg(long, value_enum)]
    pub wait_for_health: Option<HealthArg>,

    /// Desired state
    #[arg(long, value_enum, default_value_t)]
    pub state: ResourceState,
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Args)]
pub struct TemplateArgs {
    /// Application the template belongs to
    #[arg(long)]
    pub app: String,

    /// Template name
    #[arg(long)]
    pub name: Option<String>,

    /// Template description
    #[arg(long)]
    pub description: Option<String>,

    /// Solution stack of the template
    #[arg(long)]
    pub solution_stack_name: Option<String>,

    /// Option setting as NAMESPACE:OPTION=VALUE (repeatable)
    #[arg(long = "option-setting", value_name = "NS:OPT=VALUE")]
    pub option_settings: Vec<String>,

    /// JSON or TOML file with option settings
    #[arg(long, value_name = "PATH")]
    pub settings_file: Option<PathBuf>,

    /// Tag as KEY=VALUE, applied on create (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Desired state
    #[arg(long, value_enum, default_value_t)]
    pub state: ResourceState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_env_command() {
        let cli = Cli::try_parse_from([
            "stalkctl",
            "--check",
            "--output",
            "text",
            "env",
            "--app",
            "shop",
            "--name",
            "web-prod",
            "--solution-stack-name",
            "64bit Amazon Linux",
            "--option-setting",
            "aws:autoscaling:asg:MaxSize=4",
            "--option-setting",
            "aws:autoscaling:asg:MinSize=2",
            "--tier",
            "worker",
            "--wait-for-health",
            "green",
        ])
        .unwrap();

        assert!(cli.check);
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Command::Env(args) => {
                assert_eq!(args.option_settings.len(), 2);
                assert_eq!(args.tier, TierArg::Worker);
                assert_eq!(args.wait_for_health, Some(HealthArg::Green));
                assert_eq!(args.state, ResourceState::Present);
            }
            _ => panic!("expected env command"),
        }
    }

    #[test]
    fn test_template_and_stack_conflict() {
        let result = Cli::try_parse_from([
            "stalkctl",
            "env",
            "--app",
            "shop",
            "--name",
            "web",
            "--template-name",
            "base",
            "--solution-stack-name",
            "stack",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_bundle_needs_both_parts() {
        let result = Cli::try_parse_from([
            "stalkctl", "version", "--app", "shop", "--label", "v1", "--s3-bucket", "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cleanup_state() {
        let cli = Cli::try_parse_from([
            "stalkctl",
            "version",
            "--app",
            "shop",
            "--files-to-store",
            "5",
            "--state",
            "cleanup",
        ])
        .unwrap();
        match cli.command {
            Command::Version(args) => {
                assert_eq!(args.state, VersionState::Cleanup);
                assert_eq!(args.files_to_store, Some(5));
            }
            _ => panic!("expected version command"),
        }
    }
}
