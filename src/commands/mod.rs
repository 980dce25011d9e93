//! Command handlers and the argument parsing they share.

pub mod app;
pub mod env;
pub mod template;
pub mod version;

use anyhow::{Context as _, Result, bail};
use declarative::find_duplicate;
use ebkit::{ApplyContext, Client, OptionSetting, Outcome};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::Context;
use crate::cli::{Command, OutputFormat};
use crate::progress::WaitSpinner;
use crate::ui;

/// Dispatch a resource command.
pub fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::App(args) => app::run(ctx, args),
        Command::Version(args) => version::run(ctx, args),
        Command::Env(args) => env::run(ctx, args),
        Command::Template(args) => template::run(ctx, args),
        Command::Completions { .. } => Ok(()),
    }
}

/// Build a client for the configured endpoint.
fn client(ctx: &Context) -> Result<Client> {
    let endpoint = ctx.config.endpoint(ctx.endpoint.as_deref())?;
    log::debug!("Using endpoint {endpoint}");
    Client::new(endpoint).with_context(|| format!("Invalid endpoint: {endpoint}"))
}

/// Run a reconcile flow with the invocation's settings and print the result.
fn apply<F>(ctx: &Context, wait_timeout: Option<u64>, flow: F) -> Result<()>
where
    F: FnOnce(&ApplyContext<'_>) -> ebkit::Result<Outcome>,
{
    let spinner = WaitSpinner::new(ctx.quiet);
    let apply = ApplyContext::new()
        .with_check_mode(ctx.check)
        .with_wait(ctx.config.wait_config(wait_timeout))
        .with_table(ctx.config.equivalence_table())
        .with_callback(&spinner);

    let outcome = flow(&apply)?;
    emit(ctx, &outcome)
}

/// Print a result in the requested format.
fn emit(ctx: &Context, outcome: &Outcome) -> Result<()> {
    match ctx.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => ui::outcome(outcome, ctx.check),
    }
    Ok(())
}

/// Unwrap a parameter that the chosen state requires.
fn required<T>(value: Option<T>, flag: &str, state: &str) -> Result<T> {
    value.with_context(|| format!("{flag} is required with --state {state}"))
}

// ============================================================================
// Parsing
// ============================================================================

static ENVIRONMENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{2,21}[A-Za-z0-9]$").expect("valid environment name regex")
});

/// Environment names are 4 to 23 letters, digits or hyphens, with no
/// hyphen at either end.
pub fn validate_environment_name(name: &str) -> Result<()> {
    if !ENVIRONMENT_NAME.is_match(name) {
        bail!(
            "Invalid environment name '{name}': use 4-23 letters, digits or hyphens, not starting or ending with a hyphen"
        );
    }
    Ok(())
}

/// Parse `NAMESPACE:OPTION=VALUE`.
///
/// The value may contain `=` and `:`; the namespace may contain `:`.
pub fn parse_option_setting(raw: &str) -> Result<OptionSetting> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Option setting '{raw}' must look like NAMESPACE:OPTION=VALUE"))?;
    let (namespace, option) = key
        .rsplit_once(':')
        .with_context(|| format!("Option setting '{raw}' is missing a namespace"))?;
    if namespace.is_empty() || option.is_empty() {
        bail!("Option setting '{raw}' has an empty namespace or option name");
    }
    Ok(OptionSetting::new(namespace, option, value))
}

/// Parse `KEY=VALUE` tags.
pub fn parse_tags(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut tags = BTreeMap::new();
    for tag in raw {
        let (key, value) = tag
            .split_once('=')
            .with_context(|| format!("Tag '{tag}' must look like KEY=VALUE"))?;
        if tags.insert(key.to_string(), value.to_string()).is_some() {
            bail!("Tag '{key}' given more than once");
        }
    }
    Ok(tags)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SettingsDocument {
    List(Vec<OptionSetting>),
    Wrapped {
        #[serde(rename = "OptionSettings")]
        option_settings: Vec<OptionSetting>,
    },
}

impl SettingsDocument {
    fn into_settings(self) -> Vec<OptionSetting> {
        match self {
            Self::List(settings) | Self::Wrapped { option_settings: settings } => settings,
        }
    }
}

/// Read option settings from a JSON or TOML file.
///
/// JSON may be a bare array or an object with `OptionSettings`; TOML uses
/// `[[OptionSettings]]` tables.
pub fn load_settings_file(path: &Path) -> Result<Vec<OptionSetting>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    let document: SettingsDocument = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    };
    Ok(document.into_settings())
}

/// Settings from the file followed by settings from flags; duplicates rejected.
pub fn desired_settings(flags: &[String], file: Option<&Path>) -> Result<Vec<OptionSetting>> {
    let mut settings = match file {
        Some(path) => load_settings_file(path)?,
        None => Vec::new(),
    };
    for raw in flags {
        settings.push(parse_option_setting(raw)?);
    }
    if let Some(duplicate) = find_duplicate(&settings) {
        bail!(
            "Option {}:{} is set more than once",
            duplicate.namespace,
            duplicate.option_name
        );
    }
    Ok(settings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_option_setting() {
        let setting = parse_option_setting("aws:autoscaling:asg:MaxSize=4").unwrap();
        assert_eq!(setting.namespace, "aws:autoscaling:asg");
        assert_eq!(setting.option_name, "MaxSize");
        assert_eq!(setting.value, "4");

        let setting =
            parse_option_setting("aws:elasticbeanstalk:application:environment:DSN=a=b:c")
                .unwrap();
        assert_eq!(setting.namespace, "aws:elasticbeanstalk:application:environment");
        assert_eq!(setting.option_name, "DSN");
        assert_eq!(setting.value, "a=b:c");

        let empty = parse_option_setting("aws:ec2:vpc:Subnets=").unwrap();
        assert_eq!(empty.value, "");

        assert!(parse_option_setting("MaxSize=4").is_err());
        assert!(parse_option_setting("aws:asg:MaxSize").is_err());
        assert!(parse_option_setting(":MaxSize=4").is_err());
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(&["team=web".to_string(), "cost=a=b".to_string()]).unwrap();
        assert_eq!(tags["team"], "web");
        assert_eq!(tags["cost"], "a=b");

        assert!(parse_tags(&["novalue".to_string()]).is_err());
        assert!(parse_tags(&["a=1".to_string(), "a=2".to_string()]).is_err());
    }

    #[test]
    fn test_validate_environment_name() {
        assert!(validate_environment_name("web1").is_ok());
        assert!(validate_environment_name("shop-prod-eu").is_ok());
        assert!(validate_environment_name(&"a".repeat(23)).is_ok());

        assert!(validate_environment_name("web").is_err());
        assert!(validate_environment_name(&"a".repeat(24)).is_err());
        assert!(validate_environment_name("-web").is_err());
        assert!(validate_environment_name("web-").is_err());
        assert!(validate_environment_name("web_prod").is_err());
    }

    #[test]
    fn test_settings_file_formats() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("settings.json");
        fs::write(
            &json,
            r#"[{"Namespace": "aws:autoscaling:asg", "OptionName": "MaxSize", "Value": "4"}]"#,
        )
        .unwrap();
        assert_eq!(load_settings_file(&json).unwrap().len(), 1);

        let wrapped = dir.path().join("wrapped.json");
        fs::write(
            &wrapped,
            r#"{"OptionSettings": [{"Namespace": "a", "OptionName": "b", "Value": "c"}]}"#,
        )
        .unwrap();
        assert_eq!(load_settings_file(&wrapped).unwrap()[0].value, "c");

        let toml_path = dir.path().join("settings.toml");
        let mut file = fs::File::create(&toml_path).unwrap();
        writeln!(
            file,
            r#"
[[OptionSettings]]
Namespace = "aws:autoscaling:asg"
OptionName = "MinSize"
Value = "2"
"#
        )
        .unwrap();
        let settings = load_settings_file(&toml_path).unwrap();
        assert_eq!(settings[0].option_name, "MinSize");
    }

    #[test]
    fn test_desired_settings_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("settings.json");
        fs::write(
            &json,
            r#"[{"Namespace": "aws:autoscaling:asg", "OptionName": "MaxSize", "Value": "4"}]"#,
        )
        .unwrap();

        let merged = desired_settings(&["aws:autoscaling:asg:MinSize=1".to_string()], Some(&json))
            .unwrap();
        assert_eq!(merged.len(), 2);

        let err = desired_settings(&["aws:autoscaling:asg:MaxSize=8".to_string()], Some(&json))
            .unwrap_err();
        assert!(err.to_string().contains("aws:autoscaling:asg:MaxSize"));
    }
}
