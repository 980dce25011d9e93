//! Backend abstraction for control plane operations.
//!
//! The [`Backend`] trait is the resource client contract: one-shot reads and
//! writes against the platform, with no retrying and no waiting. Reconcile
//! flows decide what to call; backends only translate calls to the wire.

pub mod http;
pub mod memory;

use crate::error::Result;
use crate::types::{
    Application, ApplicationVersion, ConfigurationSettings, Environment, EnvironmentSpec,
    TemplateSpec, VersionSpec,
};
use std::fmt;

/// Whose configuration settings to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTarget<'a> {
    /// Settings of one environment
    Environment(&'a str),
    /// Settings of one configuration template
    Template(&'a str),
    /// Settings of every configuration template of the application
    AllTemplates,
}

impl fmt::Display for SettingsTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment(name) => write!(f, "environment {name}"),
            Self::Template(name) => write!(f, "template {name}"),
            Self::AllTemplates => write!(f, "all templates"),
        }
    }
}

/// Backend trait for control plane operations.
///
/// This trait abstracts the platform API, enabling:
/// - Real HTTP calls via [`http::HttpBackend`]
/// - An in-process platform for tests via [`memory::MemoryBackend`]
pub trait Backend: Send + Sync {
    /// List applications, optionally filtered by exact name.
    fn list_applications(&self, name: Option<&str>) -> Result<Vec<Application>>;

    /// Create an application.
    fn create_application(&self, name: &str, description: Option<&str>) -> Result<()>;

    /// Update an application's description.
    fn update_application(&self, name: &str, description: Option<&str>) -> Result<()>;

    /// Delete an application.
    fn delete_application(&self, name: &str) -> Result<()>;

    /// List versions of an application, optionally filtered by label.
    fn list_versions(&self, app: &str, label: Option<&str>) -> Result<Vec<ApplicationVersion>>;

    /// Register a new version.
    fn create_version(&self, spec: &VersionSpec) -> Result<()>;

    /// Update a version's description.
    fn update_version(&self, app: &str, label: &str, description: Option<&str>) -> Result<()>;

    /// Delete a version, optionally deleting its source bundle.
    fn delete_version(&self, app: &str, label: &str, delete_source: bool) -> Result<()>;

    /// List environments of an application, optionally filtered by name.
    ///
    /// Recently terminated environments may be included.
    fn list_environments(&self, app: &str, names: Option<&[String]>) -> Result<Vec<Environment>>;

    /// Launch an environment.
    fn create_environment(&self, spec: &EnvironmentSpec) -> Result<Environment>;

    /// Apply a change to an existing environment.
    fn update_environment(&self, spec: &EnvironmentSpec) -> Result<Environment>;

    /// Terminate an environment by name.
    fn terminate_environment(&self, name: &str) -> Result<()>;

    /// Describe option settings of an environment or template(s).
    fn describe_configuration_settings(
        &self,
        app: &str,
        target: SettingsTarget<'_>,
    ) -> Result<Vec<ConfigurationSettings>>;

    /// Create a configuration template.
    fn create_configuration_template(&self, spec: &TemplateSpec) -> Result<()>;

    /// Update a configuration template.
    fn update_configuration_template(&self, spec: &TemplateSpec) -> Result<()>;

    /// Delete a configuration template.
    fn delete_configuration_template(&self, app: &str, name: &str) -> Result<()>;
}
